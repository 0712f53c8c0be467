//! Tile-size sweeps: generate one compressed file per tile size, time whole
//! and single-tile reads of each, and cache the table.
//!
//! Existing synthetic files and cache tables are reused as they are; nothing
//! checks them for corruption.

pub mod cache;
pub mod report;

#[cfg(test)]
mod sweep_test;

use crate::synth;
use anyhow::{Context, Result, anyhow, bail};
use fitsbench_fits::{Array, Compression, CompressionParams, Dtype, FitsFile, write_compressed};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Upper bound on the number of tile sizes one spacing may produce.
pub const MAX_TILE_SIZES: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileSpacing {
    /// `range(start, stop, step)`: stop is exclusive, step may be negative.
    Arithmetic { start: i64, stop: i64, step: i64 },
    Custom(Vec<usize>),
}

impl TileSpacing {
    pub fn edges(&self) -> Result<Vec<usize>> {
        let edges = match self {
            TileSpacing::Arithmetic { start, stop, step } => {
                let (start, stop, step) = (*start, *stop, *step);
                if step == 0 {
                    bail!("tile spacing step must not be zero");
                }
                let mut out = Vec::new();
                let mut n = start;
                while (step > 0 && n < stop) || (step < 0 && n > stop) {
                    if out.len() == MAX_TILE_SIZES {
                        bail!("tile spacing {} yields more than {} tile sizes", self, MAX_TILE_SIZES);
                    }
                    let edge = usize::try_from(n)
                        .ok()
                        .filter(|&e| e > 0)
                        .ok_or_else(|| anyhow!("tile edge {} must be positive", n))?;
                    out.push(edge);
                    // Overflow means the next value is past `stop` anyway.
                    match n.checked_add(step) {
                        Some(next) => n = next,
                        None => break,
                    }
                }
                out
            }
            TileSpacing::Custom(edges) => {
                if let Some(&bad) = edges.iter().find(|&&e| e == 0) {
                    bail!("tile edge {} must be positive", bad);
                }
                if edges.len() > MAX_TILE_SIZES {
                    bail!("{} tile sizes given, at most {} allowed", edges.len(), MAX_TILE_SIZES);
                }
                edges.clone()
            }
        };
        if edges.is_empty() {
            bail!("tile spacing {} yields no tile sizes", self);
        }
        Ok(edges)
    }

    /// Cache key fragment. Custom lists are hashed so any two lists differ.
    pub fn label(&self) -> String {
        match self {
            TileSpacing::Arithmetic { start, stop, step } => format!("range{}_{}_{}", start, stop, step),
            TileSpacing::Custom(edges) => {
                let bytes: Vec<u8> = edges.iter().flat_map(|&e| (e as u64).to_le_bytes()).collect();
                format!("custom{:016x}", twox_hash::XxHash64::oneshot(0, &bytes))
            }
        }
    }
}

impl fmt::Display for TileSpacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileSpacing::Arithmetic { start, stop, step } => write!(f, "range({}, {}, {})", start, stop, step),
            TileSpacing::Custom(edges) => write!(f, "{:?}", edges),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Seeded uniform noise.
    Random,
    /// An existing image repeated and cropped to the sweep shape.
    Fits(PathBuf),
}

impl DataSource {
    /// Cache key fragment. Images are keyed by stem plus a hash of the
    /// canonical path, so same-named files in different directories differ.
    pub fn label(&self) -> String {
        match self {
            DataSource::Random => "random".to_string(),
            DataSource::Fits(path) => {
                let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
                let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.clone());
                let hash = twox_hash::XxHash64::oneshot(0, canonical.as_os_str().as_encoded_bytes());
                format!("fits-{}-{:016x}", stem, hash)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    /// Rows, columns.
    pub shape: [usize; 2],
    pub dtype: Dtype,
    pub tiles: TileSpacing,
    pub source: DataSource,
    pub compression: Compression,
    /// Reads averaged per measurement.
    pub repeat: usize,
    pub seed: u64,
    pub scratch_dir: PathBuf,
}

pub const PRESETS: &[&str] = &["tile-size-graph"];

impl SweepConfig {
    pub fn preset(name: &str, scratch_dir: PathBuf) -> Result<Self> {
        match name {
            "tile-size-graph" => Ok(Self {
                shape: [4096, 4096],
                dtype: Dtype::F64,
                tiles: TileSpacing::Arithmetic {
                    start: 4096,
                    stop: 1,
                    step: -100,
                },
                source: DataSource::Random,
                compression: Compression::Gzip1,
                repeat: 10,
                seed: 0,
                scratch_dir,
            }),
            other => bail!("unknown sweep preset '{}' (known: {})", other, PRESETS.join(", ")),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.shape.contains(&0) {
            bail!("sweep shape {:?} must be non-empty", self.shape);
        }
        if self.repeat == 0 {
            bail!("sweep repeat count must be at least 1");
        }
        if self.compression == Compression::Rice1 && self.dtype.is_float() {
            bail!("RICE_1 needs integer data; use GZIP_1 for {}", self.dtype);
        }
        self.tiles.edges()?;
        Ok(())
    }

    /// Square tiles, clipped to the array, in sweep order.
    pub fn tile_sizes(&self) -> Result<Vec<[usize; 2]>> {
        Ok(self
            .tiles
            .edges()?
            .into_iter()
            .map(|n| [n.min(self.shape[0]), n.min(self.shape[1])])
            .collect())
    }

    /// Source label, plus the seed when the data is random.
    fn data_key(&self) -> String {
        match self.source {
            DataSource::Random => format!("random-s{}", self.seed),
            DataSource::Fits(_) => self.source.label(),
        }
    }

    fn compression_key(&self) -> String {
        self.compression.to_string().to_ascii_lowercase()
    }

    pub fn file_name(&self, tile: [usize; 2]) -> String {
        let name = format!(
            "tile_test_{}x{}_{}_{}_{}_{}x{}.fits",
            self.shape[0],
            self.shape[1],
            self.dtype,
            self.compression_key(),
            self.data_key(),
            tile[0],
            tile[1]
        );
        sanitize_filename::sanitize(name)
    }

    pub fn cache_path(&self) -> PathBuf {
        let name = format!(
            "tile_sweep_{}x{}_{}_{}_{}_{}_r{}.parquet",
            self.shape[0],
            self.shape[1],
            self.dtype,
            self.compression_key(),
            self.tiles.label(),
            self.data_key(),
            self.repeat
        );
        self.scratch_dir.join(sanitize_filename::sanitize(name))
    }

    pub fn report_path(&self) -> PathBuf {
        self.cache_path().with_extension("html")
    }

    fn source_array(&self) -> Result<Array> {
        match &self.source {
            DataSource::Random => synth::random_array(&self.shape, self.dtype, self.seed),
            DataSource::Fits(path) => synth::tile_from_file(path, &self.shape, self.dtype),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRow {
    pub index: u64,
    pub tile_rows: u64,
    pub tile_cols: u64,
    pub whole_array_s: f64,
    pub single_tile_s: f64,
    pub file_size: u64,
}

#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub rows: Vec<SweepRow>,
    pub cache_path: PathBuf,
    pub from_cache: bool,
    /// Synthetic files written by this run.
    pub generated: usize,
}

/// Load the cached table for `config`, or generate, time and cache it.
pub fn run(config: &SweepConfig) -> Result<SweepOutcome> {
    config.validate()?;
    fs::create_dir_all(&config.scratch_dir)
        .with_context(|| format!("create scratch directory {}", config.scratch_dir.display()))?;

    let cache_path = config.cache_path();
    if cache_path.exists() {
        let rows = cache::read(&cache_path)?;
        info!(path = %cache_path.display(), rows = rows.len(), "loaded cached sweep");
        return Ok(SweepOutcome {
            rows,
            cache_path,
            from_cache: true,
            generated: 0,
        });
    }

    let (files, generated) = generate_files(config)?;
    info!(files = files.len(), generated, "generated all data");

    let count = files.len();
    let mut rows = Vec::with_capacity(count);
    for (i, (tile, path)) in files.iter().enumerate() {
        let whole = average_time(config.repeat, || read_whole(path))?;
        let single = average_time(config.repeat, || read_first_tile(path))?;
        let file_size = fs::metadata(path)
            .with_context(|| format!("stat {}", path.display()))?
            .len();
        debug!(?tile, whole_s = whole.as_secs_f64(), single_s = single.as_secs_f64(), file_size, "timed tile size");
        rows.push(SweepRow {
            index: (count - 1 - i) as u64,
            tile_rows: tile[0] as u64,
            tile_cols: tile[1] as u64,
            whole_array_s: whole.as_secs_f64(),
            single_tile_s: single.as_secs_f64(),
            file_size,
        });
    }

    cache::write(&cache_path, &rows)?;
    info!(path = %cache_path.display(), rows = rows.len(), "wrote sweep cache");
    Ok(SweepOutcome {
        rows,
        cache_path,
        from_cache: false,
        generated,
    })
}

/// One file per tile size; files already on disk are kept.
fn generate_files(config: &SweepConfig) -> Result<(Vec<([usize; 2], PathBuf)>, usize)> {
    let mut source: Option<Array> = None;
    let mut files = Vec::new();
    let mut generated = 0;
    for tile in config.tile_sizes()? {
        let path = config.scratch_dir.join(config.file_name(tile));
        if !path.exists() {
            let array = match source.take() {
                Some(array) => array,
                None => config.source_array()?,
            };
            let params = CompressionParams::new(config.compression, tile.to_vec());
            write_compressed(&path, &array, &params)
                .with_context(|| format!("write synthetic file {}", path.display()))?;
            source = Some(array);
            generated += 1;
            debug!(path = %path.display(), ?tile, "generated synthetic file");
        }
        files.push((tile, path));
    }
    Ok((files, generated))
}

fn average_time<T, F>(repeat: usize, mut read: F) -> Result<Duration>
where
    F: FnMut() -> Result<T>,
{
    let mut total = Duration::ZERO;
    for _ in 0..repeat {
        let start = Instant::now();
        std::hint::black_box(read()?);
        total += start.elapsed();
    }
    Ok(total.div_f64(repeat as f64))
}

fn read_whole(path: &Path) -> Result<Array> {
    let mut hdu = FitsFile::open(path)?.first_image()?;
    hdu.data()
}

fn read_first_tile(path: &Path) -> Result<Array> {
    let mut hdu = FitsFile::open(path)?.first_image()?;
    let ranges: Vec<Range<usize>> = hdu.tile_shape().iter().map(|&t| 0..t).collect();
    hdu.section(&ranges)
}
