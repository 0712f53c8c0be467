use anyhow::{Context, Result, anyhow};
use clap::Parser;
use fitsbench_core::sweep::{self, DataSource, PRESETS, SweepConfig, SweepRow, TileSpacing};
use fitsbench_core::{BenchEnv, logging};
use fitsbench_fits::{Compression, Dtype};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

const DEFAULT_SHAPE: [usize; 2] = [1024, 1024];
const DEFAULT_REPEAT: usize = 10;

#[derive(Debug, Parser)]
#[command(
    name = "tile-sweep",
    version,
    about = "Time whole-array and single-tile reads across tile sizes",
    long_about = None,
    after_help = "Synthetic files and the result table are cached in the scratch directory; \
                  delete the .parquet file to re-time."
)]
struct Args {
    /// Start from a named configuration; other flags override it
    #[arg(long, value_parser = clap::builder::PossibleValuesParser::new(PRESETS.iter().copied()))]
    preset: Option<String>,

    /// Array shape as ROWSxCOLS
    #[arg(long, value_name = "ROWSxCOLS", value_parser = parse_shape)]
    shape: Option<[usize; 2]>,

    /// Element type (uint8, int16, int32, int64, float32, float64)
    #[arg(long, value_parser = parse_dtype)]
    dtype: Option<Dtype>,

    /// Tile edges as START:STOP:STEP, stop exclusive
    #[arg(long, value_name = "START:STOP:STEP", value_parser = parse_range, conflicts_with = "tiles")]
    range: Option<TileSpacing>,

    /// Explicit comma-separated tile edges
    #[arg(long, value_name = "N,N,...", value_delimiter = ',')]
    tiles: Option<Vec<usize>>,

    /// Tile and crop this image instead of generating random data
    #[arg(long, value_name = "FITS")]
    source: Option<PathBuf>,

    /// RICE_1 or GZIP_1; defaults to RICE_1 for integer data and GZIP_1 otherwise
    #[arg(long, value_parser = parse_compression)]
    compression: Option<Compression>,

    /// Reads averaged per measurement
    #[arg(long)]
    repeat: Option<usize>,

    /// Seed for random data
    #[arg(long)]
    seed: Option<u64>,

    /// Where synthetic files, the cache and the report go
    #[arg(long, value_name = "DIR")]
    scratch_dir: Option<PathBuf>,

    /// Skip writing the HTML report
    #[arg(long)]
    no_report: bool,
}

fn parse_shape(raw: &str) -> Result<[usize; 2], String> {
    let (rows, cols) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected ROWSxCOLS, got '{}'", raw))?;
    let parse = |s: &str| s.trim().parse::<usize>().map_err(|e| format!("bad dimension '{}': {}", s, e));
    Ok([parse(rows)?, parse(cols)?])
}

fn parse_dtype(raw: &str) -> Result<Dtype, String> {
    raw.parse().map_err(|e: anyhow::Error| e.to_string())
}

fn parse_compression(raw: &str) -> Result<Compression, String> {
    raw.parse().map_err(|e: anyhow::Error| e.to_string())
}

fn parse_range(raw: &str) -> Result<TileSpacing, String> {
    let parts: Vec<&str> = raw.split(':').collect();
    let [start, stop, step] = parts.as_slice() else {
        return Err(format!("expected START:STOP:STEP, got '{}'", raw));
    };
    let parse = |s: &str| s.trim().parse::<i64>().map_err(|e| format!("bad range bound '{}': {}", s, e));
    Ok(TileSpacing::Arithmetic {
        start: parse(start)?,
        stop: parse(stop)?,
        step: parse(step)?,
    })
}

fn build_config(args: Args) -> Result<SweepConfig> {
    let scratch_dir = match args.scratch_dir {
        Some(dir) => dir,
        None => BenchEnv::load()?.scratch_dir,
    };
    let base = match &args.preset {
        Some(name) => Some(SweepConfig::preset(name, scratch_dir.clone())?),
        None => None,
    };

    let dtype = args.dtype.or(base.as_ref().map(|b| b.dtype)).unwrap_or(Dtype::F64);
    let tiles = match (args.range, args.tiles) {
        (Some(range), _) => range,
        (None, Some(tiles)) => TileSpacing::Custom(tiles),
        (None, None) => base
            .as_ref()
            .map(|b| b.tiles.clone())
            .ok_or_else(|| anyhow!("give --range, --tiles or --preset"))?,
    };
    let compression = args
        .compression
        .or(base.as_ref().map(|b| b.compression))
        .unwrap_or_else(|| Compression::default_for(dtype));

    Ok(SweepConfig {
        shape: args.shape.or(base.as_ref().map(|b| b.shape)).unwrap_or(DEFAULT_SHAPE),
        dtype,
        tiles,
        source: match args.source {
            Some(path) => DataSource::Fits(path),
            None => base.as_ref().map(|b| b.source.clone()).unwrap_or(DataSource::Random),
        },
        compression,
        repeat: args.repeat.or(base.as_ref().map(|b| b.repeat)).unwrap_or(DEFAULT_REPEAT),
        seed: args.seed.or(base.as_ref().map(|b| b.seed)).unwrap_or(0),
        scratch_dir,
    })
}

fn print_table(out: &mut impl Write, rows: &[SweepRow]) -> io::Result<()> {
    writeln!(
        out,
        "{:>5}  {:>11}  {:>14}  {:>14}  {:>12}",
        "index", "tile", "whole_array_s", "single_tile_s", "file_size"
    )?;
    for row in rows {
        writeln!(
            out,
            "{:>5}  {:>11}  {:>14.6e}  {:>14.6e}  {:>12}",
            row.index,
            format!("{}x{}", row.tile_rows, row.tile_cols),
            row.whole_array_s,
            row.single_tile_s,
            row.file_size
        )?;
    }
    Ok(())
}

fn main() -> Result<()> {
    logging::maybe_init_tracing();
    let args = Args::parse();
    let no_report = args.no_report;
    let config = build_config(args)?;
    config.validate()?;
    info!(?config, "starting sweep");

    let outcome = sweep::run(&config)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    print_table(&mut out, &outcome.rows).context("print sweep table")?;
    let origin = if outcome.from_cache { "loaded" } else { "written" };
    writeln!(out, "Results {} -> {}", origin, outcome.cache_path.display())?;
    if !no_report {
        let report_path = config.report_path();
        sweep::report::write(&report_path, &config, &outcome.rows)?;
        writeln!(out, "Report -> {}", report_path.display())?;
    }
    Ok(())
}
