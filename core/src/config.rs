//! Where the benchmarks find their inputs and put their scratch files.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "FITSBENCH_CONFIG";
pub const DATA_DIR_ENV: &str = "FITSBENCH_DATA_DIR";
pub const SCRATCH_DIR_ENV: &str = "FITSBENCH_SCRATCH_DIR";
pub const DATASET_DIR_ENV: &str = "FITSBENCH_DATASET_DIR";
pub const AIA_FILE_ENV: &str = "FITSBENCH_AIA_FILE";

const DEFAULT_CONFIG_FILE: &str = "fitsbench.toml";
const DEFAULT_AIA_FILE: &str = "aia_lev1_193a_2013_03_15t12_01_06_84z_image_lev1.fits";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchEnv {
    /// Read-only directory of reference FITS files.
    pub data_dir: PathBuf,
    /// Read-write directory for generated files and sweep caches.
    pub scratch_dir: PathBuf,
    /// Directory holding one FITS file per frame of the lazy dataset.
    pub dataset_dir: PathBuf,
    /// File name of the AIA image inside `data_dir`.
    pub aia_file: String,
}

impl Default for BenchEnv {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            scratch_dir: std::env::temp_dir().join("fitsbench"),
            dataset_dir: PathBuf::from("data").join("dataset"),
            aia_file: DEFAULT_AIA_FILE.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    data_dir: Option<PathBuf>,
    scratch_dir: Option<PathBuf>,
    dataset_dir: Option<PathBuf>,
    aia_file: Option<String>,
}

impl BenchEnv {
    /// Defaults, then `fitsbench.toml` (or `$FITSBENCH_CONFIG`), then the
    /// `FITSBENCH_*` environment variables.
    pub fn load() -> Result<Self> {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Same as [`BenchEnv::load`] with an explicit variable lookup.
    pub fn resolve<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut env = Self::default();
        let explicit = lookup(CONFIG_ENV).filter(|p| !p.trim().is_empty());
        match explicit {
            Some(path) => env.apply_file(Path::new(path.trim()))?,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    env.apply_file(fallback)?;
                }
            }
        }
        env.apply_overrides(lookup);
        Ok(env)
    }

    fn apply_file(&mut self, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
        let file: FileConfig = toml::from_str(&text).with_context(|| format!("parse config {}", path.display()))?;
        if let Some(dir) = file.data_dir {
            self.data_dir = dir;
        }
        if let Some(dir) = file.scratch_dir {
            self.scratch_dir = dir;
        }
        if let Some(dir) = file.dataset_dir {
            self.dataset_dir = dir;
        }
        if let Some(name) = file.aia_file {
            self.aia_file = name;
        }
        Ok(())
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(dir) = non_empty(DATA_DIR_ENV) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty(SCRATCH_DIR_ENV) {
            self.scratch_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty(DATASET_DIR_ENV) {
            self.dataset_dir = PathBuf::from(dir);
        }
        if let Some(name) = non_empty(AIA_FILE_ENV) {
            self.aia_file = name;
        }
    }

    pub fn aia_path(&self) -> PathBuf {
        self.data_dir.join(&self.aia_file)
    }

    /// Create the scratch directory if needed and return it.
    pub fn ensure_scratch_dir(&self) -> Result<&Path> {
        fs::create_dir_all(&self.scratch_dir)
            .with_context(|| format!("create scratch directory {}", self.scratch_dir.display()))?;
        Ok(&self.scratch_dir)
    }
}
