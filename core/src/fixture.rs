use crate::dataset::LazyArray;
use anyhow::{Context, Result, bail};
use fitsbench_fits::{Array, ImageHdu};
use std::fmt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A compressed file written for one benchmark run, opened and ready.
///
/// The image handle is closed before the directory is removed.
#[derive(Debug)]
pub struct GeneratedFile {
    path: PathBuf,
    hdu: ImageHdu,
    dir: TempDir,
}

impl GeneratedFile {
    pub fn new(dir: TempDir, path: PathBuf, hdu: ImageHdu) -> Self {
        Self { path, hdu, dir }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn hdu_mut(&mut self) -> &mut ImageHdu {
        &mut self.hdu
    }

    /// Close the image and delete the scratch directory, reporting failures.
    pub fn close(self) -> Result<()> {
        let Self { path, hdu, dir } = self;
        drop(hdu);
        dir.close()
            .with_context(|| format!("remove generated file {}", path.display()))
    }
}

/// State produced by a benchmark's setup and handed to its measured call.
#[derive(Debug)]
pub enum Fixture {
    Empty,
    Hdu(ImageHdu),
    Generated(GeneratedFile),
    Dataset(LazyArray),
}

impl Fixture {
    pub fn kind(&self) -> &'static str {
        match self {
            Fixture::Empty => "empty",
            Fixture::Hdu(_) => "hdu",
            Fixture::Generated(_) => "generated",
            Fixture::Dataset(_) => "dataset",
        }
    }

    pub fn hdu_mut(&mut self) -> Result<&mut ImageHdu> {
        match self {
            Fixture::Hdu(hdu) => Ok(hdu),
            Fixture::Generated(generated) => Ok(generated.hdu_mut()),
            other => bail!("benchmark needs an open image, setup produced a {} fixture", other.kind()),
        }
    }

    pub fn dataset(&self) -> Result<&LazyArray> {
        match self {
            Fixture::Dataset(data) => Ok(data),
            other => bail!("benchmark needs a dataset, setup produced a {} fixture", other.kind()),
        }
    }
}

/// What a measured call hands back.
#[derive(Debug)]
pub enum Output {
    Unit,
    Hdu(ImageHdu),
    Array(Array),
    Shape(Vec<usize>),
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Unit => f.write_str("()"),
            Output::Hdu(hdu) => write!(f, "HDU {} {:?} {}", hdu.index(), hdu.shape(), hdu.dtype()),
            Output::Array(array) => write!(f, "array {:?} {}", array.shape(), array.dtype()),
            Output::Shape(shape) => write!(f, "shape {:?}", shape),
        }
    }
}
