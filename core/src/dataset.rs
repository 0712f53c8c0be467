//! A stack of same-shaped FITS frames read lazily from a directory.
//!
//! Each file is one chunk along the leading axis. Nothing is read until
//! [`LazyArray::compute`], and then only the files and rows selected.

use anyhow::{Context, Result, anyhow, bail};
use fitsbench_fits::{Array, ArrayData, Dtype, FitsFile};
use std::fmt;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Dataset {
    dir: PathBuf,
    files: Arc<[PathBuf]>,
    frame_shape: Vec<usize>,
    dtype: Dtype,
}

impl Dataset {
    /// Index every `*.fits` file in `dir`, sorted by name.
    ///
    /// Only the first file's header is read.
    pub fn from_directory(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("read dataset directory {}", dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .map(|ext| ext.eq_ignore_ascii_case("fits"))
                        .unwrap_or(false)
            })
            .collect();
        files.sort();
        let first = files
            .first()
            .ok_or_else(|| anyhow!("dataset directory {} contains no FITS files", dir.display()))?;
        let hdu = FitsFile::open(first)?.first_image()?;
        let frame_shape = hdu.shape().to_vec();
        let dtype = hdu.dtype();
        debug!(dir = %dir.display(), files = files.len(), ?frame_shape, %dtype, "indexed dataset");
        Ok(Self {
            dir: dir.to_path_buf(),
            files: files.into(),
            frame_shape,
            dtype,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn frame_shape(&self) -> &[usize] {
        &self.frame_shape
    }

    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    pub fn data(&self) -> LazyArray {
        LazyArray {
            files: Arc::clone(&self.files),
            frame_shape: self.frame_shape.clone(),
            dtype: self.dtype,
            fixed: Vec::new(),
        }
    }
}

/// `[frames] ++ frame_shape`, narrowed by integer indices on leading axes.
#[derive(Debug, Clone)]
pub struct LazyArray {
    files: Arc<[PathBuf]>,
    frame_shape: Vec<usize>,
    dtype: Dtype,
    fixed: Vec<usize>,
}

impl LazyArray {
    fn full_shape(&self) -> Vec<usize> {
        let mut shape = Vec::with_capacity(self.frame_shape.len() + 1);
        shape.push(self.files.len());
        shape.extend_from_slice(&self.frame_shape);
        shape
    }

    pub fn shape(&self) -> Vec<usize> {
        self.full_shape().split_off(self.fixed.len())
    }

    pub fn chunk_shape(&self) -> Vec<usize> {
        let mut chunk = vec![1];
        chunk.extend_from_slice(&self.frame_shape);
        chunk.split_off(self.fixed.len())
    }

    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    pub fn ndim(&self) -> usize {
        self.frame_shape.len() + 1 - self.fixed.len()
    }

    /// Select one position on each of the leading axes. No I/O happens.
    pub fn index(&self, indices: &[usize]) -> Result<LazyArray> {
        let shape = self.shape();
        if indices.len() > shape.len() {
            bail!("too many indices ({}) for a {}-d array", indices.len(), shape.len());
        }
        for (axis, (&i, &len)) in indices.iter().zip(&shape).enumerate() {
            if i >= len {
                bail!("index {} is out of bounds for axis {} with size {}", i, axis, len);
            }
        }
        let mut narrowed = self.clone();
        narrowed.fixed.extend_from_slice(indices);
        Ok(narrowed)
    }

    /// Read the selection synchronously on the calling thread.
    pub fn compute(&self) -> Result<Array> {
        let out_shape = self.shape();
        match self.fixed.split_first() {
            Some((&frame, within)) => {
                let ranges: Vec<Range<usize>> = self
                    .frame_shape
                    .iter()
                    .enumerate()
                    .map(|(axis, &len)| match within.get(axis) {
                        Some(&i) => i..i + 1,
                        None => 0..len,
                    })
                    .collect();
                let section = self.read_frame(frame, Some(&ranges))?;
                Array::new(out_shape, section.into_data())
            }
            None => {
                let frame_len: usize = self.frame_shape.iter().product();
                let mut bytes = Vec::with_capacity(self.files.len() * frame_len * self.dtype.size());
                for frame in 0..self.files.len() {
                    bytes.extend_from_slice(&self.read_frame(frame, None)?.data().to_be_bytes());
                }
                Array::new(out_shape, ArrayData::from_be_bytes(self.dtype, &bytes)?)
            }
        }
    }

    fn read_frame(&self, frame: usize, ranges: Option<&[Range<usize>]>) -> Result<Array> {
        let path = &self.files[frame];
        let mut hdu = FitsFile::open(path)?.first_image()?;
        if hdu.shape() != self.frame_shape.as_slice() || hdu.dtype() != self.dtype {
            bail!(
                "{} holds a {:?} {} frame, dataset expects {:?} {}",
                path.display(),
                hdu.shape(),
                hdu.dtype(),
                self.frame_shape,
                self.dtype
            );
        }
        debug!(path = %path.display(), frame, "reading dataset chunk");
        match ranges {
            Some(ranges) => hdu.section(ranges),
            None => hdu.data(),
        }
    }
}

impl fmt::Display for LazyArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LazyArray<shape={:?}, dtype={}, chunksize={:?}, files={}>",
            self.shape(),
            self.dtype,
            self.chunk_shape(),
            self.files.len()
        )
    }
}
