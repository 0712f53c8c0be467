//! Synthetic images for generated fixtures and sweeps.

use crate::config::BenchEnv;
use crate::fixture::GeneratedFile;
use anyhow::{Context, Result, bail};
use fitsbench_fits::{Array, ArrayData, CompressionParams, Dtype, FitsFile, write_compressed};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use tracing::debug;

/// Exclusive upper bound for random integer pixels.
pub const INT_RANGE: i64 = 4096;

pub const GENERATED_SHAPE: [usize; 2] = [1024, 1024];
pub const GENERATED_TILE: [usize; 2] = [128, 128];
const GENERATED_SEED: u64 = 0x5eed;

/// Floats uniform in `[0, 1)`, integers uniform in `[0, 4096)` (`[0, 256)`
/// for `uint8`). Deterministic for a given seed.
pub fn random_array(shape: &[usize], dtype: Dtype, seed: u64) -> Result<Array> {
    let mut rng = StdRng::seed_from_u64(seed);
    let len: usize = shape.iter().product();
    let data = if dtype.is_float() {
        ArrayData::from_f64_iter(dtype, (0..len).map(|_| rng.gen_range(0.0..1.0)))
    } else {
        let upper = if dtype == Dtype::U8 { 256 } else { INT_RANGE };
        ArrayData::from_i64_iter(dtype, (0..len).map(|_| rng.gen_range(0..upper)))
    };
    Array::new(shape.to_vec(), data)
}

/// Repeat the first image of `path` along every axis until it covers
/// `shape`, crop, and cast to `dtype`.
pub fn tile_from_file(path: &Path, shape: &[usize], dtype: Dtype) -> Result<Array> {
    let mut hdu = FitsFile::open(path)?.first_image()?;
    let source = hdu
        .data()
        .with_context(|| format!("read source image {}", path.display()))?;
    let src_shape = source.shape();
    if src_shape.len() != shape.len() {
        bail!(
            "source image {} is {}-d, target shape {:?} is {}-d",
            path.display(),
            src_shape.len(),
            shape,
            shape.len()
        );
    }
    if src_shape.contains(&0) {
        bail!("source image {} is empty", path.display());
    }

    let size = source.dtype().size();
    let src_bytes = source.data().to_be_bytes();
    let len: usize = shape.iter().product();
    let mut bytes = Vec::with_capacity(len * size);
    let mut index = vec![0usize; shape.len()];
    for _ in 0..len {
        let mut flat = 0;
        for (axis, &i) in index.iter().enumerate() {
            flat = flat * src_shape[axis] + i % src_shape[axis];
        }
        bytes.extend_from_slice(&src_bytes[flat * size..(flat + 1) * size]);
        for axis in (0..shape.len()).rev() {
            index[axis] += 1;
            if index[axis] < shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
    let tiled = Array::new(shape.to_vec(), ArrayData::from_be_bytes(source.dtype(), &bytes)?)?;
    Ok(tiled.cast(dtype))
}

/// Write the standard generated image into a fresh directory under the
/// scratch dir and open it.
pub fn generated_fixture(env: &BenchEnv) -> Result<GeneratedFile> {
    let scratch = env.ensure_scratch_dir()?;
    let dir = tempfile::Builder::new()
        .prefix("generated-")
        .tempdir_in(scratch)
        .with_context(|| format!("create temp dir in {}", scratch.display()))?;
    let path = dir.path().join("generated_rice_i32.fits");
    let array = random_array(&GENERATED_SHAPE, Dtype::I32, GENERATED_SEED)?;
    let bytes = write_compressed(&path, &array, &CompressionParams::rice(GENERATED_TILE.to_vec()))?;
    debug!(path = %path.display(), bytes, "generated fixture file");
    let hdu = FitsFile::open(&path)?.first_image()?;
    Ok(GeneratedFile::new(dir, path, hdu))
}
