//! A small FITS reader and writer covering what the benchmarks touch:
//! image HDUs, tile-compressed images (`RICE_1`, `GZIP_1`, `GZIP_2`) and
//! header inspection.
//!
//! Pixel values are returned as stored on disk; `BSCALE`/`BZERO` are not
//! applied.

pub mod array;
pub mod compress;
pub mod file;
pub mod header;
pub mod tiled;
pub mod write;

#[cfg(test)]
mod array_test;
#[cfg(test)]
mod header_test;

pub use array::{Array, ArrayData, Dtype};
pub use compress::Compression;
pub use file::{FitsFile, HduInfo, HduKind, ImageHdu};
pub use header::{Card, Header, Value};
pub use tiled::tile_shape;
pub use write::{CompressionParams, write_compressed, write_image};

/// Every header and data unit is padded to a multiple of this many bytes.
pub const BLOCK_SIZE: usize = 2880;
pub const CARD_SIZE: usize = 80;

pub(crate) fn padded_len(len: u64) -> u64 {
    len.div_ceil(BLOCK_SIZE as u64) * BLOCK_SIZE as u64
}
