//! Tile-compressed images stored as binary tables (`ZIMAGE = T`).

use crate::array::{Array, ArrayData, Dtype, advance, check_ranges, copy_region};
use crate::compress::{self, Compression, RiceParams};
use crate::header::Header;
use anyhow::{Context, Result, anyhow, bail};
use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Descriptor {
    P,
    Q,
}

#[derive(Debug, Clone)]
pub struct TiledImage {
    shape: Vec<usize>,
    tile_shape: Vec<usize>,
    grid: Vec<usize>,
    dtype: Dtype,
    compression: Compression,
    rice: RiceParams,
    row_len: u64,
    column_offset: u64,
    descriptor: Descriptor,
    table_offset: u64,
    heap_offset: u64,
    rows: usize,
}

/// Tile shape of a compressed image header, slowest axis first.
///
/// Missing `ZTILEn` keywords fall back to the convention's default of one
/// image row per tile.
pub fn tile_shape(header: &Header) -> Result<Vec<usize>> {
    let shape = header.axes("ZNAXIS")?;
    let ndim = shape.len();
    let mut tiles = Vec::with_capacity(ndim);
    for (pos, &len) in shape.iter().enumerate() {
        let axis = ndim - pos;
        let key = format!("ZTILE{}", axis);
        let tile = match header.get_int(&key) {
            Some(v) if v > 0 => v as usize,
            Some(v) => bail!("{} = {} must be positive", key, v),
            None if axis == 1 => len,
            None => 1,
        };
        tiles.push(tile);
    }
    Ok(tiles)
}

fn column_width(tform: &str) -> Result<(u64, Option<Descriptor>)> {
    let tform = tform.trim();
    let digits: String = tform.chars().take_while(|c| c.is_ascii_digit()).collect();
    let repeat: u64 = if digits.is_empty() {
        1
    } else {
        digits.parse().context("parse TFORM repeat count")?
    };
    let code = tform[digits.len()..]
        .chars()
        .next()
        .ok_or_else(|| anyhow!("TFORM '{}' has no type code", tform))?;
    let (width, descriptor) = match code {
        'L' | 'B' | 'A' => (repeat, None),
        'X' => (repeat.div_ceil(8), None),
        'I' => (repeat * 2, None),
        'J' | 'E' => (repeat * 4, None),
        'K' | 'D' | 'C' => (repeat * 8, None),
        'M' => (repeat * 16, None),
        'P' => (repeat * 8, Some(Descriptor::P)),
        'Q' => (repeat * 16, Some(Descriptor::Q)),
        other => bail!("unsupported TFORM type '{}' in '{}'", other, tform),
    };
    Ok((width, descriptor))
}

fn rice_params(header: &Header, dtype: Dtype) -> RiceParams {
    let mut params = RiceParams {
        bytepix: match dtype {
            Dtype::U8 => 1,
            Dtype::I16 => 2,
            _ => 4,
        },
        ..RiceParams::default()
    };
    for n in 1..=999 {
        let Some(name) = header.get_str(&format!("ZNAME{}", n)) else {
            break;
        };
        let value = header.get_int(&format!("ZVAL{}", n));
        match (name.trim().to_ascii_uppercase().as_str(), value) {
            ("BLOCKSIZE", Some(v)) if v > 0 => params.block_size = v as usize,
            ("BYTEPIX", Some(v)) if v > 0 => params.bytepix = v as usize,
            _ => {}
        }
    }
    params
}

impl TiledImage {
    /// Interpret a `ZIMAGE` binary table whose data unit starts at `data_offset`.
    pub fn from_header(header: &Header, data_offset: u64) -> Result<Self> {
        let dtype = Dtype::from_bitpix(header.require_int("ZBITPIX")?)?;
        let shape = header.axes("ZNAXIS")?;
        let tile_shape = tile_shape(header)?;
        let compression: Compression = header
            .get_str("ZCMPTYPE")
            .ok_or_else(|| anyhow!("compressed image has no ZCMPTYPE"))?
            .parse()?;
        let grid: Vec<usize> = shape
            .iter()
            .zip(&tile_shape)
            .map(|(&len, &tile)| len.div_ceil(tile))
            .collect();

        let row_len = header.require_int("NAXIS1")? as u64;
        let rows = header.require_int("NAXIS2")? as usize;
        let fields = header.require_int("TFIELDS")?;
        let mut column_offset = 0u64;
        let mut found = None;
        for field in 1..=fields {
            let tform = header
                .get_str(&format!("TFORM{}", field))
                .ok_or_else(|| anyhow!("missing TFORM{}", field))?;
            let (width, descriptor) = column_width(tform)?;
            let ttype = header.get_str(&format!("TTYPE{}", field)).unwrap_or_default();
            if ttype.eq_ignore_ascii_case("COMPRESSED_DATA") {
                let descriptor = descriptor.ok_or_else(|| anyhow!("COMPRESSED_DATA column must be a P or Q array"))?;
                found = Some(descriptor);
                break;
            }
            column_offset += width;
        }
        let descriptor = found.ok_or_else(|| anyhow!("compressed image has no COMPRESSED_DATA column"))?;

        let expected_tiles: usize = grid.iter().product();
        if rows != expected_tiles {
            bail!("table has {} rows but the tiling needs {}", rows, expected_tiles);
        }
        let theap = header.get_int("THEAP").map(|v| v as u64).unwrap_or(row_len * rows as u64);

        let rice = match compression {
            Compression::Rice1 => rice_params(header, dtype),
            _ => RiceParams::default(),
        };

        Ok(Self {
            shape,
            tile_shape,
            grid,
            dtype,
            compression,
            rice,
            row_len,
            column_offset,
            descriptor,
            table_offset: data_offset,
            heap_offset: data_offset + theap,
            rows,
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn tile_shape(&self) -> &[usize] {
        &self.tile_shape
    }

    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn tile_count(&self) -> usize {
        self.rows
    }

    /// Origin and (edge-clipped) extent of tile `tile`.
    pub fn tile_bounds(&self, tile: usize) -> Result<(Vec<usize>, Vec<usize>)> {
        if tile >= self.rows {
            bail!("tile {} is out of range ({} tiles)", tile, self.rows);
        }
        let mut rest = tile;
        let mut coords = vec![0; self.grid.len()];
        for axis in (0..self.grid.len()).rev() {
            coords[axis] = rest % self.grid[axis];
            rest /= self.grid[axis];
        }
        Ok(self.bounds_at(&coords))
    }

    fn bounds_at(&self, coords: &[usize]) -> (Vec<usize>, Vec<usize>) {
        let origin: Vec<usize> = coords.iter().zip(&self.tile_shape).map(|(c, t)| c * t).collect();
        let extent = origin
            .iter()
            .zip(&self.tile_shape)
            .zip(&self.shape)
            .map(|((&o, &t), &len)| t.min(len - o))
            .collect();
        (origin, extent)
    }

    fn tile_index(&self, coords: &[usize]) -> usize {
        coords.iter().zip(&self.grid).fold(0, |acc, (&c, &g)| acc * g + c)
    }

    fn read_descriptor<R: Read + Seek>(&self, reader: &mut R, tile: usize) -> Result<(u64, u64)> {
        let pos = self.table_offset + tile as u64 * self.row_len + self.column_offset;
        reader.seek(SeekFrom::Start(pos)).context("seek to tile descriptor")?;
        match self.descriptor {
            Descriptor::P => {
                let mut raw = [0u8; 8];
                reader.read_exact(&mut raw).context("read tile descriptor")?;
                let count = i32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
                let offset = i32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]);
                if count < 0 || offset < 0 {
                    bail!("negative descriptor for tile {}", tile);
                }
                Ok((count as u64, offset as u64))
            }
            Descriptor::Q => {
                let mut raw = [0u8; 16];
                reader.read_exact(&mut raw).context("read tile descriptor")?;
                let mut count = [0u8; 8];
                let mut offset = [0u8; 8];
                count.copy_from_slice(&raw[..8]);
                offset.copy_from_slice(&raw[8..]);
                let (count, offset) = (i64::from_be_bytes(count), i64::from_be_bytes(offset));
                if count < 0 || offset < 0 {
                    bail!("negative descriptor for tile {}", tile);
                }
                Ok((count as u64, offset as u64))
            }
        }
    }

    /// Decompress one tile into a standalone array of its extent.
    pub fn read_tile<R: Read + Seek>(&self, reader: &mut R, tile: usize) -> Result<Array> {
        let (_, extent) = self.tile_bounds(tile)?;
        let data = self.decode_tile(reader, tile, extent.iter().product())?;
        Array::new(extent, data)
    }

    fn decode_tile<R: Read + Seek>(&self, reader: &mut R, tile: usize, count: usize) -> Result<ArrayData> {
        let (len, offset) = self.read_descriptor(reader, tile)?;
        if len == 0 {
            bail!("tile {} has no compressed data", tile);
        }
        reader
            .seek(SeekFrom::Start(self.heap_offset + offset))
            .context("seek to tile heap data")?;
        let mut bytes = vec![0u8; len as usize];
        reader.read_exact(&mut bytes).context("read compressed tile")?;
        compress::decompress(self.compression, &bytes, self.dtype, count, self.rice)
            .with_context(|| format!("decompress tile {} ({})", tile, self.compression))
    }

    /// Materialize a section, decompressing only the tiles it touches.
    pub fn read_section<R: Read + Seek>(&self, reader: &mut R, ranges: &[Range<usize>]) -> Result<Array> {
        check_ranges(&self.shape, ranges)?;
        let out_shape: Vec<usize> = ranges.iter().map(|r| r.end - r.start).collect();
        let mut out = ArrayData::zeros(self.dtype, out_shape.iter().product());
        if out.is_empty() {
            return Array::new(out_shape, out);
        }

        let first: Vec<usize> = ranges
            .iter()
            .zip(&self.tile_shape)
            .map(|(r, t)| r.start / t)
            .collect();
        let span: Vec<usize> = ranges
            .iter()
            .zip(&self.tile_shape)
            .zip(&first)
            .map(|((r, t), f)| (r.end - 1) / t - f + 1)
            .collect();

        let mut counter = vec![0usize; span.len()];
        loop {
            let coords: Vec<usize> = first.iter().zip(&counter).map(|(f, c)| f + c).collect();
            let tile = self.tile_index(&coords);
            let (origin, extent) = self.bounds_at(&coords);
            let data = self.decode_tile(reader, tile, extent.iter().product())?;

            let lo: Vec<usize> = origin.iter().zip(ranges).map(|(&o, r)| o.max(r.start)).collect();
            let hi: Vec<usize> = origin
                .iter()
                .zip(&extent)
                .zip(ranges)
                .map(|((&o, &e), r)| (o + e).min(r.end))
                .collect();
            let overlap: Vec<usize> = lo.iter().zip(&hi).map(|(l, h)| h - l).collect();
            let src_origin: Vec<usize> = lo.iter().zip(&origin).map(|(l, o)| l - o).collect();
            let dst_origin: Vec<usize> = lo.iter().zip(ranges).map(|(l, r)| l - r.start).collect();
            copy_region(&data, &extent, &src_origin, &mut out, &out_shape, &dst_origin, &overlap)?;

            if !advance(&mut counter, &span) {
                break;
            }
        }
        Array::new(out_shape, out)
    }

    pub fn read_all<R: Read + Seek>(&self, reader: &mut R) -> Result<Array> {
        let ranges: Vec<Range<usize>> = self.shape.iter().map(|&n| 0..n).collect();
        self.read_section(reader, &ranges)
    }
}
