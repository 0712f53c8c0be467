pub mod rice;

use crate::array::{ArrayData, Dtype};
use anyhow::{Context, Result, anyhow, bail};
use flate2::Compression as Level;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::GzEncoder;
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

/// Tile compression algorithms (`ZCMPTYPE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    Rice1,
    Gzip1,
    /// Gzip over byte-shuffled pixels. Read-only.
    Gzip2,
}

impl Compression {
    pub fn name(self) -> &'static str {
        match self {
            Compression::Rice1 => "RICE_1",
            Compression::Gzip1 => "GZIP_1",
            Compression::Gzip2 => "GZIP_2",
        }
    }

    /// Lossless choice for a dtype: Rice for 8/16/32-bit integers, gzip otherwise.
    pub fn default_for(dtype: Dtype) -> Self {
        match dtype {
            Dtype::U8 | Dtype::I16 | Dtype::I32 => Compression::Rice1,
            Dtype::I64 | Dtype::F32 | Dtype::F64 => Compression::Gzip1,
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Compression {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "RICE_1" | "RICE" => Ok(Compression::Rice1),
            "GZIP_1" | "GZIP" => Ok(Compression::Gzip1),
            "GZIP_2" => Ok(Compression::Gzip2),
            other => Err(anyhow!("unsupported compression '{}'", other)),
        }
    }
}

/// Parameters of the Rice coder (`ZNAMEn = 'BLOCKSIZE' / 'BYTEPIX'`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiceParams {
    pub block_size: usize,
    pub bytepix: usize,
}

impl Default for RiceParams {
    fn default() -> Self {
        Self {
            block_size: 32,
            bytepix: 4,
        }
    }
}

fn rice_bytepix(dtype: Dtype) -> Result<usize> {
    match dtype {
        Dtype::U8 | Dtype::I16 | Dtype::I32 => Ok(dtype.size()),
        other => bail!(
            "RICE_1 needs 8, 16 or 32-bit integer pixels; {} data would require quantization",
            other
        ),
    }
}

pub(crate) fn rice_params_for(dtype: Dtype, block_size: usize) -> Result<RiceParams> {
    Ok(RiceParams {
        block_size,
        bytepix: rice_bytepix(dtype)?,
    })
}

pub(crate) fn compress(compression: Compression, data: &ArrayData, rice: RiceParams) -> Result<Vec<u8>> {
    match compression {
        Compression::Rice1 => {
            let raw: Vec<u32> = match data {
                ArrayData::U8(v) => v.iter().map(|&x| x as u32).collect(),
                ArrayData::I16(v) => v.iter().map(|&x| x as u16 as u32).collect(),
                ArrayData::I32(v) => v.iter().map(|&x| x as u32).collect(),
                other => bail!("RICE_1 cannot encode {} pixels", other.dtype()),
            };
            rice::encode(&raw, rice.bytepix, rice.block_size)
        }
        Compression::Gzip1 => {
            let mut encoder = GzEncoder::new(Vec::new(), Level::default());
            encoder.write_all(&data.to_be_bytes()).context("gzip tile")?;
            encoder.finish().context("finish gzip tile")
        }
        Compression::Gzip2 => bail!("writing GZIP_2 tiles is not supported"),
    }
}

pub(crate) fn decompress(
    compression: Compression,
    bytes: &[u8],
    dtype: Dtype,
    count: usize,
    rice: RiceParams,
) -> Result<ArrayData> {
    match compression {
        Compression::Rice1 => {
            let raw = rice::decode(bytes, count, rice.bytepix, rice.block_size)?;
            let bits = (rice.bytepix * 8) as u32;
            let values = raw.into_iter().map(|v| {
                if bits == 8 {
                    v as i64
                } else {
                    let shift = 64 - bits;
                    (((v as u64) << shift) as i64) >> shift
                }
            });
            Ok(ArrayData::from_i64_iter(dtype, values))
        }
        Compression::Gzip1 => {
            let plain = inflate(bytes, count * dtype.size())?;
            ArrayData::from_be_bytes(dtype, &plain)
        }
        Compression::Gzip2 => {
            let shuffled = inflate(bytes, count * dtype.size())?;
            let size = dtype.size();
            let mut plain = vec![0u8; shuffled.len()];
            for (k, plane) in shuffled.chunks(count.max(1)).enumerate() {
                for (i, &b) in plane.iter().enumerate() {
                    plain[i * size + k] = b;
                }
            }
            ArrayData::from_be_bytes(dtype, &plain)
        }
    }
}

fn inflate(bytes: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected);
    if bytes.starts_with(&[0x1f, 0x8b]) {
        GzDecoder::new(bytes).read_to_end(&mut out).context("gunzip tile")?;
    } else {
        ZlibDecoder::new(bytes).read_to_end(&mut out).context("inflate tile")?;
    }
    if out.len() != expected {
        bail!("tile inflated to {} bytes, expected {}", out.len(), expected);
    }
    Ok(out)
}
