use crate::array::{Array, ArrayData, advance, copy_region};
use crate::compress::{self, Compression, RiceParams};
use crate::header::{Card, Header, Value};
use crate::padded_len;
use anyhow::{Context, Result, bail};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// How `write_compressed` tiles and encodes an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionParams {
    pub compression: Compression,
    /// Tile edge lengths, slowest axis first. Clipped to the image shape.
    pub tile_shape: Vec<usize>,
    pub block_size: usize,
}

impl CompressionParams {
    pub fn new(compression: Compression, tile_shape: Vec<usize>) -> Self {
        Self {
            compression,
            tile_shape,
            block_size: RiceParams::default().block_size,
        }
    }

    pub fn rice(tile_shape: Vec<usize>) -> Self {
        Self::new(Compression::Rice1, tile_shape)
    }

    pub fn gzip(tile_shape: Vec<usize>) -> Self {
        Self::new(Compression::Gzip1, tile_shape)
    }
}

fn image_axes(header: &mut Header, prefix: &str, shape: &[usize]) {
    header.push(Card::new(prefix, Value::Int(shape.len() as i64)));
    for (axis, len) in shape.iter().rev().enumerate() {
        header.push(Card::new(&format!("{}{}", prefix, axis + 1), Value::Int(*len as i64)));
    }
}

fn write_hdus(path: &Path, units: &[(Header, Vec<u8>)]) -> Result<u64> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let mut written = 0u64;
    for (header, data) in units {
        let header_bytes = header.to_bytes();
        writer.write_all(&header_bytes)?;
        written += header_bytes.len() as u64;
        if !data.is_empty() {
            writer.write_all(data)?;
            let padded = padded_len(data.len() as u64);
            let padding = (padded - data.len() as u64) as usize;
            writer.write_all(&vec![0u8; padding])?;
            written += padded;
        }
    }
    writer.flush().with_context(|| format!("flush {}", path.display()))?;
    Ok(written)
}

/// Write `array` as the primary HDU of a new file. Returns the file size.
pub fn write_image(path: impl AsRef<Path>, array: &Array) -> Result<u64> {
    let path = path.as_ref();
    let mut header = Header::new();
    header.push(Card::new("SIMPLE", Value::Logical(true)).with_comment("conforms to FITS standard"));
    header.push(Card::new("BITPIX", Value::Int(array.dtype().bitpix())));
    image_axes(&mut header, "NAXIS", array.shape());
    header.push(Card::new("EXTEND", Value::Logical(true)));
    write_hdus(path, &[(header, array.data().to_be_bytes())])
}

/// Write `array` tile-compressed into extension 1 behind an empty primary HDU.
/// Returns the file size.
pub fn write_compressed(path: impl AsRef<Path>, array: &Array, params: &CompressionParams) -> Result<u64> {
    let path = path.as_ref();
    let shape = array.shape();
    if shape.is_empty() || shape.contains(&0) {
        bail!("cannot compress an image of shape {:?}", shape);
    }
    if params.tile_shape.len() != shape.len() {
        bail!(
            "tile shape {:?} does not match image dimensionality {}",
            params.tile_shape,
            shape.len()
        );
    }
    if params.tile_shape.contains(&0) {
        bail!("tile edges must be positive, got {:?}", params.tile_shape);
    }
    let rice = match params.compression {
        Compression::Rice1 => compress::rice_params_for(array.dtype(), params.block_size)?,
        _ => RiceParams::default(),
    };

    let tile_shape: Vec<usize> = params.tile_shape.iter().zip(shape).map(|(&t, &n)| t.min(n)).collect();
    let grid: Vec<usize> = shape.iter().zip(&tile_shape).map(|(&n, &t)| n.div_ceil(t)).collect();
    let tiles: usize = grid.iter().product();

    let mut descriptors = Vec::with_capacity(tiles * 8);
    let mut heap = Vec::new();
    let mut max_len = 0usize;
    let mut coords = vec![0usize; grid.len()];
    loop {
        let origin: Vec<usize> = coords.iter().zip(&tile_shape).map(|(c, t)| c * t).collect();
        let extent: Vec<usize> = origin
            .iter()
            .zip(&tile_shape)
            .zip(shape)
            .map(|((&o, &t), &n)| t.min(n - o))
            .collect();
        let mut tile = ArrayData::zeros(array.dtype(), extent.iter().product());
        let zero = vec![0; extent.len()];
        copy_region(array.data(), shape, &origin, &mut tile, &extent, &zero, &extent)?;
        let encoded = compress::compress(params.compression, &tile, rice)?;

        let offset = i32::try_from(heap.len()).context("compressed heap exceeds 2 GiB")?;
        let len = i32::try_from(encoded.len()).context("compressed tile exceeds 2 GiB")?;
        descriptors.extend_from_slice(&len.to_be_bytes());
        descriptors.extend_from_slice(&offset.to_be_bytes());
        max_len = max_len.max(encoded.len());
        heap.extend_from_slice(&encoded);

        if !advance(&mut coords, &grid) {
            break;
        }
    }

    let mut primary = Header::new();
    primary.push(Card::new("SIMPLE", Value::Logical(true)).with_comment("conforms to FITS standard"));
    primary.push(Card::new("BITPIX", Value::Int(8)));
    primary.push(Card::new("NAXIS", Value::Int(0)));
    primary.push(Card::new("EXTEND", Value::Logical(true)));

    let mut table = Header::new();
    table.push(Card::new("XTENSION", Value::Str("BINTABLE".into())).with_comment("binary table extension"));
    table.push(Card::new("BITPIX", Value::Int(8)));
    table.push(Card::new("NAXIS", Value::Int(2)));
    table.push(Card::new("NAXIS1", Value::Int(8)).with_comment("width of table in bytes"));
    table.push(Card::new("NAXIS2", Value::Int(tiles as i64)).with_comment("number of tiles"));
    table.push(Card::new("PCOUNT", Value::Int(heap.len() as i64)).with_comment("size of heap"));
    table.push(Card::new("GCOUNT", Value::Int(1)));
    table.push(Card::new("TFIELDS", Value::Int(1)));
    table.push(Card::new("TTYPE1", Value::Str("COMPRESSED_DATA".into())));
    table.push(Card::new("TFORM1", Value::Str(format!("1PB({})", max_len))));
    table.push(Card::new("ZIMAGE", Value::Logical(true)).with_comment("extension contains compressed image"));
    table.push(Card::new("ZBITPIX", Value::Int(array.dtype().bitpix())));
    image_axes(&mut table, "ZNAXIS", shape);
    for (axis, len) in tile_shape.iter().rev().enumerate() {
        table.push(Card::new(&format!("ZTILE{}", axis + 1), Value::Int(*len as i64)));
    }
    table.push(Card::new("ZCMPTYPE", Value::Str(params.compression.name().into())));
    if params.compression == Compression::Rice1 {
        table.push(Card::new("ZNAME1", Value::Str("BLOCKSIZE".into())));
        table.push(Card::new("ZVAL1", Value::Int(rice.block_size as i64)));
        table.push(Card::new("ZNAME2", Value::Str("BYTEPIX".into())));
        table.push(Card::new("ZVAL2", Value::Int(rice.bytepix as i64)));
    }
    table.push(Card::new("EXTNAME", Value::Str("COMPRESSED_IMAGE".into())));

    let mut data = descriptors;
    data.extend_from_slice(&heap);
    let written = write_hdus(path, &[(primary, Vec::new()), (table, data)])?;
    debug!(
        path = %path.display(),
        tiles,
        compression = %params.compression,
        bytes = written,
        "wrote compressed image"
    );
    Ok(written)
}
