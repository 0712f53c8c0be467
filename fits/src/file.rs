use crate::array::{Array, ArrayData, Dtype, advance, check_ranges, strides};
use crate::header::Header;
use crate::padded_len;
use crate::tiled::TiledImage;
use anyhow::{Context, Result, anyhow, bail};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HduKind {
    Primary,
    Image,
    CompressedImage,
    BinTable,
    Other,
}

/// Location and header of one HDU; no pixel data.
#[derive(Debug, Clone)]
pub struct HduInfo {
    pub index: usize,
    pub header: Header,
    pub header_offset: u64,
    pub data_offset: u64,
    pub data_len: u64,
}

impl HduInfo {
    pub fn kind(&self) -> HduKind {
        if self.index == 0 {
            return HduKind::Primary;
        }
        match self.header.get_str("XTENSION").map(str::trim) {
            Some("IMAGE") => HduKind::Image,
            Some("BINTABLE") if self.header.get_bool("ZIMAGE") == Some(true) => HduKind::CompressedImage,
            Some("BINTABLE") => HduKind::BinTable,
            _ => HduKind::Other,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.header.get_str("EXTNAME")
    }

    /// Whether this HDU holds an image with at least one pixel.
    pub fn has_image(&self, raw: bool) -> bool {
        match self.kind() {
            HduKind::Primary | HduKind::Image => self.header.get_int("NAXIS").unwrap_or(0) > 0,
            HduKind::CompressedImage => !raw,
            _ => false,
        }
    }
}

fn data_len(header: &Header) -> Result<u64> {
    let naxis = header.require_int("NAXIS")?;
    if naxis == 0 {
        return Ok(0);
    }
    let bitpix = header.require_int("BITPIX")?;
    let elements: u64 = header.axes("NAXIS")?.iter().map(|&n| n as u64).product();
    let pcount = header.get_int("PCOUNT").unwrap_or(0).max(0) as u64;
    let gcount = header.get_int("GCOUNT").unwrap_or(1).max(1) as u64;
    Ok(bitpix.unsigned_abs() / 8 * gcount * (pcount + elements))
}

/// An opened FITS file with every HDU header scanned.
#[derive(Debug)]
pub struct FitsFile {
    path: PathBuf,
    file: File,
    hdus: Vec<HduInfo>,
    raw: bool,
}

impl FitsFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path.as_ref(), false)
    }

    /// Open without interpreting tile-compressed images; they stay binary tables.
    pub fn open_raw(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path.as_ref(), true)
    }

    fn open_with(path: &Path, raw: bool) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
        let hdus = scan(&file).with_context(|| format!("scan HDUs of {}", path.display()))?;
        if hdus.is_empty() {
            bail!("{} contains no HDUs", path.display());
        }
        debug!(path = %path.display(), hdus = hdus.len(), raw, "opened FITS file");
        Ok(Self {
            path: path.to_path_buf(),
            file,
            hdus,
            raw,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.hdus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hdus.is_empty()
    }

    pub fn hdus(&self) -> &[HduInfo] {
        &self.hdus
    }

    pub fn hdu(&self, index: usize) -> Result<&HduInfo> {
        self.hdus
            .get(index)
            .ok_or_else(|| anyhow!("HDU {} does not exist ({} HDUs)", index, self.hdus.len()))
    }

    /// Image view over HDU `index` with its own file handle.
    pub fn image(&self, index: usize) -> Result<ImageHdu> {
        let info = self.hdu(index)?.clone();
        let layout = match info.kind() {
            HduKind::CompressedImage if !self.raw => {
                Layout::Tiled(TiledImage::from_header(&info.header, info.data_offset)?)
            }
            HduKind::Primary | HduKind::Image => {
                let dtype = Dtype::from_bitpix(info.header.require_int("BITPIX")?)?;
                let shape = info.header.axes("NAXIS")?;
                if shape.is_empty() {
                    bail!("HDU {} has no image data", index);
                }
                Layout::Plain { shape, dtype }
            }
            other => bail!("HDU {} is not an image ({:?})", index, other),
        };
        let file = self.file.try_clone().context("duplicate file handle")?;
        Ok(ImageHdu { file, info, layout })
    }

    /// The first HDU that carries image pixels.
    pub fn first_image(&self) -> Result<ImageHdu> {
        let index = self
            .hdus
            .iter()
            .position(|h| h.has_image(self.raw))
            .ok_or_else(|| anyhow!("{} contains no image HDU", self.path.display()))?;
        self.image(index)
    }
}

fn scan(file: &File) -> Result<Vec<HduInfo>> {
    let file_len = file.metadata().context("stat file")?.len();
    let mut reader = BufReader::new(file);
    let mut hdus = Vec::new();
    let mut offset = 0u64;
    while offset < file_len {
        reader.seek(SeekFrom::Start(offset))?;
        let Some((header, header_len)) = Header::read_from(&mut reader)? else {
            break;
        };
        let data_offset = offset + header_len;
        let data_len = data_len(&header).with_context(|| format!("size data of HDU {}", hdus.len()))?;
        hdus.push(HduInfo {
            index: hdus.len(),
            header,
            header_offset: offset,
            data_offset,
            data_len,
        });
        offset = data_offset + padded_len(data_len);
    }
    Ok(hdus)
}

#[derive(Debug)]
enum Layout {
    Plain { shape: Vec<usize>, dtype: Dtype },
    Tiled(TiledImage),
}

/// An image HDU that owns a handle to its file; closing happens on drop.
#[derive(Debug)]
pub struct ImageHdu {
    file: File,
    info: HduInfo,
    layout: Layout,
}

impl ImageHdu {
    pub fn index(&self) -> usize {
        self.info.index
    }

    pub fn header(&self) -> &Header {
        &self.info.header
    }

    pub fn shape(&self) -> &[usize] {
        match &self.layout {
            Layout::Plain { shape, .. } => shape,
            Layout::Tiled(tiled) => tiled.shape(),
        }
    }

    pub fn dtype(&self) -> Dtype {
        match &self.layout {
            Layout::Plain { dtype, .. } => *dtype,
            Layout::Tiled(tiled) => tiled.dtype(),
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self.layout, Layout::Tiled(_))
    }

    pub fn tiled(&self) -> Option<&TiledImage> {
        match &self.layout {
            Layout::Tiled(tiled) => Some(tiled),
            Layout::Plain { .. } => None,
        }
    }

    /// Tile shape for compressed images; plain images are a single tile.
    pub fn tile_shape(&self) -> &[usize] {
        match &self.layout {
            Layout::Plain { shape, .. } => shape,
            Layout::Tiled(tiled) => tiled.tile_shape(),
        }
    }

    pub fn tile_count(&self) -> usize {
        self.tiled().map_or(1, TiledImage::tile_count)
    }

    /// Materialize the whole image.
    pub fn data(&mut self) -> Result<Array> {
        match &self.layout {
            Layout::Plain { shape, dtype } => {
                let len = shape.iter().product::<usize>() * dtype.size();
                self.file
                    .seek(SeekFrom::Start(self.info.data_offset))
                    .context("seek to image data")?;
                let mut bytes = vec![0u8; len];
                self.file.read_exact(&mut bytes).context("read image data")?;
                Array::new(shape.clone(), ArrayData::from_be_bytes(*dtype, &bytes)?)
            }
            Layout::Tiled(tiled) => {
                let mut reader = BufReader::new(&self.file);
                tiled.read_all(&mut reader)
            }
        }
    }

    /// Materialize a hyper-rectangle given as one range per axis, slowest first.
    pub fn section(&mut self, ranges: &[Range<usize>]) -> Result<Array> {
        match &self.layout {
            Layout::Plain { shape, dtype } => {
                read_plain_section(&mut self.file, self.info.data_offset, shape, *dtype, ranges)
            }
            Layout::Tiled(tiled) => {
                let mut reader = BufReader::new(&self.file);
                tiled.read_section(&mut reader, ranges)
            }
        }
    }

    pub fn read_tile(&mut self, tile: usize) -> Result<Array> {
        if let Layout::Tiled(tiled) = &self.layout {
            let mut reader = BufReader::new(&self.file);
            return tiled.read_tile(&mut reader, tile);
        }
        if tile != 0 {
            bail!("uncompressed image has a single tile, asked for {}", tile);
        }
        self.data()
    }
}

fn read_plain_section(
    file: &mut File,
    data_offset: u64,
    shape: &[usize],
    dtype: Dtype,
    ranges: &[Range<usize>],
) -> Result<Array> {
    check_ranges(shape, ranges)?;
    let out_shape: Vec<usize> = ranges.iter().map(|r| r.end - r.start).collect();
    let count: usize = out_shape.iter().product();
    let size = dtype.size();
    let mut bytes = vec![0u8; count * size];
    if count == 0 {
        return Array::new(out_shape, ArrayData::from_be_bytes(dtype, &bytes)?);
    }

    let last = shape.len() - 1;
    let run = out_shape[last] * size;
    let element_strides = strides(shape);
    let mut counter = vec![0usize; last];
    let mut filled = 0;
    loop {
        let mut element = ranges[last].start;
        for axis in 0..last {
            element += (ranges[axis].start + counter[axis]) * element_strides[axis];
        }
        file.seek(SeekFrom::Start(data_offset + (element * size) as u64))
            .context("seek to section row")?;
        file.read_exact(&mut bytes[filled..filled + run])
            .context("read section row")?;
        filled += run;
        if !advance(&mut counter, &out_shape[..last]) {
            break;
        }
    }
    Array::new(out_shape, ArrayData::from_be_bytes(dtype, &bytes)?)
}
