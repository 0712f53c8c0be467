use anyhow::{Result, anyhow, bail};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Element type of an image. `Display` uses the conventional dtype names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dtype {
    U8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl Dtype {
    pub fn from_bitpix(bitpix: i64) -> Result<Self> {
        match bitpix {
            8 => Ok(Dtype::U8),
            16 => Ok(Dtype::I16),
            32 => Ok(Dtype::I32),
            64 => Ok(Dtype::I64),
            -32 => Ok(Dtype::F32),
            -64 => Ok(Dtype::F64),
            other => Err(anyhow!("unsupported BITPIX {}", other)),
        }
    }

    pub fn bitpix(self) -> i64 {
        match self {
            Dtype::U8 => 8,
            Dtype::I16 => 16,
            Dtype::I32 => 32,
            Dtype::I64 => 64,
            Dtype::F32 => -32,
            Dtype::F64 => -64,
        }
    }

    /// Bytes per element.
    pub fn size(self) -> usize {
        (self.bitpix().unsigned_abs() / 8) as usize
    }

    pub fn is_float(self) -> bool {
        matches!(self, Dtype::F32 | Dtype::F64)
    }

    pub fn name(self) -> &'static str {
        match self {
            Dtype::U8 => "uint8",
            Dtype::I16 => "int16",
            Dtype::I32 => "int32",
            Dtype::I64 => "int64",
            Dtype::F32 => "float32",
            Dtype::F64 => "float64",
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dtype {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "u8" | "uint8" => Ok(Dtype::U8),
            "i16" | "int16" => Ok(Dtype::I16),
            "i32" | "int32" => Ok(Dtype::I32),
            "i64" | "int64" => Ok(Dtype::I64),
            "f32" | "float32" => Ok(Dtype::F32),
            "f64" | "float64" => Ok(Dtype::F64),
            other => Err(anyhow!("unknown dtype '{}'", other)),
        }
    }
}

/// Flat element storage in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    U8(Vec<u8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! each_variant {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ArrayData::U8($v) => $body,
            ArrayData::I16($v) => $body,
            ArrayData::I32($v) => $body,
            ArrayData::I64($v) => $body,
            ArrayData::F32($v) => $body,
            ArrayData::F64($v) => $body,
        }
    };
}

macro_rules! build_variant {
    ($dtype:expr, $iter:expr, $t:ident => $conv:expr) => {
        match $dtype {
            Dtype::U8 => ArrayData::U8($iter.map(|$t| $conv as u8).collect()),
            Dtype::I16 => ArrayData::I16($iter.map(|$t| $conv as i16).collect()),
            Dtype::I32 => ArrayData::I32($iter.map(|$t| $conv as i32).collect()),
            Dtype::I64 => ArrayData::I64($iter.map(|$t| $conv as i64).collect()),
            Dtype::F32 => ArrayData::F32($iter.map(|$t| $conv as f32).collect()),
            Dtype::F64 => ArrayData::F64($iter.map(|$t| $conv as f64).collect()),
        }
    };
}

impl ArrayData {
    pub fn zeros(dtype: Dtype, len: usize) -> Self {
        match dtype {
            Dtype::U8 => ArrayData::U8(vec![0; len]),
            Dtype::I16 => ArrayData::I16(vec![0; len]),
            Dtype::I32 => ArrayData::I32(vec![0; len]),
            Dtype::I64 => ArrayData::I64(vec![0; len]),
            Dtype::F32 => ArrayData::F32(vec![0.0; len]),
            Dtype::F64 => ArrayData::F64(vec![0.0; len]),
        }
    }

    pub fn dtype(&self) -> Dtype {
        match self {
            ArrayData::U8(_) => Dtype::U8,
            ArrayData::I16(_) => Dtype::I16,
            ArrayData::I32(_) => Dtype::I32,
            ArrayData::I64(_) => Dtype::I64,
            ArrayData::F32(_) => Dtype::F32,
            ArrayData::F64(_) => Dtype::F64,
        }
    }

    pub fn len(&self) -> usize {
        each_variant!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_f64(&self, index: usize) -> Option<f64> {
        each_variant!(self, v => v.get(index).map(|x| *x as f64))
    }

    pub fn from_f64_iter<I: Iterator<Item = f64>>(dtype: Dtype, iter: I) -> Self {
        build_variant!(dtype, iter, x => x)
    }

    pub fn from_i64_iter<I: Iterator<Item = i64>>(dtype: Dtype, iter: I) -> Self {
        build_variant!(dtype, iter, x => x)
    }

    /// Cast every element with `as` semantics.
    pub fn cast(&self, dtype: Dtype) -> Self {
        if self.dtype() == dtype {
            return self.clone();
        }
        match self {
            ArrayData::I64(v) => Self::from_i64_iter(dtype, v.iter().copied()),
            other => Self::from_f64_iter(dtype, (0..other.len()).filter_map(|i| other.get_f64(i))),
        }
    }

    /// Decode big-endian bytes as stored in a FITS data unit.
    pub fn from_be_bytes(dtype: Dtype, bytes: &[u8]) -> Result<Self> {
        let size = dtype.size();
        if bytes.len() % size != 0 {
            bail!("{} bytes is not a whole number of {} elements", bytes.len(), dtype);
        }
        macro_rules! decode {
            ($t:ty, $variant:ident) => {
                ArrayData::$variant(
                    bytes
                        .chunks_exact(size)
                        .map(|c| {
                            let mut raw = [0u8; std::mem::size_of::<$t>()];
                            raw.copy_from_slice(c);
                            <$t>::from_be_bytes(raw)
                        })
                        .collect(),
                )
            };
        }
        Ok(match dtype {
            Dtype::U8 => ArrayData::U8(bytes.to_vec()),
            Dtype::I16 => decode!(i16, I16),
            Dtype::I32 => decode!(i32, I32),
            Dtype::I64 => decode!(i64, I64),
            Dtype::F32 => decode!(f32, F32),
            Dtype::F64 => decode!(f64, F64),
        })
    }

    pub fn to_be_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len() * self.dtype().size());
        each_variant!(self, v => {
            for x in v {
                out.extend_from_slice(&x.to_be_bytes());
            }
        });
        out
    }

    /// Copy `n` elements of `src` starting at `src_start` into `self` at `dst_start`.
    pub(crate) fn copy_from(&mut self, dst_start: usize, src: &ArrayData, src_start: usize, n: usize) -> Result<()> {
        macro_rules! copy {
            ($d:expr, $s:expr) => {{
                let dst = $d
                    .get_mut(dst_start..dst_start + n)
                    .ok_or_else(|| anyhow!("destination range out of bounds"))?;
                let src = $s
                    .get(src_start..src_start + n)
                    .ok_or_else(|| anyhow!("source range out of bounds"))?;
                dst.copy_from_slice(src);
            }};
        }
        match (self, src) {
            (ArrayData::U8(d), ArrayData::U8(s)) => copy!(d, s),
            (ArrayData::I16(d), ArrayData::I16(s)) => copy!(d, s),
            (ArrayData::I32(d), ArrayData::I32(s)) => copy!(d, s),
            (ArrayData::I64(d), ArrayData::I64(s)) => copy!(d, s),
            (ArrayData::F32(d), ArrayData::F32(s)) => copy!(d, s),
            (ArrayData::F64(d), ArrayData::F64(s)) => copy!(d, s),
            (d, s) => bail!("cannot copy {} elements into {} storage", s.dtype(), d.dtype()),
        }
        Ok(())
    }
}

/// An in-memory N-dimensional array, slowest axis first.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    shape: Vec<usize>,
    data: ArrayData,
}

impl Array {
    pub fn new(shape: Vec<usize>, data: ArrayData) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            bail!("shape {:?} needs {} elements, got {}", shape, expected, data.len());
        }
        Ok(Self { shape, data })
    }

    pub fn zeros(shape: Vec<usize>, dtype: Dtype) -> Self {
        let len = shape.iter().product();
        Self {
            shape,
            data: ArrayData::zeros(dtype, len),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> Dtype {
        self.data.dtype()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn into_data(self) -> ArrayData {
        self.data
    }

    pub fn get_f64(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.shape.len() || index.iter().zip(&self.shape).any(|(i, n)| i >= n) {
            return None;
        }
        let offset: usize = index.iter().zip(strides(&self.shape)).map(|(i, s)| i * s).sum();
        self.data.get_f64(offset)
    }

    pub fn cast(&self, dtype: Dtype) -> Array {
        Array {
            shape: self.shape.clone(),
            data: self.data.cast(dtype),
        }
    }

    /// Copy out the hyper-rectangle selected by `ranges`.
    pub fn section(&self, ranges: &[Range<usize>]) -> Result<Array> {
        check_ranges(&self.shape, ranges)?;
        let extent: Vec<usize> = ranges.iter().map(|r| r.end - r.start).collect();
        let origin: Vec<usize> = ranges.iter().map(|r| r.start).collect();
        let mut out = Array::zeros(extent.clone(), self.dtype());
        let zero = vec![0; extent.len()];
        copy_region(
            &self.data,
            &self.shape,
            &origin,
            &mut out.data,
            &extent,
            &zero,
            &extent,
        )?;
        Ok(out)
    }
}

pub(crate) fn strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    strides
}

pub(crate) fn check_ranges(shape: &[usize], ranges: &[Range<usize>]) -> Result<()> {
    if ranges.len() != shape.len() {
        bail!("expected {} ranges for shape {:?}, got {}", shape.len(), shape, ranges.len());
    }
    for (axis, (range, &len)) in ranges.iter().zip(shape).enumerate() {
        if range.start > range.end || range.end > len {
            bail!("range {:?} is out of bounds for axis {} of length {}", range, axis, len);
        }
    }
    Ok(())
}

/// Step a row-major counter; returns `false` once every combination was visited.
pub(crate) fn advance(counter: &mut [usize], limits: &[usize]) -> bool {
    for axis in (0..counter.len()).rev() {
        counter[axis] += 1;
        if counter[axis] < limits[axis] {
            return true;
        }
        counter[axis] = 0;
    }
    false
}

/// Copy an `extent`-sized block between two row-major buffers.
pub(crate) fn copy_region(
    src: &ArrayData,
    src_shape: &[usize],
    src_origin: &[usize],
    dst: &mut ArrayData,
    dst_shape: &[usize],
    dst_origin: &[usize],
    extent: &[usize],
) -> Result<()> {
    let ndim = extent.len();
    if ndim == 0 || extent.contains(&0) {
        return Ok(());
    }
    let last = ndim - 1;
    let run = extent[last];
    let src_strides = strides(src_shape);
    let dst_strides = strides(dst_shape);
    let mut counter = vec![0usize; last];
    loop {
        let mut s = src_origin[last];
        let mut d = dst_origin[last];
        for axis in 0..last {
            s += (src_origin[axis] + counter[axis]) * src_strides[axis];
            d += (dst_origin[axis] + counter[axis]) * dst_strides[axis];
        }
        dst.copy_from(d, src, s, run)?;
        if !advance(&mut counter, &extent[..last]) {
            return Ok(());
        }
    }
}
