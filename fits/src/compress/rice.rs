//! Rice coding of integer pixel streams as used by the `RICE_1` tile
//! compression convention.
//!
//! Values travel as raw bit patterns of the pixel width (8, 16 or 32 bits).
//! Each block of `block_size` pixels stores first differences mapped to
//! non-negative integers, split into a unary high part and `fs` low bits.

use anyhow::{Result, bail};

#[derive(Debug, Clone, Copy)]
struct Width {
    bits: u32,
    fs_bits: u32,
    fs_max: u32,
}

fn width(bytepix: usize) -> Result<Width> {
    match bytepix {
        1 => Ok(Width {
            bits: 8,
            fs_bits: 3,
            fs_max: 6,
        }),
        2 => Ok(Width {
            bits: 16,
            fs_bits: 4,
            fs_max: 14,
        }),
        4 => Ok(Width {
            bits: 32,
            fs_bits: 5,
            fs_max: 25,
        }),
        other => bail!("RICE_1 supports 1, 2 or 4 bytes per pixel, got {}", other),
    }
}

fn mask(bits: u32) -> u64 {
    if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 }
}

fn sign_extend(value: u64, bits: u32) -> i64 {
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

struct BitWriter {
    out: Vec<u8>,
    acc: u64,
    pending: u32,
}

impl BitWriter {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            out: Vec::with_capacity(capacity),
            acc: 0,
            pending: 0,
        }
    }

    /// Append the low `n` bits of `value`, most significant first. `n <= 32`.
    fn put(&mut self, value: u32, n: u32) {
        if n == 0 {
            return;
        }
        self.acc = (self.acc << n) | (value as u64 & mask(n));
        self.pending += n;
        while self.pending >= 8 {
            self.pending -= 8;
            self.out.push((self.acc >> self.pending) as u8);
        }
        self.acc &= mask(self.pending);
    }

    /// `zeros` zero bits followed by a single one bit.
    fn put_unary(&mut self, mut zeros: u32) {
        while zeros >= 32 {
            self.put(0, 32);
            zeros -= 32;
        }
        self.put(1, zeros + 1);
    }

    fn finish(mut self) -> Vec<u8> {
        if self.pending > 0 {
            self.out.push((self.acc << (8 - self.pending)) as u8);
        }
        self.out
    }
}

struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() * 8 - self.pos
    }

    fn get(&mut self, n: u32) -> Result<u32> {
        if n as usize > self.remaining() {
            bail!("rice stream truncated");
        }
        let mut value = 0u64;
        let mut left = n;
        while left > 0 {
            let byte = self.data[self.pos / 8] as u32;
            let offset = (self.pos % 8) as u32;
            let avail = 8 - offset;
            let take = avail.min(left);
            let bits = (byte >> (avail - take)) & ((1 << take) - 1);
            value = (value << take) | bits as u64;
            self.pos += take as usize;
            left -= take;
        }
        Ok(value as u32)
    }

    /// Count zero bits up to and including the next one bit.
    fn get_unary(&mut self) -> Result<u32> {
        let mut zeros = 0u32;
        loop {
            if self.remaining() == 0 {
                bail!("rice stream truncated inside unary code");
            }
            let offset = (self.pos % 8) as u32;
            let rest = self.data[self.pos / 8] << offset;
            if rest == 0 {
                let skipped = 8 - offset;
                zeros += skipped;
                self.pos += skipped as usize;
                continue;
            }
            let lead = rest.leading_zeros();
            zeros += lead;
            self.pos += lead as usize + 1;
            return Ok(zeros);
        }
    }
}

/// Compress `values` (bit patterns of `bytepix`-byte pixels).
pub fn encode(values: &[u32], bytepix: usize, block_size: usize) -> Result<Vec<u8>> {
    let w = width(bytepix)?;
    if block_size == 0 {
        bail!("rice block size must be positive");
    }
    let value_mask = mask(w.bits);
    let mut out = BitWriter::with_capacity(values.len() * bytepix / 2 + 8);
    let Some(&first) = values.first() else {
        return Ok(Vec::new());
    };

    let mut last = first as u64 & value_mask;
    out.put(last as u32, w.bits);

    let mut mapped = vec![0u32; block_size];
    for block in values.chunks(block_size) {
        let mut sum = 0u64;
        for (slot, &raw) in mapped.iter_mut().zip(block) {
            let value = raw as u64 & value_mask;
            let diff = sign_extend(value.wrapping_sub(last) & value_mask, w.bits);
            let folded = if diff < 0 { !(diff << 1) } else { diff << 1 };
            *slot = (folded as u64 & value_mask) as u32;
            sum += *slot as u64;
            last = value;
        }

        let n = block.len() as f64;
        let mean = ((sum as f64 - (block.len() / 2) as f64 - 1.0) / n).max(0.0);
        let mut psum = (mean as u64) >> 1;
        let mut fs = 0u32;
        while psum > 0 {
            fs += 1;
            psum >>= 1;
        }

        let diffs = &mapped[..block.len()];
        if fs >= w.fs_max {
            out.put(w.fs_max + 1, w.fs_bits);
            for &d in diffs {
                out.put(d, w.bits);
            }
        } else if fs == 0 && sum == 0 {
            out.put(0, w.fs_bits);
        } else {
            out.put(fs + 1, w.fs_bits);
            let low_mask = (1u32 << fs) - 1;
            for &d in diffs {
                out.put_unary(d >> fs);
                out.put(d & low_mask, fs);
            }
        }
    }
    Ok(out.finish())
}

/// Expand a Rice stream into `count` pixel bit patterns.
pub fn decode(bytes: &[u8], count: usize, bytepix: usize, block_size: usize) -> Result<Vec<u32>> {
    let w = width(bytepix)?;
    if block_size == 0 {
        bail!("rice block size must be positive");
    }
    let value_mask = mask(w.bits);
    let mut out = Vec::with_capacity(count);
    if count == 0 {
        return Ok(out);
    }
    let mut reader = BitReader::new(bytes);
    let mut last = reader.get(w.bits)? as u64;

    let apply = |last: u64, folded: u64| -> u64 {
        let diff = if folded & 1 == 0 {
            (folded >> 1) as i64
        } else {
            !((folded >> 1) as i64)
        };
        (last as i64).wrapping_add(diff) as u64 & value_mask
    };

    while out.len() < count {
        let in_block = block_size.min(count - out.len());
        let code = reader.get(w.fs_bits)?;
        if code == 0 {
            out.extend(std::iter::repeat_n(last as u32, in_block));
        } else if code == w.fs_max + 1 {
            for _ in 0..in_block {
                let folded = reader.get(w.bits)? as u64;
                last = apply(last, folded);
                out.push(last as u32);
            }
        } else if code <= w.fs_max {
            let fs = code - 1;
            for _ in 0..in_block {
                let high = reader.get_unary()? as u64;
                let low = reader.get(fs)? as u64;
                let folded = ((high << fs) | low) & value_mask;
                last = apply(last, folded);
                out.push(last as u32);
            }
        } else {
            bail!("invalid rice block code {}", code);
        }
    }
    Ok(out)
}
