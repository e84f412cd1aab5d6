//! MSB-first bit packing for frame data

use super::error::{TvqError, TvqResult};

/// Appends fields MSB first; the last byte is zero padded.
#[derive(Debug, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    /// pending bits, right aligned
    acc: u32,
    acc_len: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// write the low `num_bits` of `value`, most significant first
    pub fn write_bits(&mut self, value: u32, num_bits: u8) {
        for i in (0..u32::from(num_bits)).rev() {
            self.acc = (self.acc << 1) | ((value >> i) & 1);
            self.acc_len += 1;
            if self.acc_len == 8 {
                self.bytes.push(self.acc as u8);
                self.acc = 0;
                self.acc_len = 0;
            }
        }
    }

    /// total bits written so far
    pub fn bit_len(&self) -> usize {
        self.bytes.len() * 8 + self.acc_len as usize
    }

    pub fn into_bytes(mut self) -> Vec<u8> {
        if self.acc_len > 0 {
            self.bytes.push((self.acc << (8 - self.acc_len)) as u8);
        }
        self.bytes
    }
}

/// Reads MSB-first fields from a byte slice
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self::with_offset(bytes, 0)
    }

    /// reader starting `bit_offset` bits into `bytes`
    pub fn with_offset(bytes: &'a [u8], bit_offset: usize) -> Self {
        Self {
            bytes,
            pos: bit_offset,
        }
    }

    /// fails without consuming anything when fewer than `num_bits` remain
    pub fn read_bits(&mut self, num_bits: u8) -> TvqResult<u32> {
        let width = num_bits as usize;
        if self.remaining_bits() < width {
            return Err(TvqError::UnexpectedEof {
                needed: width.div_ceil(8),
                offset: self.pos / 8,
            });
        }

        let value = (self.pos..self.pos + width).fold(0u32, |v, p| {
            let bit = (self.bytes[p / 8] >> (7 - p % 8)) & 1;
            (v << 1) | u32::from(bit)
        });
        self.pos += width;
        Ok(value)
    }

    /// bits consumed so far, counted from the start of the slice
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining_bits(&self) -> usize {
        (self.bytes.len() * 8).saturating_sub(self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_straddle_bytes() {
        let mut w = BitWriter::new();
        w.write_bits(0b101, 3);
        w.write_bits(0x1ff, 9);
        assert_eq!(w.bit_len(), 12);
        assert_eq!(w.into_bytes(), vec![0b1011_1111, 0b1111_0000]);
    }

    #[test]
    fn short_read_leaves_position() {
        let mut r = BitReader::new(&[0xa5]);
        assert_eq!(r.read_bits(4).unwrap(), 0xa);
        assert!(matches!(r.read_bits(5), Err(TvqError::UnexpectedEof { .. })));
        assert_eq!(r.position(), 4);
        assert_eq!(r.read_bits(4).unwrap(), 0x5);
        assert_eq!(r.remaining_bits(), 0);
    }
}
