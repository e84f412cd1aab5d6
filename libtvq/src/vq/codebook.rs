//! Two-stage conjugate codebooks and the search over them.
//!
//! Each interleave type has two 64-row codebooks. A code of up to 6 bits
//! picks a row directly; a 7-bit code uses 0x40 as a sign and the low six
//! bits as the row. Row 0 is all zeros so any sub-vector can be coded as
//! silence.

use std::sync::OnceLock;

use crate::core::{InterleaveType, TvqResult, MAX_STAGE_BITS, N_INTR_TYPE};

use super::allocator::VectorLayout;
use super::index::CodeBuffer;

/// rows per codebook
pub const CODEBOOK_ROWS: usize = 64;

/// stored row length, longer sub-vectors wrap around
pub const CODEBOOK_STRIDE: usize = 256;

const SIGN_BIT: u16 = 0x40;
const STAGE1_SCALE: f32 = 0.5;

/// one codebook stage
pub struct Codebook {
    values: Vec<f32>,
}

impl Codebook {
    fn generate(seed: u64, scale: f32) -> Self {
        let mut rng = SplitMix64(seed);
        let mut values = vec![0.0f32; CODEBOOK_ROWS * CODEBOOK_STRIDE];
        // row 0 stays zero
        for v in values.iter_mut().skip(CODEBOOK_STRIDE) {
            // Irwin-Hall of four uniforms, rescaled to unit variance
            let sum: f64 = (0..4).map(|_| rng.next_unit()).sum();
            *v = ((sum - 2.0) * 3.0f64.sqrt()) as f32 * scale;
        }
        Codebook { values }
    }

    #[inline]
    pub fn value(&self, row: usize, pos: usize) -> f32 {
        self.values[row * CODEBOOK_STRIDE + pos % CODEBOOK_STRIDE]
    }
}

struct SplitMix64(u64);

impl SplitMix64 {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    fn next_unit(&mut self) -> f64 {
        (self.next() >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// the codebook for an interleave type and stage (0 or 1)
pub fn codebook(interleave: InterleaveType, stage: usize) -> &'static Codebook {
    static BOOKS: OnceLock<Vec<Codebook>> = OnceLock::new();
    let books = BOOKS.get_or_init(|| {
        (0..N_INTR_TYPE * 2)
            .map(|i| {
                let scale = if i % 2 == 0 { 1.0 } else { STAGE1_SCALE };
                Codebook::generate(0x5457_494e_0000_0000 | i as u64, scale)
            })
            .collect()
    });
    &books[interleave.index() * 2 + stage.min(1)]
}

/// (row, sign) a code selects at a given stage width
#[inline]
pub fn decode_code(code: u16, bits: u8) -> (usize, f32) {
    if bits >= MAX_STAGE_BITS {
        let sign = if code & SIGN_BIT != 0 { -1.0 } else { 1.0 };
        ((code & (SIGN_BIT - 1)) as usize, sign)
    } else {
        (code as usize, 1.0)
    }
}

/// distinct codes of a stage width
#[inline]
fn code_count(bits: u8) -> u16 {
    1u16 << bits.min(MAX_STAGE_BITS)
}

/// stage output at one position of a sub-vector
#[inline]
fn stage_value(book: &Codebook, code: u16, bits: u8, pos: usize) -> f32 {
    let (row, sign) = decode_code(code, bits);
    sign * book.value(row, pos)
}

/// positions of sub-vector `i` out of `ndiv` in a vector of `len`
fn positions(i: usize, ndiv: usize, len: usize) -> impl Iterator<Item = usize> {
    (i..len).step_by(ndiv)
}

/// Quantize a channel-major vector, pushing two codes per sub-vector.
///
/// `n_can` first-stage candidates are kept for the second-stage search.
pub fn quantize(
    target: &[f32],
    layout: &VectorLayout,
    n_can: usize,
    out: &mut CodeBuffer,
) -> TvqResult<()> {
    let book0 = codebook(layout.interleave, 0);
    let book1 = codebook(layout.interleave, 1);
    let len = layout.vector_len;

    let mut sub = Vec::with_capacity(len);
    let mut residual = Vec::with_capacity(len);
    for (ch, channel) in layout.channels.iter().enumerate() {
        let x = &target[ch * len..(ch + 1) * len];
        let ndiv = channel.ndiv();
        for i in 0..ndiv {
            sub.clear();
            sub.extend(positions(i, ndiv, len).map(|p| x[p]));
            let (c0, c1) = search(&sub, &mut residual, book0, book1, channel.bits0[i], channel.bits1[i], n_can);
            out.push(c0)?;
            out.push(c1)?;
        }
    }
    Ok(())
}

fn search(
    x: &[f32],
    residual: &mut Vec<f32>,
    book0: &Codebook,
    book1: &Codebook,
    bits0: u8,
    bits1: u8,
    n_can: usize,
) -> (u16, u16) {
    let energy: f32 = x.iter().map(|v| v * v).sum();

    let mut candidates: Vec<(f32, u16)> = (0..code_count(bits0))
        .map(|code| (stage_error(x, energy, book0, code, bits0), code))
        .collect();
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    candidates.truncate(n_can.max(1));

    let mut best = (f32::INFINITY, 0u16, 0u16);
    for &(_, c0) in &candidates {
        residual.clear();
        residual.extend(
            x.iter()
                .enumerate()
                .map(|(s, &v)| v - stage_value(book0, c0, bits0, s)),
        );
        let r_energy: f32 = residual.iter().map(|v| v * v).sum();
        for c1 in 0..code_count(bits1) {
            let err = stage_error(residual, r_energy, book1, c1, bits1);
            if err < best.0 {
                best = (err, c0, c1);
            }
        }
    }
    (best.1, best.2)
}

/// |x - v|^2 using |x|^2 - 2 x.v + |v|^2
#[inline]
fn stage_error(x: &[f32], energy: f32, book: &Codebook, code: u16, bits: u8) -> f32 {
    let (row, sign) = decode_code(code, bits);
    let mut dot = 0.0f32;
    let mut norm = 0.0f32;
    for (s, &v) in x.iter().enumerate() {
        let c = book.value(row, s);
        dot += v * c;
        norm += c * c;
    }
    energy - 2.0 * sign * dot + norm
}

/// Rebuild a channel-major vector from its codes.
pub fn dequantize(codes: &[u16], layout: &VectorLayout, out: &mut [f32]) {
    let book0 = codebook(layout.interleave, 0);
    let book1 = codebook(layout.interleave, 1);
    let len = layout.vector_len;

    let mut slot = 0;
    for (ch, channel) in layout.channels.iter().enumerate() {
        let y = &mut out[ch * len..(ch + 1) * len];
        let ndiv = channel.ndiv();
        for i in 0..ndiv {
            let c0 = codes.get(slot).copied().unwrap_or(0);
            let c1 = codes.get(slot + 1).copied().unwrap_or(0);
            slot += 2;
            for (s, p) in positions(i, ndiv, len).enumerate() {
                y[p] = stage_value(book0, c0, channel.bits0[i], s)
                    + stage_value(book1, c1, channel.bits1[i], s);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_zero_is_silent() {
        let book = codebook(InterleaveType::Long, 0);
        assert!((0..CODEBOOK_STRIDE).all(|p| book.value(0, p) == 0.0));
    }

    #[test]
    fn seven_bit_codes_carry_a_sign() {
        assert_eq!(decode_code(0x45, 7), (5, -1.0));
        assert_eq!(decode_code(0x05, 7), (5, 1.0));
        assert_eq!(decode_code(0x25, 6), (0x25, 1.0));
    }

    #[test]
    fn search_never_does_worse_than_silence() {
        let book0 = codebook(InterleaveType::Short, 0);
        let book1 = codebook(InterleaveType::Short, 1);
        let x: Vec<f32> = (0..9).map(|i| ((i * 7) % 5) as f32 - 2.0).collect();
        let energy: f32 = x.iter().map(|v| v * v).sum();
        let mut residual = Vec::new();
        let (c0, c1) = search(&x, &mut residual, book0, book1, 7, 7, 8);
        let err: f32 = x
            .iter()
            .enumerate()
            .map(|(s, &v)| {
                let y = stage_value(book0, c0, 7, s) + stage_value(book1, c1, 7, s);
                (v - y) * (v - y)
            })
            .sum();
        assert!(err <= energy + 1e-4);
    }
}
