//! MDCT filter bank with block switching. The transform itself runs as a
//! quarter-size complex FFT between two twiddle rotations.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

use crate::core::BlockType;
use crate::mode::ModeTable;

/// MDCT of one block size: 2M windowed samples <-> M coefficients
pub struct MdctTransform {
    /// M
    size: usize,
    window: Vec<f32>,
    /// M/4-point forward FFT
    fft: Arc<dyn Fft<f32>>,
    /// exp(i*pi*(k + 1/8)/M), k < M/2
    twiddle: Vec<Complex<f32>>,
}

impl MdctTransform {
    /// `block_size` coefficients, window slopes of `overlap` samples
    pub fn new(block_size: usize, overlap: usize) -> Self {
        let twiddle = (0..block_size / 2)
            .map(|k| Complex::from_polar(1.0, PI * (k as f32 + 0.125) / block_size as f32))
            .collect();

        Self {
            size: block_size,
            window: Self::low_overlap_window(2 * block_size, overlap),
            fft: FftPlanner::new().plan_fft_forward(block_size / 2),
            twiddle,
        }
    }

    /// Flat-topped window with sine slopes of `overlap` samples, zero at
    /// both ends. With overlap == n/2 it is the plain sine window.
    pub fn low_overlap_window(n: usize, overlap: usize) -> Vec<f32> {
        let a = (n / 2 - overlap) / 2;
        let fall = n - a - overlap;
        (0..n)
            .map(|i| {
                if i < a || i >= n - a {
                    0.0
                } else if i < a + overlap {
                    (PI / 2.0 * ((i - a) as f32 + 0.5) / overlap as f32).sin()
                } else if i < fall {
                    1.0
                } else {
                    (PI / 2.0 * ((i - fall) as f32 + 0.5) / overlap as f32).cos()
                }
            })
            .collect()
    }

    /// 2M samples, windowed here, to M coefficients
    pub fn forward(&self, samples: &[f32]) -> Vec<f32> {
        let m = self.size;
        let q = m / 2;
        let e = m / 4;
        let x = |i: usize| samples[i] * self.window[i];

        // fold the 2M samples into M/2 complex values
        let mut z = vec![Complex::new(0.0f32, 0.0); q];
        for i in 0..e {
            let lo = Complex::new(-x(3 * q + 2 * i) - x(3 * q - 1 - 2 * i), x(q - 1 - 2 * i) - x(q + 2 * i));
            let hi = Complex::new(x(2 * i) - x(m - 1 - 2 * i), -x(m + 2 * i) - x(2 * m - 1 - 2 * i));
            z[i] = -(lo * self.twiddle[i].conj());
            z[e + i] = -(hi * self.twiddle[e + i].conj());
        }

        self.fft.process(&mut z);

        let mut coeffs = vec![0.0; m];
        for i in 0..e {
            let lo = e - 1 - i;
            let hi = e + i;
            let a = z[lo] * self.twiddle[lo].conj();
            let b = z[hi] * self.twiddle[hi].conj();
            coeffs[2 * lo] = -a.re;
            coeffs[2 * lo + 1] = b.im;
            coeffs[2 * hi] = -b.re;
            coeffs[2 * hi + 1] = a.im;
        }
        coeffs
    }

    /// M coefficients to 2M windowed samples, ready for overlap-add
    pub fn inverse(&self, coeffs: &[f32]) -> Vec<f32> {
        let m = self.size;
        let q = m / 2;
        let e = m / 4;

        let mut z: Vec<Complex<f32>> = (0..q)
            .map(|i| {
                let c = Complex::new(coeffs[2 * i], -coeffs[m - 1 - 2 * i]);
                -(c * self.twiddle[i]).conj()
            })
            .collect();

        self.fft.process(&mut z);

        let mut out = vec![0.0; 2 * m];
        for i in 0..e {
            let a = z[i].conj() * self.twiddle[i];
            let b = z[e + i].conj() * self.twiddle[e + i];
            let (fwd, rev) = (2 * i, q - 1 - 2 * i);

            out[rev] = -a.im;
            out[q + fwd] = a.im;
            out[m + rev] = a.re;
            out[m + q + fwd] = a.re;

            out[fwd] = -b.re;
            out[q + rev] = b.re;
            out[m + fwd] = b.im;
            out[m + q + rev] = b.im;
        }

        let scale = 2.0 / m as f32;
        for (o, w) in out.iter_mut().zip(&self.window) {
            *o *= scale * w;
        }
        out
    }
}

/// Block-switching MDCT filter bank with per-channel state
///
/// Every block type shares the same slope length (the short block size),
/// so any sequence of block types reconstructs perfectly. Output lags
/// input by `overlap()` samples.
#[derive(Clone)]
pub struct Mdct {
    frame_size: usize,
    overlap: usize,
    sub_blocks: [usize; 3],
    /// indexed by BlockType
    transforms: Arc<Vec<MdctTransform>>,
    /// previous and current input frame per channel (2N samples)
    history: Vec<Vec<f32>>,
    /// pending overlap-add output per channel (N + overlap samples)
    overlap_buffer: Vec<Vec<f32>>,
    channels: usize,
}

impl Mdct {
    /// `sub_blocks` per block type (short, medium, long)
    pub fn new(channels: usize, frame_size: usize, sub_blocks: [usize; 3]) -> Self {
        let overlap = frame_size / sub_blocks[BlockType::Short.index()];
        let transforms = sub_blocks
            .iter()
            .map(|&sub| MdctTransform::new(frame_size / sub, overlap))
            .collect();

        Self {
            frame_size,
            overlap,
            sub_blocks,
            transforms: Arc::new(transforms),
            history: vec![vec![0.0; 2 * frame_size]; channels],
            overlap_buffer: vec![vec![0.0; frame_size + overlap]; channels],
            channels,
        }
    }

    pub fn for_mode(mode: &ModeTable, channels: usize) -> Self {
        let sub_blocks = [
            mode.block(BlockType::Short).sub_blocks,
            mode.block(BlockType::Medium).sub_blocks,
            mode.block(BlockType::Long).sub_blocks,
        ];
        Self::new(channels, mode.frame_size, sub_blocks)
    }

    /// transform delay in samples
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn block_size(&self, block_type: BlockType) -> usize {
        self.frame_size / self.sub_blocks[block_type.index()]
    }

    /// Forward MDCT of one block: 2M windowed samples → M coefficients
    pub fn forward(&self, samples: &[f32], block_type: BlockType) -> Vec<f32> {
        self.transforms[block_type.index()].forward(samples)
    }

    /// Inverse MDCT of one block: M coefficients → 2M windowed samples
    pub fn inverse(&self, coeffs: &[f32], block_type: BlockType) -> Vec<f32> {
        self.transforms[block_type.index()].inverse(coeffs)
    }

    /// Push one interleaved frame and return N coefficients per channel,
    /// sub-blocks concatenated in time order.
    pub fn analyze(&mut self, samples: &[f32], block_type: BlockType) -> Vec<Vec<f32>> {
        let n = self.frame_size;
        let m = self.block_size(block_type);
        let half_ov = self.overlap / 2;

        let mut all_coeffs = Vec::with_capacity(self.channels);
        for ch in 0..self.channels {
            let history = &mut self.history[ch];
            history.copy_within(n.., 0);
            for (i, slot) in history[n..].iter_mut().enumerate() {
                *slot = samples.get(i * self.channels + ch).copied().unwrap_or(0.0);
            }

            let mut coeffs = Vec::with_capacity(n);
            let mut block = vec![0.0f32; 2 * m];
            for k in 0..self.sub_blocks[block_type.index()] {
                // block k covers history[n - ov/2 + k*m - m/2 ..][..2m]
                let start = (n + k * m) as isize - (half_ov + m / 2) as isize;
                for (i, b) in block.iter_mut().enumerate() {
                    let j = start + i as isize;
                    *b = if (0..2 * n as isize).contains(&j) {
                        history[j as usize]
                    } else {
                        0.0
                    };
                }
                coeffs.extend(self.transforms[block_type.index()].forward(&block));
            }
            all_coeffs.push(coeffs);
        }

        all_coeffs
    }

    /// Inverse of `analyze`: overlap-adds one frame of coefficients per
    /// channel and returns N interleaved samples.
    pub fn synthesize(&mut self, coeffs: &[Vec<f32>], block_type: BlockType) -> Vec<f32> {
        let n = self.frame_size;
        let m = self.block_size(block_type);
        let half_ov = self.overlap / 2;

        for (ch, ch_coeffs) in coeffs.iter().enumerate().take(self.channels) {
            let acc = &mut self.overlap_buffer[ch];
            for (k, block) in ch_coeffs.chunks_exact(m).enumerate() {
                let y = self.transforms[block_type.index()].inverse(block);
                let offset = (half_ov + k * m) as isize - (m / 2) as isize;
                for (i, &v) in y.iter().enumerate() {
                    let j = offset + i as isize;
                    if j >= 0 && (j as usize) < acc.len() {
                        acc[j as usize] += v;
                    }
                }
            }
        }

        // Interleave the finished N samples, then slide the accumulators
        let mut output = Vec::with_capacity(n * self.channels);
        for i in 0..n {
            for ch in 0..self.channels {
                output.push(self.overlap_buffer[ch][i]);
            }
        }
        for acc in &mut self.overlap_buffer {
            acc.copy_within(n.., 0);
            let len = acc.len();
            acc[len - n..].fill(0.0);
        }

        output
    }

    /// Reset history and overlap buffers (e.g., for seeking)
    pub fn reset(&mut self) {
        for buf in self.history.iter_mut().chain(self.overlap_buffer.iter_mut()) {
            buf.fill(0.0);
        }
    }
}
