//! Gain and envelope quantizers.
//!
//! A channel's spectrum is divided by four things before VQ: the frame
//! gain, per sub-block gains (short and medium blocks), a frame envelope
//! (tilt plus split offsets) and a bark envelope per sub-block. Envelope
//! levels are positions on the step-size ladder in `core::tables`.

use crate::core::{fractional_level, level_gain, BlockType, MAX_LEVEL, MIN_LEVEL};
use crate::mode::{BlockGeometry, LspGeometry};

/// frame gain ceiling (full-scale rms)
pub const GAIN_MAX: f32 = 32768.0;
pub const GAIN_MU: f32 = 100.0;

/// sub-block gain ceiling, relative to the frame gain
pub const SUB_GAIN_MAX: f32 = 4.0;
pub const SUB_GAIN_MU: f32 = 100.0;

/// frame envelope offsets move in steps of this many levels
pub const FINE_UNIT: i32 = 2;

/// how much of the previous bark levels a history-coded sub-block keeps
const BARK_HIST_WEIGHT: [f32; 3] = [0.4, 0.35, 0.28];

/// µ-law code of `value` in `bits` bits over [0, max]; 0 means silence
pub fn mulaw_encode(value: f32, max: f32, mu: f32, bits: u8) -> u16 {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    let steps = ((1u32 << bits) - 1) as f32;
    let y = (1.0 + mu * value.min(max) / max).ln() / (1.0 + mu).ln();
    (y * steps).round() as u16
}

pub fn mulaw_decode(code: u16, max: f32, mu: f32, bits: u8) -> f32 {
    if code == 0 {
        return 0.0;
    }
    let steps = ((1u32 << bits) - 1) as f32;
    let y = code as f32 / steps;
    max * ((1.0 + mu).powf(y) - 1.0) / mu
}

/// signed level of an unsigned code of `bits` bits
#[inline]
fn centered(code: u16, bits: u8) -> i32 {
    code as i32 - (1i32 << (bits.max(1) - 1))
}

/// unsigned code of a signed level, clamped to `bits`
#[inline]
fn uncentered(level: i32, bits: u8) -> u16 {
    let half = 1i32 << (bits.max(1) - 1);
    (level.clamp(-half, half - 1) + half) as u16
}

fn level_range(bits: u8) -> (i32, i32) {
    let half = 1i32 << (bits.max(1) - 1);
    (-half, half - 1)
}

/// Frame envelope: a tilt across the band plus one offset per split region.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameEnvelope {
    pub tilt: i32,
    pub offsets: Vec<i32>,
}

/// coded frame envelope fields
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvelopeCodes {
    pub hist: bool,
    pub coarse: u16,
    pub fine: Vec<u16>,
}

impl FrameEnvelope {
    pub fn flat(split: usize) -> Self {
        FrameEnvelope {
            tilt: 0,
            offsets: vec![0; split],
        }
    }

    /// level at relative frequency `f` in [0, 1)
    pub fn level_at(&self, f: f32) -> i32 {
        let split = self.offsets.len().max(1);
        let region = ((f * split as f32) as usize).min(split - 1);
        let offset = self.offsets.get(region).copied().unwrap_or(0);
        (self.tilt as f32 * (f - 0.5)).round() as i32 + offset
    }

    /// per-coefficient gains for a sub-block of `m` coefficients
    pub fn gains(&self, m: usize) -> Vec<f32> {
        (0..m)
            .map(|k| level_gain(self.level_at((k as f32 + 0.5) / m as f32)))
            .collect()
    }

    /// rebuild from codes, `previous` is the last decoded envelope
    pub fn decode(codes: &EnvelopeCodes, lsp: &LspGeometry, previous: &FrameEnvelope) -> Self {
        let tilt = centered(codes.coarse, lsp.bit1);
        let offsets = codes.fine.iter().map(|&c| centered(c, lsp.bit2) * FINE_UNIT);
        if codes.hist {
            FrameEnvelope {
                tilt: (previous.tilt + tilt).clamp(2 * MIN_LEVEL, 2 * MAX_LEVEL),
                offsets: offsets
                    .enumerate()
                    .map(|(j, o)| {
                        let prev = previous.offsets.get(j).copied().unwrap_or(0);
                        (prev + o).clamp(MIN_LEVEL, MAX_LEVEL)
                    })
                    .collect(),
            }
        } else {
            FrameEnvelope {
                tilt,
                offsets: offsets.collect(),
            }
        }
    }

    /// Fit target region levels, trying absolute and history coding and
    /// keeping whichever lands closer (absolute on ties).
    pub fn encode(targets: &[f32], lsp: &LspGeometry, previous: &FrameEnvelope) -> (EnvelopeCodes, FrameEnvelope) {
        let split = targets.len();
        let centers: Vec<f32> = (0..split)
            .map(|j| (j as f32 + 0.5) / split as f32 - 0.5)
            .collect();

        // least-squares slope over region centers
        let mean = targets.iter().sum::<f32>() / split.max(1) as f32;
        let (num, den) = centers
            .iter()
            .zip(targets)
            .fold((0.0f32, 0.0f32), |(n, d), (&c, &t)| (n + c * (t - mean), d + c * c));
        let slope = if den > 0.0 { num / den } else { 0.0 };

        let fit = |base_tilt: i32, base_offsets: &[i32], hist: bool| {
            let (lo, hi) = level_range(lsp.bit1);
            let delta = ((slope - base_tilt as f32).round() as i32).clamp(lo, hi);
            let coarse = uncentered(delta, lsp.bit1);
            let tilt = base_tilt + delta;
            let fine: Vec<u16> = targets
                .iter()
                .zip(&centers)
                .enumerate()
                .map(|(j, (&t, &c))| {
                    let want = t - (tilt as f32 * c).round() - base_offsets.get(j).copied().unwrap_or(0) as f32;
                    uncentered((want / FINE_UNIT as f32).round() as i32, lsp.bit2)
                })
                .collect();
            EnvelopeCodes { hist, coarse, fine }
        };

        let absolute = fit(0, &[], false);
        let abs_env = FrameEnvelope::decode(&absolute, lsp, previous);
        let delta = fit(previous.tilt, &previous.offsets, true);
        let delta_env = FrameEnvelope::decode(&delta, lsp, previous);

        if lsp.bit0 > 0 && delta_env.error(targets) < abs_env.error(targets) {
            (delta, delta_env)
        } else {
            (absolute, abs_env)
        }
    }

    fn error(&self, targets: &[f32]) -> f32 {
        let split = targets.len();
        targets
            .iter()
            .enumerate()
            .map(|(j, &t)| {
                let d = self.level_at((j as f32 + 0.5) / split as f32) as f32 - t;
                d * d
            })
            .sum()
    }
}

/// Region edges of a bark envelope over `m` coefficients: quadratic
/// spacing, narrow regions at low frequency.
pub fn bark_edges(m: usize, regions: usize) -> Vec<usize> {
    let mut edges = Vec::with_capacity(regions + 1);
    edges.push(0);
    for k in 1..regions {
        let x = k as f64 / regions as f64;
        let edge = ((m as f64 * x * x).round() as usize).max(edges[k - 1] + 1);
        edges.push(edge.min(m));
    }
    edges.push(m);
    edges
}

/// Previous raw bark levels, one set per block type and channel.
#[derive(Debug, Clone)]
pub struct BarkHistory {
    levels: Vec<Vec<Vec<i32>>>,
}

impl BarkHistory {
    pub fn new(blocks: &[BlockGeometry; 3], channels: usize) -> Self {
        BarkHistory {
            levels: blocks
                .iter()
                .map(|b| vec![vec![0; b.bark_n_coef]; channels])
                .collect(),
        }
    }

    /// decoded levels of one sub-block; updates the history
    pub fn decode(
        &mut self,
        block_type: BlockType,
        channel: usize,
        codes: &[u16],
        use_hist: bool,
        bits: u8,
    ) -> Vec<i32> {
        let weight = BARK_HIST_WEIGHT[block_type.index()];
        let hist = &mut self.levels[block_type.index()][channel];
        codes
            .iter()
            .zip(hist.iter_mut())
            .map(|(&code, h)| {
                let q = centered(code, bits);
                let level = if use_hist { blend(q, *h, weight) } else { q };
                *h = q;
                level
            })
            .collect()
    }

    /// choose codes for `targets`, returns (codes, use_hist, levels) and
    /// updates the history exactly as `decode` would
    pub fn encode(
        &mut self,
        block_type: BlockType,
        channel: usize,
        targets: &[f32],
        bits: u8,
    ) -> (Vec<u16>, bool, Vec<i32>) {
        let weight = BARK_HIST_WEIGHT[block_type.index()];
        let (lo, hi) = level_range(bits);
        let hist = &self.levels[block_type.index()][channel];

        let direct: Vec<i32> = targets
            .iter()
            .map(|&t| (t.round() as i32).clamp(lo, hi))
            .collect();
        let blended: Vec<i32> = targets
            .iter()
            .zip(hist)
            .map(|(&t, &h)| {
                (((t - weight * h as f32) / (1.0 - weight)).round() as i32).clamp(lo, hi)
            })
            .collect();

        let direct_err: f32 = direct
            .iter()
            .zip(targets)
            .map(|(&q, &t)| (q as f32 - t).powi(2))
            .sum();
        let blended_err: f32 = blended
            .iter()
            .zip(hist)
            .zip(targets)
            .map(|((&q, &h), &t)| (blend(q, h, weight) as f32 - t).powi(2))
            .sum();

        let use_hist = blended_err < direct_err;
        let raw = if use_hist { blended } else { direct };
        let codes: Vec<u16> = raw.iter().map(|&q| uncentered(q, bits)).collect();
        let levels = self.decode(block_type, channel, &codes, use_hist, bits);
        (codes, use_hist, levels)
    }
}

#[inline]
fn blend(q: i32, hist: i32, weight: f32) -> i32 {
    ((1.0 - weight) * q as f32 + weight * hist as f32).round() as i32
}

/// target level of a region with rms `rms` (0 for empty regions)
pub fn region_target(rms: f32) -> f32 {
    if rms > 0.0 {
        fractional_level(rms)
    } else {
        0.0
    }
}

/// per-coefficient gains of decoded bark levels over `m` coefficients
pub fn bark_gains(levels: &[i32], edges: &[usize]) -> Vec<f32> {
    let m = edges.last().copied().unwrap_or(0);
    let mut gains = vec![1.0f32; m];
    for (r, &level) in levels.iter().enumerate() {
        let g = level_gain(level);
        for v in &mut gains[edges[r]..edges[r + 1]] {
            *v = g;
        }
    }
    gains
}
