//! Periodic peak component for long blocks.
//!
//! Tonal frames put their energy on a comb of harmonics. The encoder finds
//! the comb period that captures the most of the normalized spectrum,
//! codes a gain and a VQ'd shape for the values under the comb, and leaves
//! the rest to the main VQ.

use crate::mode::ModeTable;

use super::envelope::{mulaw_decode, mulaw_encode};

pub const PGAIN_MAX: f32 = 24.0;
pub const PGAIN_MU: f32 = 200.0;

/// a comb must hold this many times its fair share of energy to be coded
const MIN_CAPTURE_RATIO: f32 = 2.0;

/// period in 1/400 coefficient units for a period code
pub fn period_from_code(mode: &ModeTable, code: u16) -> u32 {
    let (min, max) = mode.ppc_period_range();
    let steps = (1u32 << mode.ppc.period_bit) - 1;
    min + (code as u32 * (max - min) + steps / 2) / steps
}

/// Coefficient positions the shape values land on, in order. Positions
/// past the end of the spectrum are `None` and their shape values unused.
pub fn peak_positions(period: u32, width: usize, len: usize, n: usize) -> Vec<Option<usize>> {
    let mut positions = Vec::with_capacity(len);
    let place = |p: isize| (p >= 0 && (p as usize) < n).then_some(p as usize);

    // first peak centered on zero
    for i in 0..(width / 2).min(len) {
        positions.push(place(i as isize));
    }

    let mut peak = 1u32;
    let half = (width / 2) as isize;
    let upper = width.div_ceil(2) as isize;
    while positions.len() < len {
        let center = ((period * peak + 200) / 400) as isize;
        for j in -half..upper {
            if positions.len() == len {
                break;
            }
            positions.push(place(center + j));
        }
        peak += 1;
    }
    positions
}

/// comb positions for a period code
pub fn positions_for_code(mode: &ModeTable, code: u16) -> Vec<Option<usize>> {
    let period = period_from_code(mode, code);
    peak_positions(period, mode.ppc_width(period), mode.ppc.shape_len, mode.frame_size)
}

/// What the encoder picked for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct PpcChoice {
    pub period_code: u16,
    pub gain_code: u16,
    /// shape to quantize, already divided by the decoded gain
    pub shape: Vec<f32>,
}

/// search every period for the comb holding the most energy of `x`
pub fn analyze(x: &[f32], mode: &ModeTable) -> PpcChoice {
    let len = mode.ppc.shape_len;
    let codes = 1u16 << mode.ppc.period_bit;
    let total: f32 = x.iter().map(|v| v * v).sum();

    let mut best = (0u16, -1.0f32, 0usize);
    for code in 0..codes {
        let positions = positions_for_code(mode, code);
        let (captured, used) = positions
            .iter()
            .flatten()
            .fold((0.0f32, 0usize), |(e, u), &p| (e + x[p] * x[p], u + 1));
        if captured > best.1 {
            best = (code, captured, used);
        }
    }

    let (period_code, captured, used) = best;
    let fair_share = total * used as f32 / x.len().max(1) as f32;
    let silent = PpcChoice {
        period_code,
        gain_code: 0,
        shape: vec![0.0; len],
    };
    if used == 0 || captured <= MIN_CAPTURE_RATIO * fair_share {
        return silent;
    }

    let gain_code = mulaw_encode(
        (captured / used as f32).sqrt(),
        PGAIN_MAX,
        PGAIN_MU,
        mode.ppc.pgain_bit,
    );
    let gain = mulaw_decode(gain_code, PGAIN_MAX, PGAIN_MU, mode.ppc.pgain_bit);
    if gain <= 0.0 {
        return silent;
    }

    let shape = positions_for_code(mode, period_code)
        .iter()
        .map(|p| p.map_or(0.0, |p| x[p] / gain))
        .collect();

    PpcChoice {
        period_code,
        gain_code,
        shape,
    }
}

/// add the decoded comb into `x`
pub fn synthesize(x: &mut [f32], shape: &[f32], period_code: u16, gain_code: u16, mode: &ModeTable) {
    let gain = mulaw_decode(gain_code, PGAIN_MAX, PGAIN_MU, mode.ppc.pgain_bit);
    if gain == 0.0 {
        return;
    }
    for (pos, &s) in positions_for_code(mode, period_code).iter().zip(shape) {
        if let Some(p) = *pos {
            x[p] += gain * s;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_fill_the_shape() {
        let mode = ModeTable::lookup(44, 48).unwrap();
        for code in [0u16, 100, 511] {
            assert_eq!(positions_for_code(mode, code).len(), mode.ppc.shape_len);
        }
    }

    #[test]
    fn period_codes_span_the_range() {
        let mode = ModeTable::lookup(22, 20).unwrap();
        let (min, max) = mode.ppc_period_range();
        assert_eq!(period_from_code(mode, 0), min);
        assert_eq!(period_from_code(mode, (1 << mode.ppc.period_bit) - 1), max);
    }

    #[test]
    fn noise_floor_gets_no_comb() {
        let mode = ModeTable::lookup(22, 20).unwrap();
        let x = vec![1.0f32; mode.frame_size];
        assert_eq!(analyze(&x, mode).gain_code, 0);
    }
}
