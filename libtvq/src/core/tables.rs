//! process-wide lookup tables, built once and never mutated

use std::sync::OnceLock;

use super::types::ISSTMAX;

/// IMA step-size table, the ladder every envelope level is measured on
pub const STEP_SIZES: [u16; ISSTMAX + 1] = [
    7, 8, 9, 10, 11, 12, 13, 14, 16, 17, 19, 21, 23, 25, 28, 31, 34, 37, 41, 45, 50, 55, 60, 66,
    73, 80, 88, 97, 107, 118, 130, 143, 157, 173, 190, 209, 230, 253, 279, 307, 337, 371, 408,
    449, 494, 544, 598, 658, 724, 796, 876, 963, 1060, 1166, 1282, 1411, 1552, 1707, 1878, 2066,
    2272, 2499, 2749, 3024, 3327, 3660, 4026, 4428, 4871, 5358, 5894, 6484, 7132, 7845, 8630,
    9493, 10442, 11487, 12635, 13899, 15289, 16818, 18500, 20350, 22385, 24623, 27086, 29794,
    32767,
];

/// level 0 sits at this table index
pub const REFERENCE_STEP: usize = 44;

/// lowest and highest level the table can express
pub const MIN_LEVEL: i32 = -(REFERENCE_STEP as i32);
pub const MAX_LEVEL: i32 = (ISSTMAX - REFERENCE_STEP) as i32;

struct LevelTable {
    gains: [f32; ISSTMAX + 1],
    logs: [f32; ISSTMAX + 1],
}

fn level_table() -> &'static LevelTable {
    static TABLE: OnceLock<LevelTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        let reference = STEP_SIZES[REFERENCE_STEP] as f32;
        let mut gains = [0.0f32; ISSTMAX + 1];
        let mut logs = [0.0f32; ISSTMAX + 1];
        for (i, &step) in STEP_SIZES.iter().enumerate() {
            gains[i] = step as f32 / reference;
            logs[i] = gains[i].ln();
        }
        LevelTable { gains, logs }
    })
}

/// linear gain of an envelope level, clamped to the table
#[inline]
pub fn level_gain(level: i32) -> f32 {
    let idx = (REFERENCE_STEP as i32 + level).clamp(0, ISSTMAX as i32) as usize;
    level_table().gains[idx]
}

/// continuous level of `ratio`, interpolated between table entries
pub fn fractional_level(ratio: f32) -> f32 {
    if ratio.is_nan() || ratio <= 0.0 {
        return MIN_LEVEL as f32;
    }
    let target = ratio.ln();
    let logs = &level_table().logs;
    let upper = logs.partition_point(|&l| l < target);
    if upper == 0 {
        return MIN_LEVEL as f32;
    }
    if upper > ISSTMAX {
        return MAX_LEVEL as f32;
    }
    let lo = logs[upper - 1];
    let hi = logs[upper];
    let frac = if hi > lo { (target - lo) / (hi - lo) } else { 0.0 };
    (upper - 1) as f32 + frac - REFERENCE_STEP as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_level_is_unity() {
        assert_eq!(level_gain(0), 1.0);
        assert!(fractional_level(1.0).abs() < 1e-6);
    }

    #[test]
    fn levels_clamp_to_table() {
        assert_eq!(level_gain(1000), level_gain(MAX_LEVEL));
        assert_eq!(fractional_level(1e9), MAX_LEVEL as f32);
        assert_eq!(fractional_level(0.0), MIN_LEVEL as f32);
    }
}
