//! coding modes: frame geometry and side-information widths per
//! (sampling-rate class, per-channel bit rate)

use serde::Serialize;

use crate::core::{BlockType, GAIN_BITS, SUB_GAIN_BITS, WINDOW_TYPE_BITS};

/// per block type geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockGeometry {
    /// transform blocks per frame
    pub sub_blocks: usize,
    /// bark envelope regions per sub-block
    pub bark_n_coef: usize,
    /// bits per bark envelope code
    pub bark_n_bit: u8,
    /// nominal bark envelope resolution, reported in ConfInfo
    pub bark_env_size: usize,
}

/// frame envelope field widths (carried in the stream's "lsp" fields)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LspGeometry {
    pub n_lsp: usize,
    /// history flag
    pub bit0: u8,
    /// coarse tilt
    pub bit1: u8,
    /// per-split fine offsets
    pub bit2: u8,
    pub split: usize,
}

/// periodic peak component widths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PpcGeometry {
    pub period_bit: u8,
    pub shape_bit: usize,
    pub shape_len: usize,
    pub pgain_bit: u8,
    pub peak_per2wid: usize,
}

/// one coding mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModeTable {
    /// sampling rate class in kHz (8, 11, 16, 22, 44)
    pub rate_class: u32,
    /// bit rate per channel in kbps
    pub kbps: u32,
    /// samples per channel per frame (N)
    pub frame_size: usize,
    /// indexed by BlockType
    pub blocks: [BlockGeometry; 3],
    pub lsp: LspGeometry,
    pub ppc: PpcGeometry,
}

const fn blocks(sub: [usize; 3], coef: [usize; 3], bits: [u8; 3], env: [usize; 3]) -> [BlockGeometry; 3] {
    [
        BlockGeometry { sub_blocks: sub[0], bark_n_coef: coef[0], bark_n_bit: bits[0], bark_env_size: env[0] },
        BlockGeometry { sub_blocks: sub[1], bark_n_coef: coef[1], bark_n_bit: bits[1], bark_env_size: env[1] },
        BlockGeometry { sub_blocks: sub[2], bark_n_coef: coef[2], bark_n_bit: bits[2], bark_env_size: env[2] },
    ]
}

const fn lsp(n_lsp: usize, bit0: u8, bit1: u8, bit2: u8, split: usize) -> LspGeometry {
    LspGeometry { n_lsp, bit0, bit1, bit2, split }
}

const fn ppc(period_bit: u8, shape_bit: usize, shape_len: usize, pgain_bit: u8, peak_per2wid: usize) -> PpcGeometry {
    PpcGeometry { period_bit, shape_bit, shape_len, pgain_bit, peak_per2wid }
}

const fn mode(rate_class: u32, kbps: u32, frame_size: usize, blocks: [BlockGeometry; 3], lsp: LspGeometry, ppc: PpcGeometry) -> ModeTable {
    ModeTable { rate_class, kbps, frame_size, blocks, lsp, ppc }
}

const NARROW: [BlockGeometry; 3] = blocks([8, 2, 1], [1, 2, 3], [5, 5, 6], [10, 20, 30]);
const WIDE: [BlockGeometry; 3] = blocks([8, 2, 1], [1, 2, 4], [6, 6, 6], [10, 20, 32]);

/// every supported mode
pub static MODES: [ModeTable; 9] = [
    mode(8, 8, 512, NARROW, lsp(12, 1, 5, 3, 3), ppc(8, 28, 20, 6, 40)),
    mode(11, 8, 512, NARROW, lsp(16, 1, 6, 4, 3), ppc(9, 36, 30, 7, 90)),
    mode(11, 10, 512, NARROW, lsp(16, 1, 6, 4, 3), ppc(9, 36, 30, 7, 90)),
    mode(16, 16, 1024, NARROW, lsp(16, 1, 6, 4, 3), ppc(9, 56, 60, 7, 180)),
    mode(22, 20, 1024, WIDE, lsp(16, 1, 6, 4, 3), ppc(9, 56, 36, 7, 144)),
    mode(22, 24, 1024, WIDE, lsp(16, 1, 6, 4, 3), ppc(9, 56, 36, 7, 144)),
    mode(22, 32, 512, blocks([4, 2, 1], [1, 2, 4], [6, 6, 6], [10, 20, 32]), lsp(16, 1, 6, 4, 4), ppc(9, 56, 36, 7, 72)),
    mode(44, 40, 2048, blocks([16, 4, 1], [1, 2, 4], [6, 6, 6], [10, 20, 40]), lsp(20, 1, 6, 4, 4), ppc(9, 84, 54, 7, 432)),
    mode(44, 48, 2048, blocks([16, 4, 1], [1, 2, 4], [6, 6, 6], [10, 20, 40]), lsp(20, 1, 6, 4, 4), ppc(9, 84, 54, 7, 432)),
];

/// rate class (kHz) -> sampling rate in Hz
pub fn rate_class_to_hz(rate_class: u32) -> Option<u32> {
    match rate_class {
        44 => Some(44100),
        22 => Some(22050),
        11 => Some(11025),
        8..=48 => Some(rate_class * 1000),
        _ => None,
    }
}

/// sampling rate in Hz -> rate class, for the rates the format can signal
pub fn hz_to_rate_class(sample_rate: u32) -> Option<u32> {
    match sample_rate {
        44100 => Some(44),
        22050 => Some(22),
        11025 => Some(11),
        hz if hz % 1000 == 0 && (8..=48).contains(&(hz / 1000)) => Some(hz / 1000),
        _ => None,
    }
}

impl ModeTable {
    /// find the mode for a rate class and per-channel kbps
    pub fn lookup(rate_class: u32, kbps: u32) -> Option<&'static ModeTable> {
        MODES
            .iter()
            .find(|m| m.rate_class == rate_class && m.kbps == kbps)
    }

    /// "22/20" style label
    pub fn name(&self) -> String {
        format!("{:02}/{:02}", self.rate_class, self.kbps)
    }

    pub fn sample_rate(&self) -> u32 {
        rate_class_to_hz(self.rate_class).unwrap_or(self.rate_class * 1000)
    }

    pub fn block(&self, block_type: BlockType) -> &BlockGeometry {
        &self.blocks[block_type.index()]
    }

    /// transform size of one sub-block
    pub fn block_size(&self, block_type: BlockType) -> usize {
        self.frame_size / self.block(block_type).sub_blocks
    }

    /// window slope length, equal to the short block size
    pub fn overlap(&self) -> usize {
        self.block_size(BlockType::Short)
    }

    /// bits in one frame at `bit_rate` bits/s over all channels
    pub fn frame_bits(&self, bit_rate: u32) -> usize {
        (bit_rate as u64 * self.frame_size as u64 / self.sample_rate() as u64) as usize
    }

    /// bits of the frame envelope fields, all channels
    pub fn lsp_bits(&self, channels: usize) -> usize {
        channels * (self.lsp.bit0 as usize + self.lsp.bit1 as usize + self.lsp.split * self.lsp.bit2 as usize)
    }

    /// bits of the ppc period and gain fields plus its VQ, all channels
    pub fn ppc_bits(&self, channels: usize) -> usize {
        channels * (self.ppc.pgain_bit as usize + self.ppc.shape_bit + self.ppc.period_bit as usize)
    }

    /// ppc shape VQ bits, all channels
    pub fn ppc_vq_bits(&self, channels: usize) -> usize {
        channels * self.ppc.shape_bit
    }

    /// bark envelope bits (codes plus history flag) of one sub-block, all channels
    pub fn bark_bits(&self, channels: usize, block_type: BlockType) -> usize {
        let b = self.block(block_type);
        channels * (b.bark_n_coef * b.bark_n_bit as usize + 1)
    }

    /// everything in a frame that isn't main VQ codes
    pub fn side_bits(&self, channels: usize, block_type: BlockType) -> usize {
        let fixed = self.lsp_bits(channels) + WINDOW_TYPE_BITS as usize + channels * GAIN_BITS as usize;
        match block_type {
            BlockType::Long => fixed + self.bark_bits(channels, block_type) + self.ppc_bits(channels),
            _ => {
                let per_sub = self.bark_bits(channels, block_type) + channels * SUB_GAIN_BITS as usize;
                fixed + self.block(block_type).sub_blocks * per_sub
            }
        }
    }

    /// ppc period range in 1/400 coefficient units
    pub fn ppc_period_range(&self) -> (u32, u32) {
        let isampf = self.rate_class;
        let min = round_div(40 * 2 * self.frame_size as u32, isampf);
        let max = round_div(6 * 40 * 2 * self.frame_size as u32, isampf);
        (min, max)
    }

    /// width in coefficients of one periodic peak
    pub fn ppc_width(&self, period: u32) -> usize {
        let per2wid = self.ppc.peak_per2wid as u32;
        let n = self.frame_size as u32;
        let width = if self.rate_class == 22 && self.kbps == 32 {
            round_div((period + 800) * per2wid, 400 * n)
        } else {
            period * per2wid / (400 * n)
        };
        width.max(1) as usize
    }
}

fn round_div(a: u32, b: u32) -> u32 {
    (a + b / 2) / b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_bits_for_44_48_mono() {
        let m = ModeTable::lookup(44, 48).unwrap();
        assert_eq!(m.frame_bits(48_000), 2229);
        assert_eq!(m.side_bits(1, BlockType::Long), 160);
        assert_eq!(m.side_bits(1, BlockType::Short), 227);
    }

    #[test]
    fn rate_classes_round_trip() {
        for m in MODES.iter() {
            assert_eq!(hz_to_rate_class(m.sample_rate()), Some(m.rate_class));
        }
    }
}
