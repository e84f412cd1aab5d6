//! common types for the twinvq codec

use serde::{Deserialize, Serialize};

use super::error::{TvqError, TvqResult};

// constants

/// Keyword "TWIN" opening every bitstream
pub const KEYWORD: [u8; 4] = *b"TWIN";

/// width of the keyword field
pub const KEYWORD_BYTES: usize = 4;

/// width of the version string field
pub const VERSION_BYTES: usize = 8;

/// channel limit
pub const N_CH_MAX: usize = 2;

/// block types (short, medium, long)
pub const N_BTYPE: usize = 3;

/// interleave types (short, medium, long, ppc)
pub const N_INTR_TYPE: usize = 4;

/// last valid index of the step-size table
pub const ISSTMAX: usize = 88;

/// VQ code slots in one Index code buffer
pub const INDEX_CAPACITY: usize = 1024;

/// bits one sub-vector can hold (two 7-bit codebook stages)
pub const MAX_SUBVECTOR_BITS: usize = 14;

/// bits of one codebook stage
pub const MAX_STAGE_BITS: u8 = 7;

pub const WINDOW_TYPE_BITS: u8 = 4;
pub const GAIN_BITS: u8 = 8;
pub const SUB_GAIN_BITS: u8 = 5;

// types

/// block type, decides how a frame is split into transform blocks
///
/// | Value | Type   | Sub-blocks per frame |
/// |-------|--------|----------------------|
/// | 0     | Short  | mode dependent (4-16)|
/// | 1     | Medium | 2 or 4               |
/// | 2     | Long   | 1                    |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlockType {
    Short = 0,
    Medium = 1,
    Long = 2,
}

impl BlockType {
    pub const ALL: [BlockType; N_BTYPE] = [BlockType::Short, BlockType::Medium, BlockType::Long];

    /// position in per-block-type tables
    pub fn index(self) -> usize {
        self as usize
    }

    /// the interleave type that carries this block's main spectrum
    pub fn interleave(self) -> InterleaveType {
        match self {
            BlockType::Short => InterleaveType::Short,
            BlockType::Medium => InterleaveType::Medium,
            BlockType::Long => InterleaveType::Long,
        }
    }
}

/// interleave type, one per vector the allocator lays out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum InterleaveType {
    Short = 0,
    Medium = 1,
    Long = 2,
    /// periodic peak shape, long blocks only
    Ppc = 3,
}

impl InterleaveType {
    pub const ALL: [InterleaveType; N_INTR_TYPE] = [
        InterleaveType::Short,
        InterleaveType::Medium,
        InterleaveType::Long,
        InterleaveType::Ppc,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// block type whose frames use this vector
    pub fn block_type(self) -> BlockType {
        match self {
            InterleaveType::Short => BlockType::Short,
            InterleaveType::Medium => BlockType::Medium,
            InterleaveType::Long | InterleaveType::Ppc => BlockType::Long,
        }
    }
}

/// window type, the 4-bit field that opens every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum WindowType {
    OnlyLong = 0,
    LongStart = 1,
    OnlyShort = 2,
    ShortLong = 3,
    ShortMedium = 4,
    MediumLong = 5,
    LongLong = 6,
    MediumShort = 7,
    OnlyMedium = 8,
}

/// wtype -> btype
const WTYPE_TO_BTYPE: [BlockType; 9] = [
    BlockType::Long,
    BlockType::Long,
    BlockType::Short,
    BlockType::Long,
    BlockType::Medium,
    BlockType::Long,
    BlockType::Long,
    BlockType::Medium,
    BlockType::Medium,
];

impl WindowType {
    /// window for the current block given the previous one
    pub fn select(previous: BlockType, current: BlockType) -> Self {
        match (previous, current) {
            (_, BlockType::Short) => WindowType::OnlyShort,
            (BlockType::Short, BlockType::Medium) => WindowType::ShortMedium,
            (_, BlockType::Medium) => WindowType::OnlyMedium,
            (BlockType::Short, BlockType::Long) => WindowType::ShortLong,
            (BlockType::Medium, BlockType::Long) => WindowType::MediumLong,
            (BlockType::Long, BlockType::Long) => WindowType::OnlyLong,
        }
    }

    pub fn block_type(self) -> BlockType {
        WTYPE_TO_BTYPE[self as usize]
    }
}

impl TryFrom<u8> for WindowType {
    type Error = TvqError;

    fn try_from(v: u8) -> TvqResult<Self> {
        Ok(match v {
            0 => WindowType::OnlyLong,
            1 => WindowType::LongStart,
            2 => WindowType::OnlyShort,
            3 => WindowType::ShortLong,
            4 => WindowType::ShortMedium,
            5 => WindowType::MediumLong,
            6 => WindowType::LongLong,
            7 => WindowType::MediumShort,
            8 => WindowType::OnlyMedium,
            other => return Err(TvqError::InvalidWindowType(other)),
        })
    }
}

/// raw window type code -> block type
pub fn wtype_to_btype(window_type: u8) -> TvqResult<BlockType> {
    WindowType::try_from(window_type).map(WindowType::block_type)
}
