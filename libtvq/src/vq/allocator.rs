//! Splits a bit budget over the sub-vectors of each channel.
//!
//! Both the encoder and the decoder call this with the same arguments, so the
//! split never travels in the bitstream. The policy is fixed:
//!
//! 1. the layout total is divided evenly over channels, the remainder going
//!    to the lowest channel index
//! 2. every sub-vector is given one bit up front
//! 3. what is left goes out by largest remainder of `rest * w / sum(w)`,
//!    ties to the lowest index
//! 4. no sub-vector holds more than 14 bits; overflow moves to the lowest
//!    index with room
//!
//! A budget smaller than the sub-vector count is an error
//! (`InsufficientBits`), nothing is silently zeroed.

use log::debug;
use serde::Serialize;

use crate::core::{BlockType, InterleaveType, TvqError, TvqResult, MAX_SUBVECTOR_BITS};
use crate::mode::ModeTable;

/// One channel's share of a vector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ChannelLayout {
    pub total_bits: usize,
    /// bits per sub-vector
    pub bits: Vec<u8>,
    /// first codebook stage width per sub-vector
    pub bits0: Vec<u8>,
    /// second codebook stage width per sub-vector
    pub bits1: Vec<u8>,
    /// positions per sub-vector
    pub lengths: Vec<usize>,
}

impl ChannelLayout {
    /// sub-vector count
    pub fn ndiv(&self) -> usize {
        self.bits.len()
    }

    pub fn vector_len(&self) -> usize {
        self.lengths.iter().sum()
    }
}

/// Bit allocation for one interleave type, all channels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VectorLayout {
    pub interleave: InterleaveType,
    pub block_type: BlockType,
    pub total_bits: usize,
    /// positions per channel
    pub vector_len: usize,
    /// requested weights, empty for the default uniform split
    pub weights: Vec<u32>,
    pub channels: Vec<ChannelLayout>,
}

impl VectorLayout {
    /// sub-vectors over all channels
    pub fn ndiv(&self) -> usize {
        self.channels.iter().map(ChannelLayout::ndiv).sum()
    }

    /// code slots an Index needs (two stages per sub-vector)
    pub fn code_slots(&self) -> usize {
        2 * self.ndiv()
    }

    /// stage widths in stream order: channel, sub-vector, stage
    pub fn code_widths(&self) -> impl Iterator<Item = u8> + '_ {
        self.channels.iter().flat_map(|c| {
            c.bits0
                .iter()
                .zip(c.bits1.iter())
                .flat_map(|(&b0, &b1)| [b0, b1])
        })
    }

    pub fn bits0(&self) -> Vec<u8> {
        self.channels.iter().flat_map(|c| c.bits0.iter().copied()).collect()
    }

    pub fn bits1(&self) -> Vec<u8> {
        self.channels.iter().flat_map(|c| c.bits1.iter().copied()).collect()
    }
}

/// Layouts for all four interleave types, indexed by InterleaveType.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VectorInfo {
    pub layouts: Vec<VectorLayout>,
}

impl VectorInfo {
    pub fn layout(&self, interleave: InterleaveType) -> &VectorLayout {
        &self.layouts[interleave.index()]
    }

    pub fn ndiv(&self, interleave: InterleaveType) -> usize {
        self.layout(interleave).ndiv()
    }

    pub fn bits0(&self, interleave: InterleaveType) -> Vec<u8> {
        self.layout(interleave).bits0()
    }

    pub fn bits1(&self, interleave: InterleaveType) -> Vec<u8> {
        self.layout(interleave).bits1()
    }
}

/// Computes layouts for one mode.
#[derive(Debug, Clone, Copy)]
pub struct VectorBitAllocator {
    mode: &'static ModeTable,
}

impl VectorBitAllocator {
    pub fn new(mode: &'static ModeTable) -> Self {
        VectorBitAllocator { mode }
    }

    /// positions per channel of an interleave type's vector
    pub fn vector_len(&self, interleave: InterleaveType) -> usize {
        match interleave {
            InterleaveType::Ppc => self.mode.ppc.shape_len,
            _ => self.mode.frame_size,
        }
    }

    /// Lay out `total_bits` over the sub-vectors of every channel.
    ///
    /// `ndiv` holds one weight per sub-vector of a channel. Empty means
    /// `ceil(bits / 14)` equally weighted sub-vectors per channel.
    pub fn compute_layout(
        &self,
        channels: usize,
        block_type: BlockType,
        interleave: InterleaveType,
        total_bits: usize,
        ndiv: &[u32],
    ) -> TvqResult<VectorLayout> {
        if channels == 0 || channels > crate::core::N_CH_MAX {
            return Err(TvqError::InvalidConfiguration(format!(
                "{channels} channels not supported"
            )));
        }
        if interleave.block_type() != block_type {
            return Err(TvqError::InvalidConfiguration(format!(
                "interleave {interleave:?} can't carry {block_type:?} blocks"
            )));
        }
        if ndiv.iter().any(|&w| w == 0) {
            return Err(TvqError::InvalidConfiguration(
                "ndiv weights must be positive".into(),
            ));
        }

        let vector_len = self.vector_len(interleave);
        let base = total_bits / channels;
        let extra = total_bits % channels;

        let mut layouts = Vec::with_capacity(channels);
        for ch in 0..channels {
            let bits = base + usize::from(ch < extra);
            layouts.push(channel_layout(bits, ndiv, vector_len)?);
        }

        Ok(VectorLayout {
            interleave,
            block_type,
            total_bits,
            vector_len,
            weights: ndiv.to_vec(),
            channels: layouts,
        })
    }

    /// default layouts for a frame of `frame_bits` bits
    pub fn default_layouts(&self, channels: usize, frame_bits: usize) -> TvqResult<VectorInfo> {
        let mut layouts = Vec::with_capacity(InterleaveType::ALL.len());
        for interleave in InterleaveType::ALL {
            let bits = self.default_bits(channels, interleave, frame_bits)?;
            layouts.push(self.compute_layout(
                channels,
                interleave.block_type(),
                interleave,
                bits,
                &[],
            )?);
        }
        let info = VectorInfo { layouts };
        debug!(
            "layouts for {} at {} bits/frame: ndiv s={} m={} l={} ppc={}",
            self.mode.name(),
            frame_bits,
            info.ndiv(InterleaveType::Short),
            info.ndiv(InterleaveType::Medium),
            info.ndiv(InterleaveType::Long),
            info.ndiv(InterleaveType::Ppc)
        );
        Ok(info)
    }

    /// VQ bits an interleave type gets out of a frame
    pub fn default_bits(
        &self,
        channels: usize,
        interleave: InterleaveType,
        frame_bits: usize,
    ) -> TvqResult<usize> {
        if interleave == InterleaveType::Ppc {
            return Ok(self.mode.ppc_vq_bits(channels));
        }
        let side = self.mode.side_bits(channels, interleave.block_type());
        match frame_bits.checked_sub(side) {
            Some(main) if main > 0 => Ok(main),
            _ => Err(TvqError::InsufficientBits {
                required: side + 1,
                available: frame_bits,
            }),
        }
    }
}

fn channel_layout(bits: usize, weights: &[u32], vector_len: usize) -> TvqResult<ChannelLayout> {
    let count = if weights.is_empty() {
        bits.div_ceil(MAX_SUBVECTOR_BITS).max(1)
    } else {
        weights.len()
    };

    if bits < count {
        return Err(TvqError::InsufficientBits {
            required: count,
            available: bits,
        });
    }
    if bits > count * MAX_SUBVECTOR_BITS {
        return Err(TvqError::BufferOverflow {
            required: bits,
            capacity: count * MAX_SUBVECTOR_BITS,
        });
    }
    if count > vector_len {
        return Err(TvqError::InvalidConfiguration(format!(
            "{count} sub-vectors for a vector of {vector_len}"
        )));
    }

    let uniform = vec![1u32; count];
    let weights = if weights.is_empty() { &uniform[..] } else { weights };
    let split = split_bits(bits, weights);

    let bits0 = split.iter().map(|&b| b.div_ceil(2)).collect();
    let bits1 = split.iter().map(|&b| b / 2).collect();
    let lengths = (0..count)
        .map(|i| vector_len / count + usize::from(i < vector_len % count))
        .collect();

    Ok(ChannelLayout {
        total_bits: bits,
        bits: split,
        bits0,
        bits1,
        lengths,
    })
}

/// reserve one bit each, largest remainder for the rest, cap at 14
fn split_bits(bits: usize, weights: &[u32]) -> Vec<u8> {
    let count = weights.len();
    let rest = (bits - count) as u64;
    let sum: u64 = weights.iter().map(|&w| w as u64).sum();

    let mut split: Vec<usize> = Vec::with_capacity(count);
    let mut remainders: Vec<(u64, usize)> = Vec::with_capacity(count);
    for (i, &w) in weights.iter().enumerate() {
        let share = rest * w as u64;
        split.push(1 + (share / sum) as usize);
        remainders.push((share % sum, i));
    }

    let given: usize = split.iter().sum();
    let mut left = bits - given;
    // largest remainder first, lowest index on ties
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for &(_, i) in remainders.iter() {
        if left == 0 {
            break;
        }
        split[i] += 1;
        left -= 1;
    }

    let mut overflow = 0;
    for b in split.iter_mut() {
        if *b > MAX_SUBVECTOR_BITS {
            overflow += *b - MAX_SUBVECTOR_BITS;
            *b = MAX_SUBVECTOR_BITS;
        }
    }
    for b in split.iter_mut() {
        if overflow == 0 {
            break;
        }
        let room = (MAX_SUBVECTOR_BITS - *b).min(overflow);
        *b += room;
        overflow -= room;
    }

    split.into_iter().map(|b| b as u8).collect()
}
