//! The per-frame Index and the codec that moves it between flat value
//! lists, structured form and the bit stream.

use crate::core::{
    BitReader, BitWriter, BlockType, TvqError, TvqResult, WindowType, GAIN_BITS, INDEX_CAPACITY,
    SUB_GAIN_BITS, WINDOW_TYPE_BITS,
};
use crate::mode::{LspGeometry, ModeTable};

use super::allocator::{VectorInfo, VectorLayout};

/// Fixed-capacity buffer of VQ codes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodeBuffer {
    codes: Vec<u16>,
    capacity: usize,
}

impl CodeBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        CodeBuffer {
            codes: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, code: u16) -> TvqResult<()> {
        if self.codes.len() >= self.capacity {
            return Err(TvqError::BufferOverflow {
                required: self.codes.len() + 1,
                capacity: self.capacity,
            });
        }
        self.codes.push(code);
        Ok(())
    }

    pub fn get(&self, slot: usize) -> Option<u16> {
        self.codes.get(slot).copied()
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// side information of one channel
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelIndex {
    pub gain: u16,
    /// one per sub-block, short and medium blocks only
    pub sub_gains: Vec<u16>,
    /// [sub-block][region]
    pub bark: Vec<Vec<u16>>,
    /// per sub-block: blend with the previous bark levels
    pub bark_use_hist: Vec<bool>,
    /// frame envelope coded against the previous frame
    pub env_hist: bool,
    pub env_coarse: u16,
    pub env_fine: Vec<u16>,
    pub ppc_period: u16,
    pub ppc_gain: u16,
}

/// The quantized payload of one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    pub window_type: WindowType,
    /// main spectrum codes, two per sub-vector, channel-major
    pub main: CodeBuffer,
    /// ppc shape codes, long blocks only
    pub ppc: CodeBuffer,
    pub channels: Vec<ChannelIndex>,
    /// stage widths of the layout the codes were chosen under
    pub stage_widths: Vec<u8>,
}

impl Index {
    pub fn block_type(&self) -> BlockType {
        self.window_type.block_type()
    }
}

/// Everything needed to lay out one frame of a given block type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLayout {
    pub block_type: BlockType,
    pub channels: usize,
    pub sub_blocks: usize,
    pub bark_n_coef: usize,
    pub bark_n_bit: u8,
    pub lsp: LspGeometry,
    pub ppc_period_bits: u8,
    pub ppc_gain_bits: u8,
    pub main: VectorLayout,
    pub ppc: Option<VectorLayout>,
}

impl FrameLayout {
    pub fn new(
        mode: &ModeTable,
        channels: usize,
        block_type: BlockType,
        vectors: &VectorInfo,
    ) -> Self {
        let geometry = mode.block(block_type);
        FrameLayout {
            block_type,
            channels,
            sub_blocks: geometry.sub_blocks,
            bark_n_coef: geometry.bark_n_coef,
            bark_n_bit: geometry.bark_n_bit,
            lsp: mode.lsp,
            ppc_period_bits: mode.ppc.period_bit,
            ppc_gain_bits: mode.ppc.pgain_bit,
            main: vectors.layout(block_type.interleave()).clone(),
            ppc: (block_type == BlockType::Long)
                .then(|| vectors.layout(crate::core::InterleaveType::Ppc).clone()),
        }
    }

    /// codebook stage widths, main codes then ppc codes
    pub fn stage_widths(&self) -> Vec<u8> {
        let ppc = self.ppc.iter().flat_map(|p| p.code_widths());
        self.main.code_widths().chain(ppc).collect()
    }

    fn has_sub_gains(&self) -> bool {
        self.block_type != BlockType::Long
    }

    /// field widths in stream order
    pub fn field_widths(&self) -> Vec<u8> {
        let mut widths = Vec::with_capacity(self.element_count());
        widths.push(WINDOW_TYPE_BITS);
        widths.extend(self.main.code_widths());
        for _ in 0..self.channels * self.sub_blocks * self.bark_n_coef {
            widths.push(self.bark_n_bit);
        }
        for _ in 0..self.channels * self.sub_blocks {
            widths.push(1);
        }
        for _ in 0..self.channels {
            widths.push(GAIN_BITS);
            if self.has_sub_gains() {
                for _ in 0..self.sub_blocks {
                    widths.push(SUB_GAIN_BITS);
                }
            }
        }
        for _ in 0..self.channels {
            widths.push(self.lsp.bit0);
            widths.push(self.lsp.bit1);
            for _ in 0..self.lsp.split {
                widths.push(self.lsp.bit2);
            }
        }
        if let Some(ppc) = &self.ppc {
            widths.extend(ppc.code_widths());
            for _ in 0..self.channels {
                widths.push(self.ppc_period_bits);
                widths.push(self.ppc_gain_bits);
            }
        }
        widths
    }

    /// values in a flat list for this layout
    pub fn element_count(&self) -> usize {
        let ch = self.channels;
        let sub_gains = if self.has_sub_gains() { self.sub_blocks } else { 0 };
        let mut count = 1
            + self.main.code_slots()
            + ch * self.sub_blocks * self.bark_n_coef
            + ch * self.sub_blocks
            + ch * (1 + sub_gains)
            + ch * (2 + self.lsp.split);
        if let Some(ppc) = &self.ppc {
            count += ppc.code_slots() + 2 * ch;
        }
        count
    }

    /// bits one frame occupies in the stream
    pub fn total_bits(&self) -> usize {
        self.field_widths().iter().map(|&w| w as usize).sum()
    }

    /// fail if either code buffer would overflow
    pub fn check_capacity(&self) -> TvqResult<()> {
        let slots = [Some(&self.main), self.ppc.as_ref()];
        for layout in slots.into_iter().flatten() {
            if layout.code_slots() > INDEX_CAPACITY {
                return Err(TvqError::BufferOverflow {
                    required: layout.code_slots(),
                    capacity: INDEX_CAPACITY,
                });
            }
        }
        Ok(())
    }
}

/// walks a flat value list, checking every value against its width
struct Fields<'a> {
    values: &'a [u32],
    widths: &'a [u8],
    pos: usize,
}

impl<'a> Fields<'a> {
    fn next(&mut self) -> TvqResult<u32> {
        let (Some(&value), Some(&width)) = (self.values.get(self.pos), self.widths.get(self.pos))
        else {
            return Err(TvqError::LayoutMismatch("ran out of values".into()));
        };
        if width < 32 && value >> width != 0 {
            return Err(TvqError::LayoutMismatch(format!(
                "value {value} at element {} exceeds {width} bits",
                self.pos
            )));
        }
        self.pos += 1;
        Ok(value)
    }

    fn next_u16(&mut self) -> TvqResult<u16> {
        self.next().map(|v| v as u16)
    }
}

/// Converts between Index, flat values and bits.
pub struct IndexCodec;

impl IndexCodec {
    /// build an Index from values in stream order
    pub fn pack(values: &[u32], layout: &FrameLayout) -> TvqResult<Index> {
        layout.check_capacity()?;

        let widths = layout.field_widths();
        if values.len() != widths.len() {
            return Err(TvqError::LayoutMismatch(format!(
                "{} values for a layout of {} elements",
                values.len(),
                widths.len()
            )));
        }
        let mut fields = Fields {
            values,
            widths: &widths,
            pos: 0,
        };

        let window_type = WindowType::try_from(fields.next()? as u8)?;
        if window_type.block_type() != layout.block_type {
            return Err(TvqError::LayoutMismatch(format!(
                "window {window_type:?} in a {:?} layout",
                layout.block_type
            )));
        }

        let mut main = CodeBuffer::with_capacity(INDEX_CAPACITY);
        for _ in 0..layout.main.code_slots() {
            main.push(fields.next_u16()?)?;
        }

        let ch = layout.channels;
        let mut channels = vec![ChannelIndex::default(); ch];
        for c in channels.iter_mut() {
            c.bark = vec![Vec::with_capacity(layout.bark_n_coef); layout.sub_blocks];
            for sub in c.bark.iter_mut() {
                for _ in 0..layout.bark_n_coef {
                    sub.push(fields.next_u16()?);
                }
            }
        }
        for c in channels.iter_mut() {
            for _ in 0..layout.sub_blocks {
                c.bark_use_hist.push(fields.next()? != 0);
            }
        }
        for c in channels.iter_mut() {
            c.gain = fields.next_u16()?;
            if layout.has_sub_gains() {
                for _ in 0..layout.sub_blocks {
                    c.sub_gains.push(fields.next_u16()?);
                }
            }
        }
        for c in channels.iter_mut() {
            c.env_hist = fields.next()? != 0;
            c.env_coarse = fields.next_u16()?;
            for _ in 0..layout.lsp.split {
                c.env_fine.push(fields.next_u16()?);
            }
        }

        let mut ppc = CodeBuffer::with_capacity(INDEX_CAPACITY);
        if let Some(ppc_layout) = &layout.ppc {
            for _ in 0..ppc_layout.code_slots() {
                ppc.push(fields.next_u16()?)?;
            }
            for c in channels.iter_mut() {
                c.ppc_period = fields.next_u16()?;
                c.ppc_gain = fields.next_u16()?;
            }
        }

        Ok(Index {
            window_type,
            main,
            ppc,
            channels,
            stage_widths: layout.stage_widths(),
        })
    }

    /// flatten an Index into stream order
    pub fn unpack(index: &Index, layout: &FrameLayout) -> TvqResult<Vec<u32>> {
        Self::check_shape(index, layout)?;
        let values = Self::flatten(index, layout);
        Self::check_widths(&values, layout)?;
        Ok(values)
    }

    fn flatten(index: &Index, layout: &FrameLayout) -> Vec<u32> {
        let mut values = Vec::with_capacity(layout.element_count());
        values.push(index.window_type as u32);
        values.extend(index.main.as_slice().iter().map(|&c| c as u32));
        for c in &index.channels {
            for sub in &c.bark {
                values.extend(sub.iter().map(|&v| v as u32));
            }
        }
        for c in &index.channels {
            values.extend(c.bark_use_hist.iter().map(|&h| h as u32));
        }
        for c in &index.channels {
            values.push(c.gain as u32);
            values.extend(c.sub_gains.iter().map(|&v| v as u32));
        }
        for c in &index.channels {
            values.push(c.env_hist as u32);
            values.push(c.env_coarse as u32);
            values.extend(c.env_fine.iter().map(|&v| v as u32));
        }
        if layout.ppc.is_some() {
            values.extend(index.ppc.as_slice().iter().map(|&c| c as u32));
            for c in &index.channels {
                values.push(c.ppc_period as u32);
                values.push(c.ppc_gain as u32);
            }
        }
        values
    }

    fn check_widths(values: &[u32], layout: &FrameLayout) -> TvqResult<()> {
        let widths = layout.field_widths();
        let mut fields = Fields {
            values,
            widths: &widths,
            pos: 0,
        };
        for _ in 0..values.len() {
            fields.next()?;
        }
        Ok(())
    }

    /// Check an Index against a layout: same stage widths, same shape, and
    /// every code and side field within its width.
    pub fn validate(index: &Index, layout: &FrameLayout) -> TvqResult<()> {
        Self::check_shape(index, layout)?;
        Self::check_widths(&Self::flatten(index, layout), layout)
    }

    fn check_shape(index: &Index, layout: &FrameLayout) -> TvqResult<()> {
        let mismatch = |what: String| Err(TvqError::LayoutMismatch(what));

        if index.block_type() != layout.block_type {
            return mismatch(format!(
                "{:?} index for a {:?} layout",
                index.block_type(),
                layout.block_type
            ));
        }
        if index.stage_widths != layout.stage_widths() {
            return mismatch(format!(
                "index coded with {} stage widths that differ from the session layout",
                index.stage_widths.len()
            ));
        }
        if index.main.len() != layout.main.code_slots() {
            return mismatch(format!(
                "{} main codes, layout has {}",
                index.main.len(),
                layout.main.code_slots()
            ));
        }
        let ppc_slots = layout.ppc.as_ref().map_or(0, VectorLayout::code_slots);
        if index.ppc.len() != ppc_slots {
            return mismatch(format!(
                "{} ppc codes, layout has {ppc_slots}",
                index.ppc.len()
            ));
        }
        if index.channels.len() != layout.channels {
            return mismatch(format!(
                "{} channels, layout has {}",
                index.channels.len(),
                layout.channels
            ));
        }
        let sub_gains = if layout.has_sub_gains() { layout.sub_blocks } else { 0 };
        for (ch, c) in index.channels.iter().enumerate() {
            let shape_ok = c.sub_gains.len() == sub_gains
                && c.bark.len() == layout.sub_blocks
                && c.bark.iter().all(|b| b.len() == layout.bark_n_coef)
                && c.bark_use_hist.len() == layout.sub_blocks
                && c.env_fine.len() == layout.lsp.split;
            if !shape_ok {
                return mismatch(format!("channel {ch} side info doesn't fit the layout"));
            }
        }
        Ok(())
    }

    /// append an Index to a bit stream, returns bits written
    pub fn write(index: &Index, layout: &FrameLayout, writer: &mut BitWriter) -> TvqResult<usize> {
        let values = Self::unpack(index, layout)?;
        let widths = layout.field_widths();
        let start = writer.bit_len();
        for (&value, &width) in values.iter().zip(widths.iter()) {
            writer.write_bits(value, width);
        }
        Ok(writer.bit_len() - start)
    }

    /// read one Index; `layout_for` supplies the layout once the window
    /// type is known
    pub fn read<F>(reader: &mut BitReader<'_>, layout_for: F) -> TvqResult<Index>
    where
        F: FnOnce(BlockType) -> TvqResult<FrameLayout>,
    {
        let window = reader.read_bits(WINDOW_TYPE_BITS)?;
        let block_type = crate::core::wtype_to_btype(window as u8)?;
        let layout = layout_for(block_type)?;
        let widths = layout.field_widths();

        let mut values = Vec::with_capacity(widths.len());
        values.push(window);
        for &width in widths.iter().skip(1) {
            values.push(reader.read_bits(width)?);
        }
        Self::pack(&values, &layout)
    }
}
