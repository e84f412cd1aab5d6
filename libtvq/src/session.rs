//! Per-session state shared by the encoder and the decoder: lifecycle,
//! frame counter, bit accounting and the current vector layouts.

use log::debug;

use crate::config::{ConfInfo, HeaderInfo, SetupInfo};
use crate::core::{BlockType, InterleaveType, TvqError, TvqResult};
use crate::mode::ModeTable;
use crate::vq::{FrameLayout, VectorBitAllocator, VectorInfo};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Ready,
    Terminated,
}

/// State one encoder or decoder session owns.
#[derive(Debug, Clone)]
pub struct SessionState {
    setup: SetupInfo,
    mode: &'static ModeTable,
    allocator: VectorBitAllocator,
    phase: SessionPhase,
    frame_counter: u64,
    used_bits: u64,
    frames_accounted: u64,
    /// bits per frame the layouts are currently built for
    frame_bits: usize,
    vectors: VectorInfo,
}

impl SessionState {
    /// negotiate a header and build the initial layouts
    pub fn open(header: &HeaderInfo) -> TvqResult<Self> {
        let (setup, mode) = SetupInfo::negotiate(header)?;
        let allocator = VectorBitAllocator::new(mode);
        let vectors = allocator.default_layouts(setup.channels, setup.frame_bits)?;
        check_capacity(mode, setup.channels, &vectors)?;

        debug!(
            "session {} mode {} ch={} N={} bits/frame={}",
            setup.version_id, setup.mode, setup.channels, setup.frame_size, setup.frame_bits
        );

        Ok(SessionState {
            frame_bits: setup.frame_bits,
            setup,
            mode,
            allocator,
            phase: SessionPhase::Ready,
            frame_counter: 0,
            used_bits: 0,
            frames_accounted: 0,
            vectors,
        })
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn ensure_open(&self) -> TvqResult<()> {
        match self.phase {
            SessionPhase::Ready => Ok(()),
            SessionPhase::Terminated => Err(TvqError::SessionClosed),
        }
    }

    pub fn setup(&self) -> TvqResult<&SetupInfo> {
        self.ensure_open()?;
        Ok(&self.setup)
    }

    pub fn mode(&self) -> TvqResult<&'static ModeTable> {
        self.ensure_open()?;
        Ok(self.mode)
    }

    /// layout of the next frame of `block_type`
    pub fn frame_layout(&self, block_type: BlockType) -> TvqResult<FrameLayout> {
        self.ensure_open()?;
        Ok(FrameLayout::new(
            self.mode,
            self.setup.channels,
            block_type,
            &self.vectors,
        ))
    }

    pub fn num_frames(&self) -> TvqResult<u64> {
        self.ensure_open()?;
        Ok(self.frame_counter)
    }

    pub fn set_frame_counter(&mut self, frames: u64) -> TvqResult<()> {
        self.ensure_open()?;
        self.frame_counter = frames;
        Ok(())
    }

    pub fn reset_frame_counter(&mut self) -> TvqResult<()> {
        self.set_frame_counter(0)
    }

    /// record a finished frame call
    pub(crate) fn commit_frame(&mut self, bits: usize) {
        self.frame_counter += 1;
        self.used_bits += bits as u64;
        self.frames_accounted += 1;
    }

    /// add bits spent outside frame calls (headers, padding)
    pub fn count_used_bits(&mut self, bits: u64) -> TvqResult<()> {
        self.ensure_open()?;
        self.used_bits += bits;
        Ok(())
    }

    pub fn fb_total_bits(&self) -> TvqResult<u64> {
        self.ensure_open()?;
        Ok(self.used_bits)
    }

    /// running average in bits per second
    pub fn fb_current_bitrate(&self) -> TvqResult<f64> {
        self.ensure_open()?;
        if self.frames_accounted == 0 {
            return Ok(0.0);
        }
        let per_frame = self.used_bits as f64 / self.frames_accounted as f64;
        Ok(per_frame * self.setup.frame_rate())
    }

    pub fn reset_bit_accounting(&mut self) -> TvqResult<()> {
        self.ensure_open()?;
        self.used_bits = 0;
        self.frames_accounted = 0;
        Ok(())
    }

    pub fn vector_info(&self) -> TvqResult<&VectorInfo> {
        self.ensure_open()?;
        Ok(&self.vectors)
    }

    /// bits per frame at the current layouts
    pub fn frame_bits(&self) -> TvqResult<usize> {
        self.ensure_open()?;
        Ok(self.frame_bits)
    }

    /// Rebuild the short, medium and long layouts for frames of
    /// `frame_bits` bits. Nothing changes unless every layout fits.
    pub fn update_vector_info(&mut self, frame_bits: usize) -> TvqResult<()> {
        self.ensure_open()?;
        let mut vectors = self.vectors.clone();
        for block_type in BlockType::ALL {
            let interleave = block_type.interleave();
            let bits = self
                .allocator
                .default_bits(self.setup.channels, interleave, frame_bits)?;
            let weights = vectors.layout(interleave).weights.clone();
            vectors.layouts[interleave.index()] = self.allocator.compute_layout(
                self.setup.channels,
                block_type,
                interleave,
                bits,
                &weights,
            )?;
        }
        check_capacity(self.mode, self.setup.channels, &vectors)?;

        debug!("vector info updated to {frame_bits} bits/frame");
        self.vectors = vectors;
        self.frame_bits = frame_bits;
        Ok(())
    }

    /// Replace one interleave type's layout with `bits` VQ bits split by
    /// the `ndiv` weights.
    pub fn update_vector_layout(
        &mut self,
        interleave: InterleaveType,
        bits: usize,
        ndiv: &[u32],
    ) -> TvqResult<()> {
        self.ensure_open()?;
        let layout = self.allocator.compute_layout(
            self.setup.channels,
            interleave.block_type(),
            interleave,
            bits,
            ndiv,
        )?;
        let mut vectors = self.vectors.clone();
        vectors.layouts[interleave.index()] = layout;
        check_capacity(self.mode, self.setup.channels, &vectors)?;

        debug!("{interleave:?} layout now {bits} bits over {} sub-vectors", vectors.ndiv(interleave));
        self.vectors = vectors;
        Ok(())
    }

    pub fn conf_info(&self) -> TvqResult<ConfInfo> {
        self.ensure_open()?;
        Ok(ConfInfo::build(self.mode, self.setup.channels, &self.vectors))
    }

    /// close the session, every later call fails with SessionClosed
    pub fn terminate(&mut self) -> TvqResult<()> {
        self.ensure_open()?;
        self.phase = SessionPhase::Terminated;
        Ok(())
    }
}

fn check_capacity(mode: &ModeTable, channels: usize, vectors: &VectorInfo) -> TvqResult<()> {
    for block_type in BlockType::ALL {
        FrameLayout::new(mode, channels, block_type, vectors).check_capacity()?;
    }
    Ok(())
}

/// Accessors every encoder and decoder session offers.
pub trait CodecSession {
    fn state(&self) -> &SessionState;
    fn state_mut(&mut self) -> &mut SessionState;

    fn frame_size(&self) -> TvqResult<usize> {
        self.state().setup().map(|s| s.frame_size)
    }

    fn num_channels(&self) -> TvqResult<usize> {
        self.state().setup().map(|s| s.channels)
    }

    /// kbps over all channels
    fn bit_rate(&self) -> TvqResult<u32> {
        self.state().setup().map(|s| s.bit_rate)
    }

    fn sampling_rate(&self) -> TvqResult<u32> {
        self.state().setup().map(|s| s.sampling_rate)
    }

    /// bits per frame at the negotiated bit rate
    fn num_fixed_bits_per_frame(&self) -> TvqResult<usize> {
        self.state().setup().map(|s| s.frame_bits)
    }

    fn num_frames(&self) -> TvqResult<u64> {
        self.state().num_frames()
    }

    fn set_frame_counter(&mut self, frames: u64) -> TvqResult<()> {
        self.state_mut().set_frame_counter(frames)
    }

    fn reset_frame_counter(&mut self) -> TvqResult<()> {
        self.state_mut().reset_frame_counter()
    }

    fn count_used_bits(&mut self, bits: u64) -> TvqResult<()> {
        self.state_mut().count_used_bits(bits)
    }

    fn fb_total_bits(&self) -> TvqResult<u64> {
        self.state().fb_total_bits()
    }

    fn fb_current_bitrate(&self) -> TvqResult<f64> {
        self.state().fb_current_bitrate()
    }

    fn reset_bit_accounting(&mut self) -> TvqResult<()> {
        self.state_mut().reset_bit_accounting()
    }

    fn vector_info(&self) -> TvqResult<VectorInfo> {
        self.state().vector_info().cloned()
    }

    fn update_vector_info(&mut self, frame_bits: usize) -> TvqResult<()> {
        self.state_mut().update_vector_info(frame_bits)
    }

    fn update_vector_layout(
        &mut self,
        interleave: InterleaveType,
        bits: usize,
        ndiv: &[u32],
    ) -> TvqResult<()> {
        self.state_mut().update_vector_layout(interleave, bits, ndiv)
    }

    fn setup_info(&self) -> TvqResult<SetupInfo> {
        self.state().setup().cloned()
    }

    fn conf_info(&self) -> TvqResult<ConfInfo> {
        self.state().conf_info()
    }

    fn frame_layout(&self, block_type: BlockType) -> TvqResult<FrameLayout> {
        self.state().frame_layout(block_type)
    }

    fn module_version(&self) -> TvqResult<&'static str> {
        self.state().ensure_open()?;
        Ok(crate::module_version())
    }
}
