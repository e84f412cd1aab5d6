use std::collections::VecDeque;

use log::debug;

use crate::config::{EncSpecificInfo, HeaderInfo};
use crate::container::{VqfHeader, VqfMetadata, VqfWriter};
use crate::core::{BitWriter, TvqResult};
use crate::lossy::FrameTransformEncoder;
use crate::session::CodecSession;
use crate::version::TvqVersion;
use crate::vq::IndexCodec;

pub struct StreamingEncoder {
    encoder: FrameTransformEncoder,
    header: VqfHeader,
    sample_rate: u32,
    channels: usize,
    frame_size: usize,
    sample_buffer: Vec<f32>,
    pending_frames: VecDeque<EncodedFrame>,
    /// every frame so far, packed back to back
    stream: BitWriter,
    total_samples: u64,
    frame_index: u32,
    flushed: bool,
}

/// An encoded frame ready for transmission
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// Frame index
    pub index: u32,
    /// Timestamp in milliseconds
    pub timestamp_ms: u32,
    /// this frame's bits, zero padded to a byte
    pub data: Vec<u8>,
    /// bits used before padding
    pub bits: usize,
    /// Number of samples per channel in this frame
    pub samples: u32,
}

impl StreamingEncoder {
    /// Streaming encoder for the newest format revision
    pub fn new(sample_rate: u32, channels: usize, bit_rate: u32) -> TvqResult<Self> {
        let header = HeaderInfo::new(TvqVersion::V2pp, channels, bit_rate, sample_rate as f32);
        Self::with_header(&header, &EncSpecificInfo::default())
    }

    pub fn with_header(header: &HeaderInfo, enc_info: &EncSpecificInfo) -> TvqResult<Self> {
        let encoder = FrameTransformEncoder::initialize(header, enc_info)?;
        let setup = encoder.setup_info()?;
        let vqf = VqfHeader::from_header_info(header)?;

        Ok(Self {
            sample_buffer: Vec::with_capacity(setup.frame_size * setup.channels * 2),
            sample_rate: setup.sampling_rate,
            channels: setup.channels,
            frame_size: setup.frame_size,
            encoder,
            header: vqf,
            pending_frames: VecDeque::new(),
            stream: BitWriter::new(),
            total_samples: 0,
            frame_index: 0,
            flushed: false,
        })
    }

    /// samples per channel in one frame
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Get number of pending samples in buffer
    pub fn pending_samples(&self) -> usize {
        self.sample_buffer.len() / self.channels
    }

    /// Get number of encoded frames ready
    pub fn pending_frames(&self) -> usize {
        self.pending_frames.len()
    }

    /// Push interleaved samples in the 16-bit range
    pub fn push_samples(&mut self, samples: &[f32]) -> TvqResult<()> {
        self.sample_buffer.extend_from_slice(samples);
        self.try_encode_frames()
    }

    /// Get next encoded frame if available
    pub fn next_frame(&mut self) -> Option<EncodedFrame> {
        self.pending_frames.pop_front()
    }

    /// Pad out the last partial frame and add one silent frame so the
    /// transform delay reaches the output. Returns the frames added.
    pub fn flush(&mut self) -> TvqResult<usize> {
        if self.flushed || (self.total_samples == 0 && self.sample_buffer.is_empty()) {
            return Ok(0);
        }

        let frame_samples = self.frame_size * self.channels;
        let before = self.pending_frames.len();

        if !self.sample_buffer.is_empty() {
            let padded = self.sample_buffer.len().div_ceil(frame_samples) * frame_samples;
            self.sample_buffer.resize(padded, 0.0);
        }
        self.sample_buffer.resize(self.sample_buffer.len() + frame_samples, 0.0);
        self.try_encode_frames()?;

        self.flushed = true;
        Ok(self.pending_frames.len() - before)
    }

    /// Flush and build a complete VQF file from every frame encoded
    pub fn finalize(mut self, metadata: &VqfMetadata) -> TvqResult<Vec<u8>> {
        self.flush()?;
        debug!(
            "finalizing {} frames, {} bits",
            self.frame_index,
            self.stream.bit_len()
        );
        let data = self.stream.into_bytes();
        VqfWriter::new().write(&self.header, metadata, &data)
    }

    // internal

    fn try_encode_frames(&mut self) -> TvqResult<()> {
        let frame_samples = self.frame_size * self.channels;

        while self.sample_buffer.len() >= frame_samples {
            let index = self.encoder.encode_frame(&self.sample_buffer[..frame_samples])?;
            self.sample_buffer.drain(..frame_samples);

            let layout = self.encoder.frame_layout(index.block_type())?;
            let mut frame_writer = BitWriter::new();
            let bits = IndexCodec::write(&index, &layout, &mut frame_writer)?;
            IndexCodec::write(&index, &layout, &mut self.stream)?;

            let timestamp_ms =
                (self.total_samples as f64 / self.sample_rate as f64 * 1000.0) as u32;
            self.pending_frames.push_back(EncodedFrame {
                index: self.frame_index,
                timestamp_ms,
                data: frame_writer.into_bytes(),
                bits,
                samples: self.frame_size as u32,
            });

            self.total_samples += self.frame_size as u64;
            self.frame_index += 1;
        }

        Ok(())
    }
}
