use log::debug;

use crate::container::{VqfHeader, VqfMetadata, VqfReader};
use crate::core::{BitReader, TvqError, TvqResult};
use crate::lossy::FrameTransformDecoder;
use crate::session::CodecSession;

use super::types::{DecoderState, StreamingAudioInfo};

pub struct StreamingDecoder {
    /// header bytes until it parses, then unread frame data
    buffer: Vec<u8>,
    /// current state
    state: DecoderState,
    /// parsed header
    header: Option<VqfHeader>,
    metadata: VqfMetadata,
    /// frame decoder once the header is in
    decoder: Option<FrameTransformDecoder>,
    /// frame data bytes already dropped from the buffer
    drained: usize,
    /// bits of the buffer consumed
    bit_pos: usize,
    /// frames decoded
    current_frame: usize,
    /// samples per channel still to drop from the front of the output
    delay_remaining: usize,
}

impl StreamingDecoder {
    /// new streaming decoder
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(64 * 1024),
            state: DecoderState::WaitingForHeader,
            header: None,
            metadata: VqfMetadata::new(),
            decoder: None,
            drained: 0,
            bit_pos: 0,
            current_frame: 0,
            delay_remaining: 0,
        }
    }

    /// current state
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// audio info if we have the header
    pub fn info(&self) -> Option<StreamingAudioInfo> {
        let header = self.header.as_ref()?;
        let decoder = self.decoder.as_ref()?;
        let setup = decoder.setup_info().ok()?;
        Some(StreamingAudioInfo {
            sample_rate: setup.sampling_rate,
            channels: setup.channels,
            bit_rate: setup.bit_rate,
            frame_size: setup.frame_size,
            total_frames: header
                .data_size
                .map(|size| size as u64 * 8 / setup.frame_bits.max(1) as u64),
        })
    }

    /// text chunks from the header
    pub fn metadata(&self) -> &VqfMetadata {
        &self.metadata
    }

    /// feed more data, returns true if the header is parsed and frame data
    /// is waiting
    pub fn feed(&mut self, data: &[u8]) -> TvqResult<bool> {
        if self.state == DecoderState::Error || self.state == DecoderState::Finished {
            return Ok(false);
        }

        self.buffer.extend_from_slice(data);
        if self.state == DecoderState::WaitingForHeader && !self.try_parse_header()? {
            return Ok(false);
        }
        Ok(self.unread_bits() > 0)
    }

    /// decode the next frame, or None if its bits haven't arrived yet
    pub fn next_frame(&mut self) -> TvqResult<Option<Vec<f32>>> {
        if self.state != DecoderState::Ready {
            return Ok(None);
        }
        let data_end = self.data_end();
        let complete = self.data_complete();
        let Some(decoder) = self.decoder.as_mut() else {
            return Ok(None);
        };

        let data = &self.buffer[..data_end];
        let mut reader = BitReader::with_offset(data, self.bit_pos);

        let index = match decoder.read_index(&mut reader) {
            Ok(index) => index,
            Err(TvqError::UnexpectedEof { .. }) => {
                if complete {
                    self.state = DecoderState::Finished;
                }
                return Ok(None);
            }
            Err(e) => {
                self.state = DecoderState::Error;
                return Err(e);
            }
        };
        let consumed = reader.position();

        let mut samples = match decoder.decode_frame(&index) {
            Ok(samples) => samples,
            Err(e) => {
                self.state = DecoderState::Error;
                return Err(e);
            }
        };
        self.bit_pos = consumed;
        self.current_frame += 1;
        // drain_consumed() inlined: borrow only the fields it touches, since
        // `decoder` still borrows `self.decoder`
        let bytes = (self.bit_pos / 8).min(self.buffer.len());
        self.buffer.drain(..bytes);
        self.drained += bytes;
        self.bit_pos -= bytes * 8;

        let channels = decoder.num_channels()?;
        let frame_size = decoder.frame_size()?;
        if self.delay_remaining > 0 {
            let drop = self.delay_remaining.min(frame_size);
            samples.drain(..drop * channels);
            self.delay_remaining -= drop;
        }
        Ok(Some(samples))
    }

    /// decode every frame that has fully arrived
    pub fn decode_available(&mut self) -> TvqResult<Vec<f32>> {
        let mut out = Vec::new();
        while let Some(samples) = self.next_frame()? {
            out.extend_from_slice(&samples);
        }
        Ok(out)
    }

    /// no more data is coming; the trailing partial frame, if any, is padding
    pub fn finish(&mut self) {
        if self.state == DecoderState::Ready {
            self.state = DecoderState::Finished;
        }
    }

    /// reset for reuse
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// bytes buffered
    pub fn buffered_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// current frame index
    pub fn current_frame_index(&self) -> usize {
        self.current_frame
    }

    // internal stuff

    fn try_parse_header(&mut self) -> TvqResult<bool> {
        let (header, metadata, offset) = match VqfReader::new().read_prefix(&self.buffer) {
            Ok(parsed) => parsed,
            Err(TvqError::UnexpectedEof { .. }) => return Ok(false),
            Err(e) => {
                self.state = DecoderState::Error;
                return Err(e);
            }
        };

        let decoder = header
            .header_info()
            .and_then(|info| FrameTransformDecoder::initialize(&info));
        let decoder = match decoder {
            Ok(d) => d,
            Err(e) => {
                self.state = DecoderState::Error;
                return Err(e);
            }
        };

        self.delay_remaining = decoder.setup_info()?.overlap;
        debug!(
            "stream header: {} ch, {} kbps, rate class {}, data at {offset}",
            header.channels, header.bit_rate, header.rate_class
        );

        self.header = Some(header);
        self.metadata = metadata;
        self.decoder = Some(decoder);
        self.buffer.drain(..offset);
        self.state = DecoderState::Ready;
        Ok(true)
    }

    /// drop whole bytes already read; a frame may end mid-byte
    fn drain_consumed(&mut self) {
        let bytes = (self.bit_pos / 8).min(self.buffer.len());
        self.buffer.drain(..bytes);
        self.drained += bytes;
        self.bit_pos -= bytes * 8;
    }

    /// end of frame data in the buffer, bounded by DSIZ
    fn data_end(&self) -> usize {
        let declared = self
            .header
            .as_ref()
            .and_then(|h| h.data_size)
            .map(|size| (size as usize).saturating_sub(self.drained));
        match declared {
            Some(end) => end.min(self.buffer.len()),
            None => self.buffer.len(),
        }
    }

    /// DSIZ bytes have all arrived
    fn data_complete(&self) -> bool {
        self.header
            .as_ref()
            .and_then(|h| h.data_size)
            .is_some_and(|size| self.drained + self.buffer.len() >= size as usize)
    }

    fn unread_bits(&self) -> usize {
        (self.data_end() * 8).saturating_sub(self.bit_pos)
    }
}

impl Default for StreamingDecoder {
    fn default() -> Self {
        Self::new()
    }
}
