//! Streaming types and enums

use serde::Serialize;

/// Streaming decoder state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DecoderState {
    /// Waiting for the VQF header
    WaitingForHeader,
    /// Ready to decode frames
    Ready,
    /// End of stream reached
    Finished,
    /// Error state
    Error,
}

/// Audio information for streaming
#[derive(Debug, Clone, Serialize)]
pub struct StreamingAudioInfo {
    /// Sample rate in Hz
    pub sample_rate: u32,
    pub channels: usize,
    /// kbps over all channels
    pub bit_rate: u32,
    /// samples per channel per frame
    pub frame_size: usize,
    /// from DSIZ, when the file has one
    pub total_frames: Option<u64>,
}

impl StreamingAudioInfo {
    /// Duration in seconds, if the frame count is known
    pub fn duration_secs(&self) -> Option<f64> {
        self.total_frames
            .map(|f| (f * self.frame_size as u64) as f64 / self.sample_rate as f64)
    }
}
