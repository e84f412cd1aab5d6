#![allow(clippy::needless_range_loop)]

use serde::Serialize;

pub mod config;
pub mod container;
pub mod core;
pub mod lossy;
pub mod mode;
pub mod session;
pub mod streaming;
pub mod version;
pub mod vq;

pub use config::{ConfInfo, EncSpecificInfo, HeaderInfo, SetupInfo};
pub use container::{VqfFile, VqfHeader, VqfMetadata, VqfReader, VqfWriter};
pub use crate::core::{
    BitReader, BitWriter, BlockType, InterleaveType, TvqError, TvqResult, WindowType,
};
pub use lossy::{
    FrameTransformDecoder as Decoder, FrameTransformDecoder, FrameTransformEncoder as Encoder,
    FrameTransformEncoder, Mdct,
};
pub use mode::{ModeTable, MODES};
pub use session::{CodecSession, SessionState};
pub use streaming::{
    DecoderState, EncodedFrame, StreamingAudioInfo, StreamingDecoder, StreamingEncoder,
};
pub use version::TvqVersion;
pub use vq::{FrameLayout, Index, IndexCodec, VectorBitAllocator, VectorInfo};

/// crate version, e.g. "0.1.0"
pub fn module_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// info about a VQF file
#[derive(Debug, Clone, Serialize)]
pub struct AudioInfo {
    /// "TWIN97012000" style identifier
    pub version: String,
    /// Sample rate in Hz
    pub sample_rate: u32,
    pub channels: usize,
    /// kbps over all channels
    pub bit_rate: u32,
    /// e.g. "44/48"
    pub mode: String,
    /// samples per channel per frame
    pub frame_size: usize,
    /// Total number of frames
    pub total_frames: usize,
    /// Duration in seconds
    pub duration_secs: f64,
    /// File size in bytes
    pub file_size: usize,
    pub security_level: u32,
    pub metadata: VqfMetadata,
}

// api functions

/// encode samples to VQF
///
/// # Arguments
/// * `samples` - Interleaved audio samples (f32, -1.0 to 1.0)
/// * `sample_rate` - Sample rate in Hz, one of the mode table's rates
/// * `channels` - Number of channels (1 or 2)
/// * `bit_rate` - kbps over all channels
/// * `metadata` - Optional text chunks
///
/// # Returns
/// VQF file as byte array
///
/// # Note
/// For frame at a time control use `StreamingEncoder` or the
/// `Encoder` session directly.
pub fn encode(
    samples: &[f32],
    sample_rate: u32,
    channels: usize,
    bit_rate: u32,
    metadata: Option<&VqfMetadata>,
) -> TvqResult<Vec<u8>> {
    let mut encoder = StreamingEncoder::new(sample_rate, channels, bit_rate)?;
    let scaled: Vec<f32> = samples.iter().map(|&s| crate::core::to_codec_range(s)).collect();
    encoder.push_samples(&scaled)?;
    // frames are written into the file on finalize
    while encoder.next_frame().is_some() {}
    encoder.finalize(metadata.unwrap_or(&VqfMetadata::new()))
}

/// decode a VQF file to samples
///
/// # Arguments
/// * `data` - VQF file bytes
///
/// # Returns
/// Interleaved audio samples (f32, -1.0 to 1.0) with the transform delay
/// removed. The output runs to the end of the last frame, so it can be up
/// to one frame longer than what was encoded.
pub fn decode(data: &[u8]) -> TvqResult<Vec<f32>> {
    let file = VqfReader::new().read(data)?;
    let mut decoder = FrameTransformDecoder::initialize(&file.header.header_info()?)?;
    let setup = decoder.setup_info()?;
    let frame_bits = setup.frame_bits;
    let skip = setup.overlap * setup.channels;

    let mut reader = BitReader::new(&file.data);
    let mut samples = Vec::with_capacity(file.frame_count()? * setup.frame_size * setup.channels);
    while reader.remaining_bits() >= frame_bits {
        samples.extend(decoder.decode_from(&mut reader)?);
    }

    Ok(samples
        .iter()
        .skip(skip)
        .map(|&s| crate::core::from_codec_range(s))
        .collect())
}

/// Get information about a VQF file
///
/// # Arguments
/// * `data` - VQF file bytes
///
/// # Returns
/// AudioInfo struct with file details
pub fn info(data: &[u8]) -> TvqResult<AudioInfo> {
    let file = VqfReader::new().read(data)?;
    let mode = file.mode()?;
    let total_frames = file.frame_count()?;
    let sample_rate = mode.sample_rate();

    Ok(AudioInfo {
        version: file.header.version.version_id().unwrap_or_default(),
        sample_rate,
        channels: file.header.channels,
        bit_rate: file.header.bit_rate,
        mode: mode.name(),
        frame_size: mode.frame_size,
        total_frames,
        duration_secs: (total_frames * mode.frame_size) as f64 / sample_rate as f64,
        file_size: data.len(),
        security_level: file.header.security_level,
        metadata: file.metadata,
    })
}
