//! retvq - audio converter library for TwinVQ VQF files
//!
//! Reads common audio formats through symphonia, encodes them with
//! libtvq and writes decoded VQF audio back out as 16-bit WAV.

pub mod audio;

use anyhow::{bail, Context, Result};
use libtvq::mode::{hz_to_rate_class, ModeTable, MODES};
use libtvq::{CodecSession, Decoder, VqfReader};

/// Re-export libtvq types
pub use libtvq::{AudioInfo as VqfInfo, ConfInfo, SetupInfo, VqfMetadata};

/// Get information about a VQF file
pub fn get_vqf_info(data: &[u8]) -> Result<VqfInfo> {
    libtvq::info(data).map_err(|e| anyhow::anyhow!("Failed to read VQF file: {}", e))
}

/// Configuration a decoder session settles on for a VQF file
pub fn get_session_config(data: &[u8]) -> Result<(SetupInfo, ConfInfo)> {
    let tvq_err = |e: libtvq::TvqError| anyhow::anyhow!("Invalid VQF file: {}", e);

    let file = VqfReader::new().read(data).map_err(tvq_err)?;
    let decoder = Decoder::initialize(&file.header.header_info().map_err(tvq_err)?)
        .map_err(tvq_err)?;

    Ok((
        decoder.setup_info().map_err(tvq_err)?,
        decoder.conf_info().map_err(tvq_err)?,
    ))
}

/// Check that a VQF file parses and every frame decodes
pub fn validate_vqf(data: &[u8]) -> Result<bool> {
    let info = get_vqf_info(data)?;
    match libtvq::decode(data) {
        Ok(samples) => Ok(info.total_frames == 0 || !samples.is_empty()),
        Err(e) => {
            log::warn!("decode failed: {}", e);
            Ok(false)
        }
    }
}

/// Encoding options for converting audio to VQF
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    /// Total bitrate in kbps over all channels. `None` picks the highest
    /// rate the sampling rate supports.
    pub bitrate: Option<u32>,
    /// Metadata to embed, replaces tags read from the source
    pub metadata: Option<VqfMetadata>,
}

impl EncodeOptions {
    /// Options with a fixed total bitrate
    pub fn with_bitrate(bitrate: u32) -> Self {
        Self {
            bitrate: Some(bitrate),
            ..Default::default()
        }
    }

    /// Set metadata to embed in the file
    pub fn with_metadata(mut self, metadata: VqfMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Modes usable at a sampling rate
pub fn supported_modes(sample_rate: u32) -> Vec<&'static ModeTable> {
    match hz_to_rate_class(sample_rate) {
        Some(class) => MODES.iter().filter(|m| m.rate_class == class).collect(),
        None => Vec::new(),
    }
}

/// Highest total bitrate available for a sampling rate and channel count
pub fn default_bitrate(sample_rate: u32, channels: usize) -> Option<u32> {
    supported_modes(sample_rate)
        .iter()
        .map(|m| m.kbps)
        .max()
        .map(|kbps| kbps * channels as u32)
}

/// Information about a source audio file
#[derive(Debug, Clone)]
pub struct AudioInfo {
    pub sample_rate: u32,
    pub channels: usize,
    pub duration_secs: f64,
}

/// Encode audio file bytes to VQF
///
/// # Arguments
/// * `audio_bytes` - Raw bytes of an audio file (MP3, WAV, FLAC, OGG, etc.)
/// * `options` - Encoding options
///
/// # Returns
/// Raw bytes of the VQF file
pub fn encode_from_audio(audio_bytes: &[u8], options: EncodeOptions) -> Result<Vec<u8>> {
    let source = audio::read_audio_from_bytes(audio_bytes).context("Failed to read audio file")?;

    encode_from_samples(
        &source.samples,
        source.sample_rate,
        source.channels,
        source.metadata,
        options,
    )
}

/// Encode raw audio samples to VQF
///
/// # Arguments
/// * `samples` - Interleaved f32 samples in range [-1.0, 1.0]
/// * `sample_rate` - Sample rate in Hz, must match a VQF mode
/// * `channels` - 1 or 2
/// * `source_metadata` - Tags to keep when `options` carries none
/// * `options` - Encoding options
pub fn encode_from_samples(
    samples: &[f32],
    sample_rate: u32,
    channels: usize,
    source_metadata: audio::AudioMetadata,
    options: EncodeOptions,
) -> Result<Vec<u8>> {
    if !(1..=2).contains(&channels) {
        bail!("VQF holds mono or stereo audio, got {} channels", channels);
    }
    let Some(max_bitrate) = default_bitrate(sample_rate, channels) else {
        bail!(
            "No VQF mode for {} Hz (supported: 8000, 11025, 16000, 22050, 44100)",
            sample_rate
        );
    };
    let bitrate = options.bitrate.unwrap_or(max_bitrate);

    let meta = options.metadata.unwrap_or_else(|| {
        let mut m = VqfMetadata::with_basic(
            source_metadata.title,
            source_metadata.artist,
            source_metadata.comment,
        );
        if let Some(c) = source_metadata.copyright {
            m.set("(c) ", &c);
        }
        m
    });

    log::info!(
        "encoding {} samples at {} Hz, {} ch, {} kbps",
        samples.len(),
        sample_rate,
        channels,
        bitrate
    );

    libtvq::encode(samples, sample_rate, channels, bitrate, Some(&meta))
        .map_err(|e| anyhow::anyhow!("Encoding failed: {}", e))
}

/// Decode VQF file to raw samples
///
/// # Returns
/// Tuple of (samples, sample_rate, channels) where samples are interleaved f32
pub fn decode_to_samples(vqf_bytes: &[u8]) -> Result<(Vec<f32>, u32, usize)> {
    let info = get_vqf_info(vqf_bytes)?;
    let samples =
        libtvq::decode(vqf_bytes).map_err(|e| anyhow::anyhow!("Decoding failed: {}", e))?;

    Ok((samples, info.sample_rate, info.channels))
}

/// Decode VQF file to 16-bit WAV bytes
pub fn decode_to_wav(vqf_bytes: &[u8]) -> Result<Vec<u8>> {
    let (samples, sample_rate, channels) = decode_to_samples(vqf_bytes)?;

    audio::write_wav_to_bytes(&samples, sample_rate, channels).context("Failed to write WAV data")
}

/// Text chunks of a VQF file, `None` when it has none
pub fn get_metadata(vqf_bytes: &[u8]) -> Result<Option<VqfMetadata>> {
    let info = get_vqf_info(vqf_bytes)?;
    if info.metadata.is_empty() {
        return Ok(None);
    }
    Ok(Some(info.metadata))
}

/// Get information about a source audio file
///
/// # Arguments
/// * `audio_bytes` - Raw bytes of an audio file (MP3, WAV, FLAC, OGG, etc.)
pub fn get_audio_info(audio_bytes: &[u8]) -> Result<AudioInfo> {
    let source = audio::read_audio_from_bytes(audio_bytes).context("Failed to read audio file")?;

    Ok(AudioInfo {
        sample_rate: source.sample_rate,
        channels: source.channels,
        duration_secs: source.duration_secs(),
    })
}
