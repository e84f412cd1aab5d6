//! session configuration: what the caller asks for (HeaderInfo,
//! EncSpecificInfo) and what the session settles on (SetupInfo, ConfInfo)

use serde::{Deserialize, Serialize};

use crate::core::{
    BlockType, InterleaveType, TvqError, TvqResult, GAIN_BITS, N_CH_MAX, SUB_GAIN_BITS,
    WINDOW_TYPE_BITS,
};
use crate::mode::{hz_to_rate_class, ModeTable};
use crate::version::{resolve_id, TvqVersion};
use crate::vq::VectorInfo;

/// Structural configuration requested at initialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderInfo {
    /// keyword and version string, e.g. "TWIN97012000"
    pub id: String,
    pub channels: usize,
    /// kbps over all channels
    pub bit_rate: u32,
    /// Hz
    pub sampling_rate: f32,
    /// samples per channel per frame, 0 to take the mode's
    pub frame_size: usize,
    pub security_level: u32,
}

impl HeaderInfo {
    pub fn new(version: TvqVersion, channels: usize, bit_rate: u32, sampling_rate: f32) -> Self {
        HeaderInfo {
            id: version.version_id().unwrap_or_default(),
            channels,
            bit_rate,
            sampling_rate,
            frame_size: 0,
            security_level: 0,
        }
    }

    /// header for a revision's default mode
    pub fn for_version(version: TvqVersion, channels: usize) -> Self {
        let (rate_class, kbps) = version
            .record()
            .map_or((44, 48), |r| r.default_mode);
        let hz = crate::mode::rate_class_to_hz(rate_class).unwrap_or(44100);
        HeaderInfo::new(version, channels, kbps * channels as u32, hz as f32)
    }
}

impl Default for HeaderInfo {
    fn default() -> Self {
        HeaderInfo::for_version(TvqVersion::V2pp, 1)
    }
}

/// Encoder-only tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncSpecificInfo {
    /// first-stage candidates kept for the second-stage search (1..=64)
    pub n_can_global: usize,
    /// allow short/medium blocks on transients
    pub block_switching: bool,
}

impl Default for EncSpecificInfo {
    fn default() -> Self {
        EncSpecificInfo {
            n_can_global: 16,
            block_switching: true,
        }
    }
}

impl EncSpecificInfo {
    pub fn validate(&self) -> TvqResult<()> {
        if !(1..=64).contains(&self.n_can_global) {
            return Err(TvqError::InvalidConfiguration(format!(
                "n_can_global must be 1..=64, got {}",
                self.n_can_global
            )));
        }
        Ok(())
    }
}

/// What a session settled on after initialize.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetupInfo {
    pub version: TvqVersion,
    pub version_id: String,
    pub channels: usize,
    /// kbps over all channels
    pub bit_rate: u32,
    pub sampling_rate: u32,
    pub rate_class: u32,
    pub mode: String,
    pub frame_size: usize,
    /// bits per frame at the nominal bit rate
    pub frame_bits: usize,
    /// transform delay in samples
    pub overlap: usize,
    pub block_types: [BlockType; 3],
    pub interleave_types: [InterleaveType; 4],
}

impl SetupInfo {
    /// validate a header and find its mode
    pub fn negotiate(header: &HeaderInfo) -> TvqResult<(SetupInfo, &'static ModeTable)> {
        let version = resolve_id(header.id.as_bytes());
        let record = version.record().ok_or_else(|| {
            let split = header.id.len().min(4);
            TvqError::UnknownVersion {
                keyword: header.id.get(..split).unwrap_or_default().to_string(),
                version: header.id.get(split..).unwrap_or_default().to_string(),
            }
        })?;

        if header.channels == 0 || header.channels > N_CH_MAX || !record.supports_channels(header.channels) {
            return Err(TvqError::InvalidConfiguration(format!(
                "{} channels not supported",
                header.channels
            )));
        }

        if !header.sampling_rate.is_finite() || header.sampling_rate <= 0.0 {
            return Err(TvqError::InvalidConfiguration(format!(
                "bad sampling rate {}",
                header.sampling_rate
            )));
        }
        let hz = header.sampling_rate.round() as u32;
        let rate_class = hz_to_rate_class(hz).ok_or_else(|| {
            TvqError::InvalidConfiguration(format!("sampling rate {hz} Hz has no rate class"))
        })?;

        let channels = header.channels as u32;
        if header.bit_rate % channels != 0 {
            return Err(TvqError::InvalidConfiguration(format!(
                "bit rate {} kbps doesn't divide over {} channels",
                header.bit_rate, channels
            )));
        }
        let kbps = header.bit_rate / channels;
        if !(8..=48).contains(&kbps) {
            return Err(TvqError::InvalidConfiguration(format!(
                "{kbps} kbps per channel is outside 8..=48"
            )));
        }

        let mode = ModeTable::lookup(rate_class, kbps).ok_or_else(|| {
            TvqError::InvalidConfiguration(format!("no mode for {rate_class} kHz at {kbps} kbps"))
        })?;
        if !record.supports_mode(mode) {
            return Err(TvqError::InvalidConfiguration(format!(
                "mode {} not available in {}",
                mode.name(),
                record.version_id()
            )));
        }
        if header.frame_size != 0 && header.frame_size != mode.frame_size {
            return Err(TvqError::InvalidConfiguration(format!(
                "frame size {} doesn't match mode {} ({})",
                header.frame_size,
                mode.name(),
                mode.frame_size
            )));
        }

        let setup = SetupInfo {
            version,
            version_id: record.version_id(),
            channels: header.channels,
            bit_rate: header.bit_rate,
            sampling_rate: mode.sample_rate(),
            rate_class,
            mode: mode.name(),
            frame_size: mode.frame_size,
            frame_bits: mode.frame_bits(header.bit_rate * 1000),
            overlap: mode.overlap(),
            block_types: BlockType::ALL,
            interleave_types: InterleaveType::ALL,
        };
        Ok((setup, mode))
    }

    /// frames per second
    pub fn frame_rate(&self) -> f64 {
        self.sampling_rate as f64 / self.frame_size as f64
    }
}

/// per block type view of the coder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockConf {
    pub block_type: BlockType,
    /// transform size of one sub-block
    pub block_size: usize,
    pub sub_blocks: usize,
    /// main VQ sub-vectors
    pub main_divisions: usize,
    pub main_bits: usize,
    pub side_bits: usize,
    pub bark_regions: usize,
    pub bark_bits: u8,
    pub bark_env_size: usize,
    pub sub_gain_bits: u8,
    pub ppc_enabled: bool,
}

/// Coder parameters derived from the mode and the current layouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfInfo {
    pub channels: usize,
    pub window_type_bits: u8,
    pub lsp_order: usize,
    pub lsp_hist_bits: u8,
    pub lsp_coarse_bits: u8,
    pub lsp_fine_bits: u8,
    pub lsp_split: usize,
    pub gain_bits: u8,
    pub ppc_divisions: usize,
    pub ppc_period_bits: u8,
    pub ppc_gain_bits: u8,
    pub ppc_shape_len: usize,
    pub blocks: Vec<BlockConf>,
}

impl ConfInfo {
    pub fn build(mode: &ModeTable, channels: usize, vectors: &VectorInfo) -> Self {
        let blocks = BlockType::ALL
            .iter()
            .map(|&bt| {
                let geometry = mode.block(bt);
                let layout = vectors.layout(bt.interleave());
                BlockConf {
                    block_type: bt,
                    block_size: mode.block_size(bt),
                    sub_blocks: geometry.sub_blocks,
                    main_divisions: layout.ndiv(),
                    main_bits: layout.total_bits,
                    side_bits: mode.side_bits(channels, bt),
                    bark_regions: geometry.bark_n_coef,
                    bark_bits: geometry.bark_n_bit,
                    bark_env_size: geometry.bark_env_size,
                    sub_gain_bits: if bt == BlockType::Long { 0 } else { SUB_GAIN_BITS },
                    ppc_enabled: bt == BlockType::Long,
                }
            })
            .collect();

        ConfInfo {
            channels,
            window_type_bits: WINDOW_TYPE_BITS,
            lsp_order: mode.lsp.n_lsp,
            lsp_hist_bits: mode.lsp.bit0,
            lsp_coarse_bits: mode.lsp.bit1,
            lsp_fine_bits: mode.lsp.bit2,
            lsp_split: mode.lsp.split,
            gain_bits: GAIN_BITS,
            ppc_divisions: vectors.layout(InterleaveType::Ppc).ndiv(),
            ppc_period_bits: mode.ppc.period_bit,
            ppc_gain_bits: mode.ppc.pgain_bit,
            ppc_shape_len: mode.ppc.shape_len,
            blocks,
        }
    }
}
