use log::trace;

use super::envelope::{
    bark_edges, bark_gains, mulaw_decode, mulaw_encode, region_target, BarkHistory,
    FrameEnvelope, GAIN_MAX, GAIN_MU, SUB_GAIN_MAX, SUB_GAIN_MU,
};
use super::mdct::Mdct;
use super::ppc;
use crate::config::{EncSpecificInfo, HeaderInfo};
use crate::core::{
    BitWriter, BlockType, TvqError, TvqResult, WindowType, GAIN_BITS, INDEX_CAPACITY,
    SUB_GAIN_BITS,
};
use crate::mode::ModeTable;
use crate::session::{CodecSession, SessionState};
use crate::vq::{codebook, ChannelIndex, CodeBuffer, FrameLayout, Index, IndexCodec};

/// segment energy below this counts as silence for transient detection
const TRANSIENT_FLOOR: f32 = 100.0;
/// segment-to-segment energy jump that forces short blocks
const SHORT_ATTACK: f32 = 30.0;
/// jump that forces medium blocks
const MEDIUM_ATTACK: f32 = 8.0;

/// Transform encoder session
///
/// Each `encode_frame` call takes one frame of interleaved samples in the
/// 16-bit range and returns its Index.
pub struct FrameTransformEncoder {
    state: SessionState,
    enc_info: EncSpecificInfo,
    /// None once terminated
    core: Option<EncoderCore>,
}

/// everything a frame call mutates besides the session counters
#[derive(Clone)]
struct EncoderCore {
    mdct: Mdct,
    envelopes: Vec<FrameEnvelope>,
    bark: BarkHistory,
    previous_block: BlockType,
    last_energy: f32,
}

impl FrameTransformEncoder {
    /// Open an encoder session
    pub fn initialize(header: &HeaderInfo, enc_info: &EncSpecificInfo) -> TvqResult<Self> {
        enc_info.validate()?;
        let state = SessionState::open(header)?;
        let mode = state.mode()?;
        let channels = state.setup()?.channels;

        Ok(Self {
            core: Some(EncoderCore {
                mdct: Mdct::for_mode(mode, channels),
                envelopes: vec![FrameEnvelope::flat(mode.lsp.split); channels],
                bark: BarkHistory::new(&mode.blocks, channels),
                previous_block: BlockType::Long,
                last_energy: 0.0,
            }),
            state,
            enc_info: enc_info.clone(),
        })
    }

    pub fn enc_specific_info(&self) -> TvqResult<&EncSpecificInfo> {
        self.state.ensure_open()?;
        Ok(&self.enc_info)
    }

    /// Encode one frame (frame_size * channels interleaved samples).
    ///
    /// On error the session is left exactly as it was.
    pub fn encode_frame(&mut self, samples: &[f32]) -> TvqResult<Index> {
        self.state.ensure_open()?;
        let core = self.core.as_ref().ok_or(TvqError::SessionClosed)?;
        let mode = self.state.mode()?;
        let channels = self.state.setup()?.channels;

        let expected = mode.frame_size * channels;
        if samples.len() != expected {
            return Err(TvqError::LayoutMismatch(format!(
                "{} samples for a frame of {expected}",
                samples.len()
            )));
        }

        let mut next = core.clone();
        let block_type = if self.enc_info.block_switching {
            next.detect_block_type(samples, channels, mode)
        } else {
            BlockType::Long
        };
        let window_type = WindowType::select(next.previous_block, block_type);
        let layout = self.state.frame_layout(block_type)?;

        let coeffs = next.mdct.analyze(samples, block_type);
        let index = next.quantize(&coeffs, window_type, &layout, mode, self.enc_info.n_can_global)?;
        IndexCodec::validate(&index, &layout)?;

        trace!(
            "frame {} {:?} ({:?})",
            self.state.num_frames().unwrap_or_default(),
            block_type,
            window_type
        );

        next.previous_block = block_type;
        self.core = Some(next);
        self.state.commit_frame(layout.total_bits());
        Ok(index)
    }

    /// Encode one frame straight into a bit stream, returns bits written.
    pub fn encode_frame_into(&mut self, samples: &[f32], writer: &mut BitWriter) -> TvqResult<usize> {
        let index = self.encode_frame(samples)?;
        let layout = self.state.frame_layout(index.block_type())?;
        IndexCodec::write(&index, &layout, writer)
    }

    /// Release the transform state; later calls fail with SessionClosed
    pub fn terminate(&mut self) -> TvqResult<()> {
        self.state.terminate()?;
        self.core = None;
        Ok(())
    }
}

impl CodecSession for FrameTransformEncoder {
    fn state(&self) -> &SessionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }
}

impl EncoderCore {
    /// pick a block type from energy jumps across the frame's segments
    fn detect_block_type(&mut self, samples: &[f32], channels: usize, mode: &ModeTable) -> BlockType {
        let segments = mode.block(BlockType::Short).sub_blocks;
        let seg_len = mode.frame_size / segments;

        let mut attack = 0.0f32;
        let mut previous = self.last_energy;
        for seg in samples.chunks(seg_len * channels) {
            let energy = seg.iter().map(|s| s * s).sum::<f32>() / seg.len().max(1) as f32;
            if energy > TRANSIENT_FLOOR {
                attack = attack.max(energy / previous.max(TRANSIENT_FLOOR));
            }
            previous = energy;
        }
        self.last_energy = previous;

        if attack >= SHORT_ATTACK {
            BlockType::Short
        } else if attack >= MEDIUM_ATTACK {
            BlockType::Medium
        } else {
            BlockType::Long
        }
    }

    /// Quantize one frame of coefficients into an Index, updating the
    /// envelope histories the way the decoder will.
    fn quantize(
        &mut self,
        coeffs: &[Vec<f32>],
        window_type: WindowType,
        layout: &FrameLayout,
        mode: &ModeTable,
        n_can: usize,
    ) -> TvqResult<Index> {
        let block_type = layout.block_type;
        let n = mode.frame_size;
        let m = mode.block_size(block_type);
        let split = mode.lsp.split;
        let norm = (m as f32 / 2.0).sqrt();
        let edges = bark_edges(m, layout.bark_n_coef);
        let shape_len = mode.ppc.shape_len;

        let mut main_target = vec![0.0f32; layout.channels * n];
        let mut ppc_target = vec![0.0f32; layout.channels * shape_len];
        let mut channels = Vec::with_capacity(layout.channels);

        for (ch, ch_coeffs) in coeffs.iter().enumerate() {
            let mut x: Vec<f32> = ch_coeffs.iter().map(|c| c / norm).collect();
            let mut side = ChannelIndex::default();

            // frame gain
            let rms = (x.iter().map(|v| v * v).sum::<f32>() / n as f32).sqrt();
            side.gain = mulaw_encode(rms, GAIN_MAX, GAIN_MU, GAIN_BITS);
            let gain = mulaw_decode(side.gain, GAIN_MAX, GAIN_MU, GAIN_BITS);

            // sub-block gains
            for block in x.chunks_mut(m) {
                let mut scale = gain;
                if block_type != BlockType::Long {
                    let sub_rms = (block.iter().map(|v| v * v).sum::<f32>() / m as f32).sqrt();
                    let ratio = if gain > 0.0 { sub_rms / gain } else { 0.0 };
                    let code = mulaw_encode(ratio, SUB_GAIN_MAX, SUB_GAIN_MU, SUB_GAIN_BITS);
                    side.sub_gains.push(code);
                    scale *= mulaw_decode(code, SUB_GAIN_MAX, SUB_GAIN_MU, SUB_GAIN_BITS);
                }
                for v in block.iter_mut() {
                    *v = if scale > 0.0 { *v / scale } else { 0.0 };
                }
            }

            // frame envelope over `split` equal frequency regions
            let mut energy = vec![0.0f32; split];
            let mut count = vec![0usize; split];
            for (k, v) in x.iter().enumerate() {
                let region = ((k % m) * split / m).min(split - 1);
                energy[region] += v * v;
                count[region] += 1;
            }
            let targets: Vec<f32> = energy
                .iter()
                .zip(&count)
                .map(|(&e, &c)| region_target((e / c.max(1) as f32).sqrt()))
                .collect();
            let (env_codes, envelope) =
                FrameEnvelope::encode(&targets, &mode.lsp, &self.envelopes[ch]);
            let env_gains = envelope.gains(m);
            for (k, v) in x.iter_mut().enumerate() {
                *v /= env_gains[k % m];
            }
            self.envelopes[ch] = envelope;
            side.env_hist = env_codes.hist;
            side.env_coarse = env_codes.coarse;
            side.env_fine = env_codes.fine;

            // bark envelope per sub-block
            for block in x.chunks_mut(m) {
                let targets: Vec<f32> = edges
                    .windows(2)
                    .map(|w| {
                        let region = &block[w[0]..w[1]];
                        let e = region.iter().map(|v| v * v).sum::<f32>() / region.len().max(1) as f32;
                        region_target(e.sqrt())
                    })
                    .collect();
                let (codes, use_hist, levels) =
                    self.bark.encode(block_type, ch, &targets, layout.bark_n_bit);
                let gains = bark_gains(&levels, &edges);
                for (v, g) in block.iter_mut().zip(&gains) {
                    *v /= g;
                }
                side.bark.push(codes);
                side.bark_use_hist.push(use_hist);
            }

            if layout.ppc.is_some() {
                let choice = ppc::analyze(&x, mode);
                ppc_target[ch * shape_len..(ch + 1) * shape_len].copy_from_slice(&choice.shape);
                side.ppc_period = choice.period_code;
                side.ppc_gain = choice.gain_code;
            }

            main_target[ch * n..(ch + 1) * n].copy_from_slice(&x);
            channels.push(side);
        }

        let mut ppc_codes = CodeBuffer::with_capacity(INDEX_CAPACITY);
        if let Some(ppc_layout) = &layout.ppc {
            codebook::quantize(&ppc_target, ppc_layout, n_can, &mut ppc_codes)?;

            // the main VQ codes what the decoded comb leaves behind
            let mut shapes = vec![0.0f32; layout.channels * shape_len];
            codebook::dequantize(ppc_codes.as_slice(), ppc_layout, &mut shapes);
            for (ch, side) in channels.iter().enumerate() {
                let mut comb = vec![0.0f32; n];
                ppc::synthesize(
                    &mut comb,
                    &shapes[ch * shape_len..(ch + 1) * shape_len],
                    side.ppc_period,
                    side.ppc_gain,
                    mode,
                );
                for (t, c) in main_target[ch * n..(ch + 1) * n].iter_mut().zip(&comb) {
                    *t -= c;
                }
            }
        }

        let mut main_codes = CodeBuffer::with_capacity(INDEX_CAPACITY);
        codebook::quantize(&main_target, &layout.main, n_can, &mut main_codes)?;

        Ok(Index {
            window_type,
            main: main_codes,
            ppc: ppc_codes,
            channels,
            stage_widths: layout.stage_widths(),
        })
    }
}
