use log::trace;

use super::envelope::{
    bark_edges, bark_gains, mulaw_decode, BarkHistory, EnvelopeCodes, FrameEnvelope, GAIN_MAX,
    GAIN_MU, SUB_GAIN_MAX, SUB_GAIN_MU,
};
use super::mdct::Mdct;
use super::ppc;
use crate::config::HeaderInfo;
use crate::core::{BitReader, BlockType, TvqError, TvqResult, GAIN_BITS, SUB_GAIN_BITS};
use crate::mode::ModeTable;
use crate::session::{CodecSession, SessionState};
use crate::vq::{codebook, FrameLayout, Index, IndexCodec};

/// Transform decoder session
pub struct FrameTransformDecoder {
    state: SessionState,
    /// None once terminated
    core: Option<DecoderCore>,
}

#[derive(Clone)]
struct DecoderCore {
    mdct: Mdct,
    envelopes: Vec<FrameEnvelope>,
    bark: BarkHistory,
}

impl FrameTransformDecoder {
    /// Open a decoder session
    pub fn initialize(header: &HeaderInfo) -> TvqResult<Self> {
        let state = SessionState::open(header)?;
        let mode = state.mode()?;
        let channels = state.setup()?.channels;

        Ok(Self {
            core: Some(DecoderCore {
                mdct: Mdct::for_mode(mode, channels),
                envelopes: vec![FrameEnvelope::flat(mode.lsp.split); channels],
                bark: BarkHistory::new(&mode.blocks, channels),
            }),
            state,
        })
    }

    /// Decode one Index into frame_size * channels interleaved samples.
    ///
    /// An Index that doesn't match the current layout is rejected and the
    /// session is left untouched.
    pub fn decode_frame(&mut self, index: &Index) -> TvqResult<Vec<f32>> {
        self.state.ensure_open()?;
        let core = self.core.as_ref().ok_or(TvqError::SessionClosed)?;
        let mode = self.state.mode()?;
        let layout = self.state.frame_layout(index.block_type())?;
        IndexCodec::validate(index, &layout)?;

        let mut next = core.clone();
        let coeffs = next.dequantize(index, &layout, mode);
        let samples = next.mdct.synthesize(&coeffs, layout.block_type);

        trace!(
            "frame {} {:?}",
            self.state.num_frames().unwrap_or_default(),
            index.window_type
        );

        self.core = Some(next);
        self.state.commit_frame(layout.total_bits());
        Ok(samples)
    }

    /// Read the next Index from a bit stream using the current layouts.
    pub fn read_index(&self, reader: &mut BitReader<'_>) -> TvqResult<Index> {
        self.state.ensure_open()?;
        IndexCodec::read(reader, |block_type| self.state.frame_layout(block_type))
    }

    /// Read and decode one frame from a bit stream.
    pub fn decode_from(&mut self, reader: &mut BitReader<'_>) -> TvqResult<Vec<f32>> {
        let index = self.read_index(reader)?;
        self.decode_frame(&index)
    }

    /// Decode one frame stored on its own in `data`
    pub fn decode_bytes(&mut self, data: &[u8]) -> TvqResult<Vec<f32>> {
        let mut reader = BitReader::new(data);
        self.decode_from(&mut reader)
    }

    /// Release the transform state; later calls fail with SessionClosed
    pub fn terminate(&mut self) -> TvqResult<()> {
        self.state.terminate()?;
        self.core = None;
        Ok(())
    }
}

impl CodecSession for FrameTransformDecoder {
    fn state(&self) -> &SessionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }
}

impl DecoderCore {
    /// rebuild every channel's coefficients from an Index
    fn dequantize(&mut self, index: &Index, layout: &FrameLayout, mode: &ModeTable) -> Vec<Vec<f32>> {
        let block_type = layout.block_type;
        let n = mode.frame_size;
        let m = mode.block_size(block_type);
        let norm = (m as f32 / 2.0).sqrt();
        let edges = bark_edges(m, layout.bark_n_coef);
        let shape_len = mode.ppc.shape_len;

        let mut spectrum = vec![0.0f32; layout.channels * n];
        codebook::dequantize(index.main.as_slice(), &layout.main, &mut spectrum);

        let mut shapes = vec![0.0f32; layout.channels * shape_len];
        if let Some(ppc_layout) = &layout.ppc {
            codebook::dequantize(index.ppc.as_slice(), ppc_layout, &mut shapes);
        }

        let mut coeffs = Vec::with_capacity(layout.channels);
        for (ch, side) in index.channels.iter().enumerate() {
            let mut x = spectrum[ch * n..(ch + 1) * n].to_vec();

            if layout.ppc.is_some() {
                ppc::synthesize(
                    &mut x,
                    &shapes[ch * shape_len..(ch + 1) * shape_len],
                    side.ppc_period,
                    side.ppc_gain,
                    mode,
                );
            }

            for ((block, codes), &use_hist) in x
                .chunks_mut(m)
                .zip(&side.bark)
                .zip(&side.bark_use_hist)
            {
                let levels = self
                    .bark
                    .decode(block_type, ch, codes, use_hist, layout.bark_n_bit);
                for (v, g) in block.iter_mut().zip(&bark_gains(&levels, &edges)) {
                    *v *= g;
                }
            }

            let env_codes = EnvelopeCodes {
                hist: side.env_hist,
                coarse: side.env_coarse,
                fine: side.env_fine.clone(),
            };
            let envelope = FrameEnvelope::decode(&env_codes, &mode.lsp, &self.envelopes[ch]);
            let env_gains = envelope.gains(m);
            self.envelopes[ch] = envelope;

            let gain = mulaw_decode(side.gain, GAIN_MAX, GAIN_MU, GAIN_BITS);
            for (j, block) in x.chunks_mut(m).enumerate() {
                let mut scale = gain * norm;
                if block_type != BlockType::Long {
                    let code = side.sub_gains.get(j).copied().unwrap_or(0);
                    scale *= mulaw_decode(code, SUB_GAIN_MAX, SUB_GAIN_MU, SUB_GAIN_BITS);
                }
                for (v, g) in block.iter_mut().zip(&env_gains) {
                    *v *= g * scale;
                }
            }

            coeffs.push(x);
        }
        coeffs
    }
}
