//! streaming encode/decode for VQF
//!
//! frame at a time encoding and incremental decoding for network streaming
mod decoder;
mod encoder;
mod types;

pub use decoder::StreamingDecoder;
pub use encoder::{EncodedFrame, StreamingEncoder};
pub use types::{DecoderState, StreamingAudioInfo};

#[cfg(test)]
mod tests;
