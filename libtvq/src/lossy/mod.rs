//! Transform coder for twinvq frames
//!
//! MDCT with block switching, gain and envelope normalization, periodic
//! peak extraction and two-stage VQ of what remains.

pub mod decoder;
pub mod encoder;
pub mod envelope;
pub mod mdct;
pub mod ppc;

// Re-export main types
pub use decoder::FrameTransformDecoder;
pub use encoder::FrameTransformEncoder;
pub use envelope::{BarkHistory, FrameEnvelope};
pub use mdct::{Mdct, MdctTransform};
