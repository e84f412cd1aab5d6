//! Vector quantization: bit allocation, codebooks and the Index layout.

pub mod allocator;
pub mod codebook;
pub mod index;

pub use allocator::{ChannelLayout, VectorBitAllocator, VectorInfo, VectorLayout};
pub use index::{ChannelIndex, CodeBuffer, FrameLayout, Index, IndexCodec};
