//! error type shared by every part of the codec

use thiserror::Error;

/// Everything that can go wrong inside libtvq.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TvqError {
    /// bad header, channel count or mode at initialize
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("unknown version {keyword:?}/{version:?}")]
    UnknownVersion { keyword: String, version: String },

    /// the bit budget can't give every sub-vector one bit
    #[error("insufficient bits: {required} required, {available} available")]
    InsufficientBits { required: usize, available: usize },

    /// a fixed-capacity buffer would overflow
    #[error("buffer overflow: {required} slots required, capacity {capacity}")]
    BufferOverflow { required: usize, capacity: usize },

    /// an Index does not agree with the session's layout
    #[error("layout mismatch: {0}")]
    LayoutMismatch(String),

    #[error("session closed")]
    SessionClosed,

    #[error("invalid window type {0}")]
    InvalidWindowType(u8),

    /// malformed VQF container
    #[error("container: {0}")]
    Container(String),

    #[error("unexpected end of data: need {needed} bytes at offset {offset}")]
    UnexpectedEof { needed: usize, offset: usize },
}

impl TvqError {
    /// true for errors the caller can get past by adjusting the bit budget
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TvqError::BufferOverflow { .. } | TvqError::InsufficientBits { .. }
        )
    }
}

/// result type for libtvq
pub type TvqResult<T> = Result<T, TvqError>;
