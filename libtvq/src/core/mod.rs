pub mod audio_constants;
pub mod bits;
pub mod error;
pub mod tables;
pub mod types;

pub use audio_constants::*;
pub use bits::{BitReader, BitWriter};
pub use error::{TvqError, TvqResult};
pub use tables::{
    fractional_level, level_gain, MAX_LEVEL, MIN_LEVEL, REFERENCE_STEP,
    STEP_SIZES,
};
pub use types::*;
