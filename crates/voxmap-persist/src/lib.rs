pub mod compress;
pub mod decoder;
#[cfg(any(test, feature = "test-util"))]
pub mod encode;
pub mod error;
pub mod format;

mod reader;

pub use decoder::{BlockDecoder, DecoderState};
#[cfg(any(test, feature = "test-util"))]
pub use encode::BlockBuilder;
pub use error::DecodeError;
