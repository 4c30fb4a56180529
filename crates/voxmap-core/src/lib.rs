pub mod constants;
pub mod error;
pub mod geometry;
pub mod pos;
pub mod types;

pub use error::CoreError;
pub use geometry::{Geometry, HeightRange};
pub use pos::BlockPos;
pub use types::Color;
