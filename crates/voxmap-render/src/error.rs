use std::path::PathBuf;

use voxmap_core::CoreError;
use voxmap_persist::DecodeError;
use voxmap_world::StorageError;

/// Errors that can occur while producing a map image.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("invalid color '{0}': {1}")]
    InvalidColorSpec(String, &'static str),

    #[error("invalid geometry '{0}'")]
    InvalidGeometry(String),

    #[error("invalid scale sides '{0}' (expected letters from t, b, l, r)")]
    InvalidScales(String),

    #[error("failed to decode block {pos}: {source}")]
    Decode {
        pos: voxmap_core::BlockPos,
        #[source]
        source: DecodeError,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("no blocks found in the requested area")]
    EmptyWorld,

    #[error("failed to write image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<CoreError> for RenderError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidColorSpec(spec, reason) => Self::InvalidColorSpec(spec, reason),
            CoreError::InvalidGeometry(spec) | CoreError::InvalidBlockPos(spec) => {
                Self::InvalidGeometry(spec)
            }
        }
    }
}
