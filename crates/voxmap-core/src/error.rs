use thiserror::Error;

/// Errors raised while interpreting user-facing map options.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid geometry '{0}' (expected x:y+w+h with w, h >= 1)")]
    InvalidGeometry(String),

    #[error("invalid color '{0}': {1}")]
    InvalidColorSpec(String, &'static str),

    #[error("invalid block position '{0}' (expected x,y,z)")]
    InvalidBlockPos(String),
}
