use std::path::PathBuf;

/// Errors that can occur while reading a world's storage.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to open {backend} backend: {reason}")]
    BackendOpenFailure {
        backend: &'static str,
        reason: String,
    },

    #[error("{backend} query failed: {reason}")]
    BackendQueryFailure {
        backend: &'static str,
        reason: String,
    },

    /// SQLite reported the database as busy. Retried internally, never
    /// returned from a store operation.
    #[error("database is busy")]
    TransientBackendBusy,

    #[error("unknown map backend: {0}")]
    UnknownBackendKind(String),

    #[error("setting '{0}' not found in world.mt")]
    MissingSetting(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
