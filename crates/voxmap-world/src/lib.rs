pub mod backend;
pub mod error;
pub mod players;
pub mod poi;
pub mod settings;
pub mod traversal;

pub use backend::{open_backend, supported_backends, Backend, BackendKind, Block, BlockStore};
pub use error::StorageError;
pub use settings::WorldSettings;
pub use traversal::{ExhaustiveMode, Strategy};
