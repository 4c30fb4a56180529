//! Block storage backends.
//!
//! Every world keeps its map blocks in one of four stores. They differ in
//! which query shapes are cheap: SQL stores answer range queries through an
//! index, key-value stores only know how to fetch single keys and are
//! scanned once at open to build a position index.

mod index;
pub mod sqlite;

#[cfg(feature = "leveldb")]
pub mod leveldb;
#[cfg(feature = "postgresql")]
pub mod postgres;
#[cfg(feature = "redis")]
pub mod redis;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use voxmap_core::BlockPos;

use crate::error::StorageError;
use crate::settings::WorldSettings;

pub use index::PositionIndex;

/// A block position with its raw serialized data.
pub type Block = (BlockPos, Vec<u8>);

/// Query interface shared by every backend.
pub trait BlockStore {
    /// Positions of all stored blocks with `min <= pos < max` on every axis.
    fn positions_in_range(
        &mut self,
        min: BlockPos,
        max: BlockPos,
    ) -> Result<Vec<BlockPos>, StorageError>;

    /// Blocks at column `(x, z)` with `min_y <= y < max_y`, in no particular order.
    fn blocks_in_column(
        &mut self,
        x: i16,
        z: i16,
        min_y: i16,
        max_y: i16,
    ) -> Result<Vec<Block>, StorageError>;

    /// Fetch the given positions. Positions without a stored block are omitted.
    fn blocks_at(&mut self, positions: &[BlockPos]) -> Result<Vec<Block>, StorageError>;

    /// Whether range queries are cheaper than probing positions one by one.
    fn prefers_range_queries(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Sqlite3,
    LevelDb,
    Redis,
    PostgreSql,
}

impl BackendKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Sqlite3 => "sqlite3",
            Self::LevelDb => "leveldb",
            Self::Redis => "redis",
            Self::PostgreSql => "postgresql",
        }
    }

    /// Whether support for this backend was compiled in.
    pub fn is_supported(self) -> bool {
        match self {
            Self::Sqlite3 => true,
            Self::LevelDb => cfg!(feature = "leveldb"),
            Self::Redis => cfg!(feature = "redis"),
            Self::PostgreSql => cfg!(feature = "postgresql"),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sqlite3" => Ok(Self::Sqlite3),
            "leveldb" => Ok(Self::LevelDb),
            "redis" => Ok(Self::Redis),
            "postgresql" => Ok(Self::PostgreSql),
            other => Err(StorageError::UnknownBackendKind(other.to_string())),
        }
    }
}

/// Names of the backends this build can open.
pub fn supported_backends() -> Vec<&'static str> {
    [
        BackendKind::Sqlite3,
        BackendKind::LevelDb,
        BackendKind::PostgreSql,
        BackendKind::Redis,
    ]
    .into_iter()
    .filter(|kind| kind.is_supported())
    .map(BackendKind::name)
    .collect()
}

/// An opened store of any kind.
pub enum Backend {
    Sqlite(sqlite::SqliteStore),
    #[cfg(feature = "leveldb")]
    LevelDb(leveldb::LevelDbStore),
    #[cfg(feature = "redis")]
    Redis(redis::RedisStore),
    #[cfg(feature = "postgresql")]
    Postgres(postgres::PostgresStore),
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Sqlite(_) => BackendKind::Sqlite3,
            #[cfg(feature = "leveldb")]
            Self::LevelDb(_) => BackendKind::LevelDb,
            #[cfg(feature = "redis")]
            Self::Redis(_) => BackendKind::Redis,
            #[cfg(feature = "postgresql")]
            Self::Postgres(_) => BackendKind::PostgreSql,
        }
    }

    fn store(&mut self) -> &mut dyn BlockStore {
        match self {
            Self::Sqlite(s) => s,
            #[cfg(feature = "leveldb")]
            Self::LevelDb(s) => s,
            #[cfg(feature = "redis")]
            Self::Redis(s) => s,
            #[cfg(feature = "postgresql")]
            Self::Postgres(s) => s,
        }
    }
}

impl BlockStore for Backend {
    fn positions_in_range(
        &mut self,
        min: BlockPos,
        max: BlockPos,
    ) -> Result<Vec<BlockPos>, StorageError> {
        self.store().positions_in_range(min, max)
    }

    fn blocks_in_column(
        &mut self,
        x: i16,
        z: i16,
        min_y: i16,
        max_y: i16,
    ) -> Result<Vec<Block>, StorageError> {
        self.store().blocks_in_column(x, z, min_y, max_y)
    }

    fn blocks_at(&mut self, positions: &[BlockPos]) -> Result<Vec<Block>, StorageError> {
        self.store().blocks_at(positions)
    }

    fn prefers_range_queries(&self) -> bool {
        match self {
            Self::Sqlite(s) => s.prefers_range_queries(),
            #[cfg(feature = "leveldb")]
            Self::LevelDb(s) => s.prefers_range_queries(),
            #[cfg(feature = "redis")]
            Self::Redis(s) => s.prefers_range_queries(),
            #[cfg(feature = "postgresql")]
            Self::Postgres(s) => s.prefers_range_queries(),
        }
    }
}

/// Open the map store of a world.
///
/// Without an explicit `kind` the `backend` key of `world.mt` decides,
/// defaulting to `sqlite3`. An explicit kind skips `world.mt` unless the
/// backend itself needs connection settings from it.
pub fn open_backend(world_dir: &Path, kind: Option<BackendKind>) -> Result<Backend, StorageError> {
    let kind = match kind {
        Some(kind) => kind,
        None => WorldSettings::load(world_dir)?
            .get_or("backend", BackendKind::Sqlite3.name())
            .parse()?,
    };
    if !kind.is_supported() {
        return Err(StorageError::UnknownBackendKind(kind.name().to_string()));
    }
    log::debug!("Opening {} backend in {}", kind, world_dir.display());

    match kind {
        BackendKind::Sqlite3 => Ok(Backend::Sqlite(sqlite::SqliteStore::open(world_dir)?)),
        #[cfg(feature = "leveldb")]
        BackendKind::LevelDb => Ok(Backend::LevelDb(leveldb::LevelDbStore::open(world_dir)?)),
        #[cfg(feature = "redis")]
        BackendKind::Redis => {
            let settings = WorldSettings::load(world_dir)?;
            Ok(Backend::Redis(redis::RedisStore::open(&settings)?))
        }
        #[cfg(feature = "postgresql")]
        BackendKind::PostgreSql => {
            let settings = WorldSettings::load(world_dir)?;
            Ok(Backend::Postgres(postgres::PostgresStore::open(&settings)?))
        }
        #[allow(unreachable_patterns)]
        other => Err(StorageError::UnknownBackendKind(other.name().to_string())),
    }
}
