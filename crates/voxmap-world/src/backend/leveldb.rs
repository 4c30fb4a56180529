//! `map.db` LevelDB store.
//!
//! Keys are the packed position in decimal, or `a<x>,<y>,<z>` in worlds
//! written by some forks. LevelDB cannot answer range queries, so every key
//! is read once at open into a position index.

use std::collections::HashSet;
use std::path::Path;

use rusty_leveldb::{LdbIterator, Options, DB};
use voxmap_core::pos::{decode_block_pos, encode_block_pos};
use voxmap_core::BlockPos;

use super::{Block, BlockStore, PositionIndex};
use crate::error::StorageError;

pub const MAP_DIR: &str = "map.db";

pub struct LevelDbStore {
    db: DB,
    index: PositionIndex,
    /// Positions stored under `a<x>,<y>,<z>` keys instead of packed ones.
    coordinate_keys: HashSet<BlockPos>,
}

/// How a block position is spelled as a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyFormat {
    Packed,
    Coordinates,
}

fn parse_key(key: &[u8]) -> Option<(BlockPos, KeyFormat)> {
    let key = std::str::from_utf8(key).ok()?;
    match key.strip_prefix('a') {
        Some(coords) => Some((coords.parse().ok()?, KeyFormat::Coordinates)),
        None => Some((decode_block_pos(key.parse().ok()?), KeyFormat::Packed)),
    }
}

fn format_key(pos: BlockPos, format: KeyFormat) -> String {
    match format {
        KeyFormat::Packed => encode_block_pos(pos).to_string(),
        KeyFormat::Coordinates => format!("a{},{},{}", pos.x, pos.y, pos.z),
    }
}

impl LevelDbStore {
    pub fn open(world_dir: &Path) -> Result<Self, StorageError> {
        let path = world_dir.join(MAP_DIR);
        let open_failure = |reason: String| StorageError::BackendOpenFailure {
            backend: "leveldb",
            reason,
        };

        let options = Options {
            create_if_missing: false,
            ..Options::default()
        };
        let mut db = DB::open(&path, options)
            .map_err(|e| open_failure(format!("{}: {e}", path.display())))?;

        let mut index = PositionIndex::default();
        let mut coordinate_keys = HashSet::new();
        let mut iter = db
            .new_iter()
            .map_err(|e| open_failure(format!("cannot iterate keys: {e}")))?;
        while let Some((key, _)) = LdbIterator::next(&mut iter) {
            match parse_key(&key) {
                Some((pos, format)) => {
                    if format == KeyFormat::Coordinates {
                        coordinate_keys.insert(pos);
                    }
                    if !index.insert(pos) {
                        log::debug!("Block {pos:?} is stored under both key formats");
                    }
                }
                None => log::warn!(
                    "Ignoring unrecognised leveldb key {:?}",
                    String::from_utf8_lossy(&key)
                ),
            }
        }
        drop(iter);
        log::debug!("Indexed {} block positions", index.len());

        Ok(Self {
            db,
            index,
            coordinate_keys,
        })
    }

    fn fetch(&mut self, pos: BlockPos) -> Option<Vec<u8>> {
        let format = if self.coordinate_keys.contains(&pos) {
            KeyFormat::Coordinates
        } else {
            KeyFormat::Packed
        };
        self.db
            .get(format_key(pos, format).as_bytes())
            .map(|data| data.to_vec())
    }
}

impl BlockStore for LevelDbStore {
    fn positions_in_range(
        &mut self,
        min: BlockPos,
        max: BlockPos,
    ) -> Result<Vec<BlockPos>, StorageError> {
        Ok(self.index.in_range(min, max))
    }

    fn blocks_in_column(
        &mut self,
        x: i16,
        z: i16,
        min_y: i16,
        max_y: i16,
    ) -> Result<Vec<Block>, StorageError> {
        let positions = self.index.column(x, z, min_y, max_y);
        self.blocks_at(&positions)
    }

    fn blocks_at(&mut self, positions: &[BlockPos]) -> Result<Vec<Block>, StorageError> {
        Ok(positions
            .iter()
            .filter_map(|&pos| self.fetch(pos).map(|data| (pos, data)))
            .collect())
    }

    fn prefers_range_queries(&self) -> bool {
        false
    }
}
