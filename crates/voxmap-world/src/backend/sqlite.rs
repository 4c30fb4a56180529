//! `map.sqlite` store: table `blocks(pos INTEGER PRIMARY KEY, data BLOB)`
//! keyed by the packed position.

use std::collections::HashMap;
use std::path::Path;
use std::thread;
use std::time::Duration;

use rusqlite::{Connection, ErrorCode, OpenFlags, OptionalExtension};
use voxmap_core::constants::{BLOCK_AXIS_MAX, BLOCK_AXIS_MIN, KEY_Y_STRIDE, KEY_Z_STRIDE};
use voxmap_core::pos::{decode_block_pos, encode_block_pos};
use voxmap_core::BlockPos;

use super::{Block, BlockStore};
use crate::error::StorageError;

pub const MAP_FILE: &str = "map.sqlite";

const BUSY_RETRY_DELAY: Duration = Duration::from_millis(10);

const SELECT_ALL_POSITIONS: &str = "SELECT pos FROM blocks";
const SELECT_POSITIONS_IN: &str = "SELECT pos FROM blocks WHERE pos BETWEEN ?1 AND ?2";
const SELECT_BLOCKS_IN: &str = "SELECT pos, data FROM blocks WHERE pos BETWEEN ?1 AND ?2";
const SELECT_BLOCK: &str = "SELECT data FROM blocks WHERE pos = ?1";

/// Open an SQLite file read-only with a private cache.
pub(crate) fn open_read_only(path: &Path, backend: &'static str) -> Result<Connection, StorageError> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_PRIVATE_CACHE,
    )
    .map_err(|e| StorageError::BackendOpenFailure {
        backend,
        reason: format!("{}: {e}", path.display()),
    })
}

fn classify(e: rusqlite::Error, backend: &'static str) -> StorageError {
    match e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::DatabaseBusy => {
            StorageError::TransientBackendBusy
        }
        other => StorageError::BackendQueryFailure {
            backend,
            reason: other.to_string(),
        },
    }
}

/// Run a query, sleeping and starting over while the database reports busy.
pub(crate) fn retry_busy<T>(
    backend: &'static str,
    mut query: impl FnMut() -> rusqlite::Result<T>,
) -> Result<T, StorageError> {
    loop {
        match query().map_err(|e| classify(e, backend)) {
            Err(StorageError::TransientBackendBusy) => thread::sleep(BUSY_RETRY_DELAY),
            result => return result,
        }
    }
}

/// Key bounds covering every block with `z1 <= z <= z2`.
///
/// The bounds also admit a few positions of neighbouring slices because
/// negative X borrows from Y, so results are filtered after decoding.
fn key_range(z1: i16, z2: i16) -> (i64, i64) {
    let min = z1 as i64 * KEY_Z_STRIDE + BLOCK_AXIS_MIN as i64 * KEY_Y_STRIDE;
    let max = z2 as i64 * KEY_Z_STRIDE + BLOCK_AXIS_MAX as i64 * KEY_Y_STRIDE - 1;
    (min, max)
}

pub struct SqliteStore {
    conn: Connection,
    cached_z: Option<i16>,
    /// Blocks of slice `cached_z` keyed by X. Entries are moved out when
    /// handed to the caller.
    column_cache: HashMap<i16, Vec<Block>>,
}

impl SqliteStore {
    pub fn open(world_dir: &Path) -> Result<Self, StorageError> {
        let conn = open_read_only(&world_dir.join(MAP_FILE), "sqlite3")?;
        Ok(Self {
            conn,
            cached_z: None,
            column_cache: HashMap::new(),
        })
    }

    fn load_column_cache(&mut self, z: i16) -> Result<(), StorageError> {
        let (min, max) = key_range(z, z);
        let conn = &self.conn;
        let rows = retry_busy("sqlite3", || {
            let mut stmt = conn.prepare_cached(SELECT_BLOCKS_IN)?;
            let rows = stmt.query_map([min, max], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?;

        self.column_cache.clear();
        for (key, data) in rows {
            let pos = decode_block_pos(key);
            if pos.z != z {
                continue;
            }
            self.column_cache.entry(pos.x).or_default().push((pos, data));
        }
        self.cached_z = Some(z);
        Ok(())
    }
}

impl BlockStore for SqliteStore {
    fn positions_in_range(
        &mut self,
        min: BlockPos,
        max: BlockPos,
    ) -> Result<Vec<BlockPos>, StorageError> {
        let conn = &self.conn;
        let keys = if min.z <= BLOCK_AXIS_MIN && max.z >= BLOCK_AXIS_MAX {
            retry_busy("sqlite3", || {
                let mut stmt = conn.prepare_cached(SELECT_ALL_POSITIONS)?;
                let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })?
        } else {
            let z1 = min.z.max(BLOCK_AXIS_MIN);
            let z2 = max.z.min(BLOCK_AXIS_MAX);
            let (lo, hi) = key_range(z1, z2 - 1);
            retry_busy("sqlite3", || {
                let mut stmt = conn.prepare_cached(SELECT_POSITIONS_IN)?;
                let rows = stmt.query_map([lo, hi], |row| row.get::<_, i64>(0))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })?
        };

        Ok(keys
            .into_iter()
            .map(decode_block_pos)
            .filter(|p| {
                p.x >= min.x && p.x < max.x && p.y >= min.y && p.y < max.y && p.z >= min.z && p.z < max.z
            })
            .collect())
    }

    /// Served from a cache of the whole Z slice, so columns should be
    /// requested slice by slice.
    fn blocks_in_column(
        &mut self,
        x: i16,
        z: i16,
        min_y: i16,
        max_y: i16,
    ) -> Result<Vec<Block>, StorageError> {
        if self.cached_z != Some(z) {
            self.load_column_cache(z)?;
        }

        match self.column_cache.get(&x).map(Vec::is_empty) {
            None => return Ok(Vec::new()),
            Some(true) => {
                log::warn!("Suboptimal access pattern for sqlite3 backend");
                self.load_column_cache(z)?;
            }
            Some(false) => {}
        }

        let mut blocks = self
            .column_cache
            .get_mut(&x)
            .map(std::mem::take)
            .unwrap_or_default();
        blocks.retain(|(pos, _)| pos.y >= min_y && pos.y < max_y);
        Ok(blocks)
    }

    fn blocks_at(&mut self, positions: &[BlockPos]) -> Result<Vec<Block>, StorageError> {
        let mut blocks = Vec::new();
        for &pos in positions {
            let key = encode_block_pos(pos);
            let data = retry_busy("sqlite3", || {
                self.conn
                    .prepare_cached(SELECT_BLOCK)?
                    .query_row([key], |row| row.get::<_, Vec<u8>>(0))
                    .optional()
            })?;
            if let Some(data) = data {
                blocks.push((pos, data));
            }
        }
        Ok(blocks)
    }

    fn prefers_range_queries(&self) -> bool {
        true
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Create `map.sqlite` in `dir` holding the given blocks.
    pub(crate) fn create_map(dir: &Path, blocks: &[(BlockPos, &[u8])]) {
        let conn = Connection::open(dir.join(MAP_FILE)).expect("should create map.sqlite");
        conn.execute_batch(
            "CREATE TABLE blocks (pos INT PRIMARY KEY NOT NULL, data BLOB NOT NULL);",
        )
        .expect("should create table");
        for (pos, data) in blocks {
            conn.execute(
                "INSERT INTO blocks (pos, data) VALUES (?1, ?2)",
                rusqlite::params![encode_block_pos(*pos), data],
            )
            .expect("should insert block");
        }
    }

    fn sample_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().expect("should create temp dir");
        create_map(
            dir.path(),
            &[
                (BlockPos::new(0, 0, 0), b"a"),
                (BlockPos::new(0, 1, 0), b"b"),
                (BlockPos::new(0, -1, 0), b"c"),
                (BlockPos::new(3, 0, 0), b"d"),
                (BlockPos::new(-1, 0, 0), b"e"),
                (BlockPos::new(0, 0, -1), b"f"),
                (BlockPos::new(-5, 2047, 4), b"g"),
            ],
        );
        let store = SqliteStore::open(dir.path()).expect("should open store");
        (dir, store)
    }

    #[test]
    fn test_open_missing_map_fails() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        assert!(matches!(
            SqliteStore::open(dir.path()),
            Err(StorageError::BackendOpenFailure { backend: "sqlite3", .. })
        ));
    }

    #[test]
    fn test_positions_in_whole_world() {
        let (_dir, mut store) = sample_store();
        let all = store
            .positions_in_range(
                BlockPos::new(-2048, -2048, -2048),
                BlockPos::new(2048, 2048, 2048),
            )
            .expect("should query");
        assert_eq!(all.len(), 7);
    }

    #[test]
    fn test_positions_in_range_are_filtered() {
        let (_dir, mut store) = sample_store();
        let mut found = store
            .positions_in_range(BlockPos::new(-1, -1, 0), BlockPos::new(1, 1, 1))
            .expect("should query");
        found.sort();
        assert_eq!(
            found,
            vec![
                BlockPos::new(0, 0, 0),
                BlockPos::new(-1, 0, 0),
                BlockPos::new(0, -1, 0),
            ]
        );

        let far = store
            .positions_in_range(BlockPos::new(-10, 0, 4), BlockPos::new(0, 2048, 5))
            .expect("should query");
        assert_eq!(far, vec![BlockPos::new(-5, 2047, 4)]);
    }

    #[test]
    fn test_blocks_in_column() {
        let (_dir, mut store) = sample_store();
        let mut column = store.blocks_in_column(0, 0, -1, 1).expect("should query");
        column.sort();
        assert_eq!(
            column,
            vec![
                (BlockPos::new(0, 0, 0), b"a".to_vec()),
                (BlockPos::new(0, -1, 0), b"c".to_vec()),
            ]
        );
        assert!(store
            .blocks_in_column(7, 0, -2048, 2048)
            .expect("should query")
            .is_empty());
        assert_eq!(
            store.blocks_in_column(0, -1, -2048, 2048).expect("should query"),
            vec![(BlockPos::new(0, 0, -1), b"f".to_vec())]
        );
    }

    #[test]
    fn test_repeated_column_request_reloads() {
        let (_dir, mut store) = sample_store();
        let first = store.blocks_in_column(3, 0, -2048, 2048).expect("first");
        let second = store.blocks_in_column(3, 0, -2048, 2048).expect("second");
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn test_blocks_at_skips_missing() {
        let (_dir, mut store) = sample_store();
        let blocks = store
            .blocks_at(&[
                BlockPos::new(0, 1, 0),
                BlockPos::new(9, 9, 9),
                BlockPos::new(-1, 0, 0),
            ])
            .expect("should query");
        assert_eq!(
            blocks,
            vec![
                (BlockPos::new(0, 1, 0), b"b".to_vec()),
                (BlockPos::new(-1, 0, 0), b"e".to_vec()),
            ]
        );
    }

    #[test]
    fn test_key_range_covers_slice() {
        let (min, max) = key_range(0, 0);
        for pos in [
            BlockPos::new(0, 0, 0),
            BlockPos::new(2047, 2047, 0),
            BlockPos::new(0, -2048, 0),
            BlockPos::new(-2048, -2047, 0),
        ] {
            let key = encode_block_pos(pos);
            assert!(min <= key && key <= max, "{pos} outside slice range");
        }
    }
}
