//! Redis store: one hash (`redis_hash`) mapping packed positions in decimal
//! to block data.

use voxmap_core::pos::{decode_block_pos, encode_block_pos};
use voxmap_core::BlockPos;

use super::{Block, BlockStore, PositionIndex};
use crate::error::StorageError;
use crate::settings::WorldSettings;

/// Fields requested per HMGET.
const HMGET_BATCH: usize = 30;

const DEFAULT_PORT: &str = "6379";

pub struct RedisStore {
    conn: redis::Connection,
    hash: String,
    index: PositionIndex,
}

/// Connection URL from `redis_address` and `redis_port`. An address
/// containing `/` is a unix socket path.
fn connection_url(settings: &WorldSettings) -> Result<String, StorageError> {
    let address = settings.require("redis_address")?;
    if address.contains('/') {
        Ok(format!("redis+unix://{address}"))
    } else {
        let port = settings.get_or("redis_port", DEFAULT_PORT);
        Ok(format!("redis://{address}:{port}/"))
    }
}

fn query_failure(e: impl std::fmt::Display) -> StorageError {
    StorageError::BackendQueryFailure {
        backend: "redis",
        reason: e.to_string(),
    }
}

/// Pair one HMGET reply with the positions it was asked for.
fn collect_reply(
    batch: &[BlockPos],
    reply: Vec<Option<Vec<u8>>>,
) -> Result<Vec<Block>, StorageError> {
    if reply.len() != batch.len() {
        log::warn!(
            "HMGET returned {} of {} fields, skipping the rest of the batch",
            reply.len(),
            batch.len()
        );
    }
    let mut blocks = Vec::with_capacity(reply.len());
    for (&pos, data) in batch.iter().zip(reply) {
        match data {
            None => continue,
            Some(data) if data.is_empty() => {
                return Err(query_failure(format!("HMGET returned empty data for {pos}")))
            }
            Some(data) => blocks.push((pos, data)),
        }
    }
    Ok(blocks)
}

impl RedisStore {
    pub fn open(settings: &WorldSettings) -> Result<Self, StorageError> {
        let hash = settings.require("redis_hash")?.to_string();
        let url = connection_url(settings)?;
        let open_failure = |e: redis::RedisError| StorageError::BackendOpenFailure {
            backend: "redis",
            reason: format!("connection error: {e}"),
        };

        let client = redis::Client::open(url.as_str()).map_err(open_failure)?;
        let mut conn = client.get_connection().map_err(open_failure)?;

        let keys: Vec<String> = redis::cmd("HKEYS")
            .arg(&hash)
            .query(&mut conn)
            .map_err(open_failure)?;
        let mut index = PositionIndex::default();
        for key in keys {
            match key.parse::<i64>() {
                Ok(packed) => {
                    index.insert(decode_block_pos(packed));
                }
                Err(_) => log::warn!("Ignoring unrecognised redis field {key:?}"),
            }
        }
        log::debug!("Indexed {} block positions", index.len());

        Ok(Self { conn, hash, index })
    }

    fn hmget(&mut self, batch: &[BlockPos]) -> Result<Vec<Block>, StorageError> {
        let mut cmd = redis::cmd("HMGET");
        cmd.arg(&self.hash);
        for &pos in batch {
            cmd.arg(encode_block_pos(pos).to_string());
        }
        let reply: Vec<Option<Vec<u8>>> = cmd.query(&mut self.conn).map_err(query_failure)?;
        collect_reply(batch, reply)
    }
}

impl BlockStore for RedisStore {
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
        let mut blocks = Vec::new();
        for batch in positions.chunks(HMGET_BATCH) {
            blocks.extend(self.hmget(batch)?);
        }
        Ok(blocks)
    }

    fn prefers_range_queries(&self) -> bool {
        false
    }
}
