//! PostgreSQL store: table `blocks(posX, posY, posZ, data)`.

use postgres::{Client, NoTls, Statement};
use voxmap_core::BlockPos;

use super::{Block, BlockStore};
use crate::error::StorageError;
use crate::settings::WorldSettings;

const SELECT_POSITIONS_IN: &str = "SELECT posX::int4, posY::int4, posZ::int4 FROM blocks WHERE \
     (posX BETWEEN $1::int4 AND $2::int4) AND \
     (posY BETWEEN $3::int4 AND $4::int4) AND \
     (posZ BETWEEN $5::int4 AND $6::int4)";
const SELECT_COLUMN: &str = "SELECT posY::int4, data FROM blocks WHERE \
     posX = $1::int4 AND posZ = $2::int4 AND (posY BETWEEN $3::int4 AND $4::int4)";
const SELECT_BLOCK: &str =
    "SELECT data FROM blocks WHERE posX = $1::int4 AND posY = $2::int4 AND posZ = $3::int4";

pub struct PostgresStore {
    client: Client,
    positions_in: Statement,
    column: Statement,
    block: Statement,
}

fn query_failure(e: postgres::Error) -> StorageError {
    StorageError::BackendQueryFailure {
        backend: "postgresql",
        reason: e.to_string(),
    }
}

fn to_i16(v: i32) -> Result<i16, StorageError> {
    i16::try_from(v).map_err(|_| StorageError::BackendQueryFailure {
        backend: "postgresql",
        reason: format!("block coordinate {v} out of range"),
    })
}

impl PostgresStore {
    /// Connect with the libpq-style string in `pgsql_connection`.
    pub fn open(settings: &WorldSettings) -> Result<Self, StorageError> {
        let connection = settings.require("pgsql_connection")?;
        let open_failure = |e: postgres::Error| StorageError::BackendOpenFailure {
            backend: "postgresql",
            reason: e.to_string(),
        };

        let mut client = Client::connect(connection, NoTls).map_err(open_failure)?;
        let positions_in = client.prepare(SELECT_POSITIONS_IN).map_err(open_failure)?;
        let column = client.prepare(SELECT_COLUMN).map_err(open_failure)?;
        let block = client.prepare(SELECT_BLOCK).map_err(open_failure)?;

        Ok(Self {
            client,
            positions_in,
            column,
            block,
        })
    }
}

impl BlockStore for PostgresStore {
    fn positions_in_range(
        &mut self,
        min: BlockPos,
        max: BlockPos,
    ) -> Result<Vec<BlockPos>, StorageError> {
        // BETWEEN is inclusive
        let bounds: [i32; 6] = [
            min.x.into(),
            i32::from(max.x) - 1,
            min.y.into(),
            i32::from(max.y) - 1,
            min.z.into(),
            i32::from(max.z) - 1,
        ];
        let rows = self
            .client
            .query(
                &self.positions_in,
                &[&bounds[0], &bounds[1], &bounds[2], &bounds[3], &bounds[4], &bounds[5]],
            )
            .map_err(query_failure)?;

        let mut positions = Vec::with_capacity(rows.len());
        for row in rows {
            let x: i32 = row.try_get(0).map_err(query_failure)?;
            let y: i32 = row.try_get(1).map_err(query_failure)?;
            let z: i32 = row.try_get(2).map_err(query_failure)?;
            positions.push(BlockPos::new(to_i16(x)?, to_i16(y)?, to_i16(z)?));
        }
        Ok(positions)
    }

    fn blocks_in_column(
        &mut self,
        x: i16,
        z: i16,
        min_y: i16,
        max_y: i16,
    ) -> Result<Vec<Block>, StorageError> {
        let params: [i32; 4] = [x.into(), z.into(), min_y.into(), i32::from(max_y) - 1];
        let rows = self
            .client
            .query(&self.column, &[&params[0], &params[1], &params[2], &params[3]])
            .map_err(query_failure)?;

        let mut blocks = Vec::with_capacity(rows.len());
        for row in rows {
            let y: i32 = row.try_get(0).map_err(query_failure)?;
            let data: Vec<u8> = row.try_get(1).map_err(query_failure)?;
            blocks.push((BlockPos::new(x, to_i16(y)?, z), data));
        }
        Ok(blocks)
    }

    fn blocks_at(&mut self, positions: &[BlockPos]) -> Result<Vec<Block>, StorageError> {
        let mut blocks = Vec::new();
        for &pos in positions {
            let (x, y, z) = (i32::from(pos.x), i32::from(pos.y), i32::from(pos.z));
            let row = self
                .client
                .query_opt(&self.block, &[&x, &y, &z])
                .map_err(query_failure)?;
            if let Some(row) = row {
                let data: Vec<u8> = row.try_get(0).map_err(query_failure)?;
                blocks.push((pos, data));
            }
        }
        Ok(blocks)
    }

    fn prefers_range_queries(&self) -> bool {
        true
    }
}
