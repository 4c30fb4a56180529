//! Points of interest stored by the `poi` mod.

use std::path::Path;

use crate::backend::sqlite::{open_read_only, retry_busy};
use crate::error::StorageError;
use crate::players::{column_text, parse_vector};
use crate::settings::WorldSettings;

pub const MOD_STORAGE_DB: &str = "mod_storage.sqlite";

/// A named marker at a node position.
#[derive(Debug, Clone, PartialEq)]
pub struct Poi {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Read POIs from the world's mod storage (`mod_storage_backend`, `sqlite3` by default).
///
/// Entries whose value is not an `(x,y,z)` triple are skipped with a warning.
pub fn load_pois(world_dir: &Path, settings: &WorldSettings) -> Result<Vec<Poi>, StorageError> {
    match settings.get_or("mod_storage_backend", "sqlite3") {
        "sqlite3" => read_poi_db(&world_dir.join(MOD_STORAGE_DB)),
        other => Err(StorageError::UnknownBackendKind(format!("poi backend {other}"))),
    }
}

fn read_poi_db(path: &Path) -> Result<Vec<Poi>, StorageError> {
    let conn = open_read_only(path, "sqlite3")?;
    let entries = retry_busy("sqlite3", || {
        let mut stmt = conn.prepare("SELECT key, value FROM entries WHERE modname = 'poi'")?;
        let rows = stmt.query_map([], |row| Ok((column_text(row, 0)?, column_text(row, 1)?)))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
    })?;

    let mut pois = Vec::with_capacity(entries.len());
    for (name, value) in entries {
        match parse_vector(&value) {
            Some([x, y, z]) => pois.push(Poi { name, x, y, z }),
            None => log::warn!("Failed to parse POI position '{value}'"),
        }
    }
    Ok(pois)
}
