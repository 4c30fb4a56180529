//! Player positions for the map overlay.

use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::Row;

use crate::backend::sqlite::{open_read_only, retry_busy};
use crate::error::StorageError;
use crate::settings::WorldSettings;

pub const PLAYERS_DIR: &str = "players";
pub const PLAYERS_DB: &str = "players.sqlite";

/// Stored player coordinates are in tenths of a node.
const POSITION_SCALE: f32 = 10.0;

/// A player and their position in nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Read every player of a world using its `player_backend` (`files` by default).
pub fn load_players(world_dir: &Path, settings: &WorldSettings) -> Result<Vec<Player>, StorageError> {
    match settings.get_or("player_backend", "files") {
        "files" => read_player_files(&world_dir.join(PLAYERS_DIR)),
        "sqlite3" => read_player_db(&world_dir.join(PLAYERS_DB)),
        other => Err(StorageError::UnknownBackendKind(format!(
            "player backend {other}"
        ))),
    }
}

/// Parse `(x,y,z)`.
pub(crate) fn parse_vector(s: &str) -> Option<[f32; 3]> {
    let inner = s.trim().strip_prefix('(')?.strip_suffix(')')?;
    let mut parts = inner.split(',').map(|p| p.trim().parse::<f32>());
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(Ok(x)), Some(Ok(y)), Some(Ok(z)), None) => Some([x, y, z]),
        _ => None,
    }
}

/// Column as text, whether SQLite stored it as TEXT or BLOB.
pub(crate) fn column_text(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    match row.get_ref(idx)? {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Ok(String::from_utf8_lossy(bytes).into_owned())
        }
        other => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "text".to_string(),
            other.data_type(),
        )),
    }
}

fn parse_player_file(text: &str) -> Option<Player> {
    let mut name = None;
    let mut position = None;
    for line in text.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        match key.trim() {
            "name" => name = Some(value.trim().to_string()),
            "position" => position = parse_vector(value),
            _ => {}
        }
        if name.is_some() && position.is_some() {
            break;
        }
    }
    let [x, y, z] = position?;
    Some(Player {
        name: name?,
        x: x / POSITION_SCALE,
        y: y / POSITION_SCALE,
        z: z / POSITION_SCALE,
    })
}

fn read_player_files(dir: &Path) -> Result<Vec<Player>, StorageError> {
    let io_error = |source| StorageError::Io {
        path: dir.to_path_buf(),
        source,
    };
    if !dir.is_dir() {
        log::debug!("No players directory at {}", dir.display());
        return Ok(Vec::new());
    }

    let mut players = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if !path.is_file() || path.file_name().is_some_and(|n| n.to_string_lossy().starts_with('.')) {
            continue;
        }
        let text = std::fs::read(&path).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;
        match parse_player_file(&String::from_utf8_lossy(&text)) {
            Some(player) => players.push(player),
            None => log::warn!("Skipping player file {} without name or position", path.display()),
        }
    }
    players.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(players)
}

fn read_player_db(path: &Path) -> Result<Vec<Player>, StorageError> {
    let conn = open_read_only(path, "sqlite3")?;
    retry_busy("sqlite3", || {
        let mut stmt = conn.prepare("SELECT name, posX, posY, posZ FROM player")?;
        let rows = stmt.query_map([], |row| {
            Ok(Player {
                name: column_text(row, 0)?,
                x: row.get::<_, f64>(1)? as f32 / POSITION_SCALE,
                y: row.get::<_, f64>(2)? as f32 / POSITION_SCALE,
                z: row.get::<_, f64>(3)? as f32 / POSITION_SCALE,
            })
        })?;
        rows.collect()
    })
}
