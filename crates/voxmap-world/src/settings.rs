//! `world.mt` reader.
//!
//! One `key = value` pair per line. Everything after a `#` is ignored and
//! both sides are trimmed. When a key repeats, the first occurrence wins.

use std::collections::HashMap;
use std::path::Path;

use crate::error::StorageError;

pub const WORLD_SETTINGS_FILE: &str = "world.mt";

#[derive(Debug, Clone, Default)]
pub struct WorldSettings {
    entries: HashMap<String, String>,
}

impl WorldSettings {
    /// Read `world.mt` from a world directory.
    pub fn load(world_dir: &Path) -> Result<Self, StorageError> {
        let path = world_dir.join(WORLD_SETTINGS_FILE);
        let text = std::fs::read_to_string(&path).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    pub fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();
        for line in text.lines() {
            let line = line.split('#').next().unwrap_or_default();
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            entries
                .entry(key.trim().to_string())
                .or_insert_with(|| value.trim().to_string());
        }
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn require(&self, key: &str) -> Result<&str, StorageError> {
        self.get(key)
            .ok_or_else(|| StorageError::MissingSetting(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_world_mt() {
        let settings = WorldSettings::parse(
            "gameid = minetest\n\
             backend = leveldb  # switched last week\n\
             # player_backend = sqlite3\n\
             redis_hash=world\n\
             not a setting\n\
             backend = sqlite3\n",
        );
        assert_eq!(settings.get("gameid"), Some("minetest"));
        assert_eq!(settings.get("backend"), Some("leveldb"));
        assert_eq!(settings.get("redis_hash"), Some("world"));
        assert_eq!(settings.get("player_backend"), None);
        assert_eq!(settings.get_or("player_backend", "files"), "files");
    }

    #[test]
    fn test_require_reports_missing_key() {
        let settings = WorldSettings::parse("backend = redis\n");
        assert!(matches!(
            settings.require("redis_address"),
            Err(StorageError::MissingSetting(key)) if key == "redis_address"
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        assert!(matches!(
            WorldSettings::load(dir.path()),
            Err(StorageError::Io { .. })
        ));
    }
}
