//! The configuration document, loaded and saved as JSON with unspecified
//! keys filled in from defaults rather than rejected.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::EngineError;

/// One dimension's mapping from an in-game identifier to the world
/// directory and region-bearing subfolders that back it on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionEntry {
    pub dimension: String,
    pub world_name: String,
    pub region_folder: Vec<String>,
}

/// Command templates and matching regexes used to talk to the host server
/// console, e.g. to ask where a player is standing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataGetterConfig {
    pub get_pos: String,
    pub get_dimension: String,
    pub save_worlds: String,
    pub auto_save_off: String,
    pub auto_save_on: String,
    pub get_pos_regex: String,
    pub get_dimension_regex: String,
    pub save_off_regex: String,
    pub saved_world_regex: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server_path: String,
    pub backup_path: String,
    pub static_backup_path: String,
    pub overwrite_backup_folder: String,
    pub prefix: String,
    pub dimension_info: HashMap<String, DimensionEntry>,
    pub data_getter: DataGetterConfig,
    pub minimum_permission_level: HashMap<String, u8>,
    pub slot: usize,
    pub static_slot: usize,
    pub max_chunk_length: i64,
    pub max_workers: usize,
    pub plugin_version: String,
}

impl Default for DataGetterConfig {
    fn default() -> Self {
        Self {
            get_pos: "data get entity {name} Pos".to_string(),
            get_dimension: "data get entity {name} Dimension".to_string(),
            save_worlds: "save-all flush".to_string(),
            auto_save_off: "save-off".to_string(),
            auto_save_on: "save-on".to_string(),
            get_pos_regex: r#"^{name} has the following entity data: \[(?P<x>-?[\d.]+)d, (?P<y>-?[\d.]+)d, (?P<z>-?[\d.]+)d\]$"#.to_string(),
            get_dimension_regex: r#"^{name} has the following entity data: "(?P<dimension>[^"]+)"$"#.to_string(),
            save_off_regex: "Automatic saving is now disabled".to_string(),
            saved_world_regex: "Saved the game".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut dimension_info = HashMap::new();
        dimension_info.insert(
            "0".to_string(),
            DimensionEntry {
                dimension: "minecraft:overworld".to_string(),
                world_name: "world".to_string(),
                region_folder: vec!["poi".to_string(), "entities".to_string(), "region".to_string()],
            },
        );
        dimension_info.insert(
            "-1".to_string(),
            DimensionEntry {
                dimension: "minecraft:the_nether".to_string(),
                world_name: "world".to_string(),
                region_folder: vec![
                    "DIM-1/poi".to_string(),
                    "DIM-1/entities".to_string(),
                    "DIM-1/region".to_string(),
                ],
            },
        );
        dimension_info.insert(
            "1".to_string(),
            DimensionEntry {
                dimension: "minecraft:the_end".to_string(),
                world_name: "world".to_string(),
                region_folder: vec![
                    "DIM1/poi".to_string(),
                    "DIM1/entities".to_string(),
                    "DIM1/region".to_string(),
                ],
            },
        );

        let mut minimum_permission_level = HashMap::new();
        for (cmd, level) in [
            ("make", 1),
            ("pmake", 1),
            ("dmake", 1),
            ("back", 2),
            ("restore", 2),
            ("del", 2),
            ("confirm", 1),
            ("abort", 1),
            ("reload", 2),
            ("force_reload", 3),
            ("list", 0),
            ("show", 1),
            ("set", 2),
            ("custom", 1),
        ] {
            minimum_permission_level.insert(cmd.to_string(), level);
        }

        Self {
            server_path: "./server".to_string(),
            backup_path: "./cb_multi".to_string(),
            static_backup_path: "./cb_static".to_string(),
            overwrite_backup_folder: "overwrite".to_string(),
            prefix: "!!cb".to_string(),
            dimension_info,
            data_getter: DataGetterConfig::default(),
            minimum_permission_level,
            slot: 10,
            static_slot: 50,
            max_chunk_length: 320,
            max_workers: 4,
            plugin_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Config {
    /// Load the config document at `path`, filling in any key absent from
    /// the file (or the whole file, if it doesn't exist yet) from
    /// [`Config::default`]. The merged document is written back so a
    /// partially-populated file on disk is upgraded in place.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let defaults = serde_json::to_value(Config::default())?;

        let merged = if path.exists() {
            let raw = fs::read_to_string(path)?;
            let on_disk: Value = serde_json::from_str(&raw)?;
            let mut merged = defaults;
            deep_merge(&mut merged, on_disk);
            merged
        } else {
            info!(path = %path.display(), "no config file found, writing defaults");
            defaults
        };

        let config: Config = serde_json::from_value(merged.clone())?;
        config.save(path)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// No two configured dimensions may share a canonical Minecraft
    /// dimension id.
    pub fn check_dimensions(&self) -> Result<(), EngineError> {
        let mut seen = std::collections::HashSet::new();
        for entry in self.dimension_info.values() {
            if !seen.insert(entry.dimension.as_str()) {
                return Err(EngineError::RepeatDimension(entry.dimension.clone()));
            }
        }
        Ok(())
    }

    /// Reverse lookup from canonical dimension id (e.g. `minecraft:the_nether`)
    /// to the internal numeric-string key `dimension_info` is keyed by.
    pub fn dimension_by_canonical_id(&self) -> HashMap<&str, &str> {
        self.dimension_info
            .iter()
            .map(|(key, entry)| (entry.dimension.as_str(), key.as_str()))
            .collect()
    }
}

/// Recursively overlay `overlay` onto `base`, keeping `base`'s keys that
/// `overlay` doesn't mention and replacing the ones it does.
fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key, overlay_value);
                    }
                }
            }
        }
        (base_slot, overlay_value) => *base_slot = overlay_value,
    }
}
