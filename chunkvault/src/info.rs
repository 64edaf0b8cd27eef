//! `info.json` slot manifest types, shared between the codec crate and the
//! engine crate that actually reads/writes them as JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Sentinel recorded in [`SlotInfo::user`] when a snapshot or restore was
/// triggered by the console rather than a player.
pub const CONSOLE_USER: &str = "console";

/// Sentinel recorded in [`SlotInfo::comment`] when the caller gave none.
pub const EMPTY_COMMENT: &str = "";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupType {
    Chunk,
    Region,
    Custom,
}

/// The manifest written as `info.json` alongside every slot's data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotInfo {
    pub time: String,
    pub backup_type: BackupType,
    pub backup_dimension: Vec<String>,
    pub user: String,
    #[serde(default = "default_comment")]
    pub comment: String,
    pub command: String,
    pub version_created: String,
    pub minecraft_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_pos: Option<(f64, f64, f64)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_top_left_pos: Option<(i32, i32)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_bottom_right_pos: Option<(i32, i32)>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_slot: Option<BTreeMap<String, SubSlotInfo>>,
}

fn default_comment() -> String {
    EMPTY_COMMENT.to_string()
}

/// One entry of [`SlotInfo::sub_slot`], describing a custom backup's
/// sub-region independently of the dimension it was taken from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubSlotInfo {
    pub time_created: String,
    pub backup_type: String,
    pub backup_dimension: String,
    pub user_created: String,
    pub chunk_top_left_pos: (i32, i32),
    pub chunk_bottom_right_pos: (i32, i32),
    pub command: String,
    pub comment: String,
    pub version_created: String,
}
