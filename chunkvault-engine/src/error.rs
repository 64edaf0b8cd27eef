//! The engine-level error taxonomy, grouped by family.

use chunkvault::custom::CustomError;
use chunkvault::region::RegionError;
use chunkvault::selector::SelectorError;
use chunkvault::slot::SlotError;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    // --- Timeout family: recovered locally by the coordinator. ---
    #[error("timed out waiting for the host to confirm auto-save is disabled")]
    SaveOffTimeout,
    #[error("timed out waiting for the host to confirm the world was flushed")]
    SaveAllTimeout,
    #[error("timed out waiting for the host to report player position/dimension")]
    GetPlayerDataTimeout,
    #[error("timed out waiting for restore confirmation")]
    BackTimeout,

    // --- Backup-input family: rejected before any filesystem mutation. ---
    #[error("no player is associated with this backup request")]
    NoPlayer,
    #[error("invalid input")]
    InvalidInput,
    #[error("dimension {0:?} was requested more than once")]
    InputDimRepeat(String),
    #[error("dimension {0:?} could not be parsed")]
    InputDimError(String),
    #[error("dimension {0:?} is not configured")]
    UnidentifiedDimension(String),
    #[error(transparent)]
    MaxChunkLength(#[from] SelectorError),
    #[error("two configured dimensions share the canonical id {0:?}")]
    RepeatDimension(String),
    #[error(transparent)]
    DynamicOrStaticMore(#[from] SlotError),

    // --- Restore-input family. ---
    #[error("slot {0:?} has no info.json manifest")]
    LackInfoFile(String),
    #[error("slot {0:?} contains no .mca or .region files")]
    LackRegionFile(String),
    #[error("slot {0:?} backs up dimension {1:?}, which is no longer configured")]
    InvalidInfoDimension(String, String),
    #[error("restore was aborted by the user")]
    BackAbort,
    #[error("slot {0:?} is not a custom backup")]
    NotCustom(String),
    #[error("custom backup {custom:?} has no sub-slot {sub}")]
    UnidentifiedSubSlot { custom: String, sub: u32 },
    #[error("slot {0:?} was already requested by another in-flight operation")]
    InputSlotRepeat(String),

    // --- Single-flight coordinator refusal. ---
    #[error("a backup or restore is already in progress")]
    RepeatBackup,

    // --- Host coupling. ---
    #[error("the host server exited with non-zero code {0} while stopping for restore")]
    ServerStopFailed(i32),

    // --- Passthrough from lower layers. ---
    #[error(transparent)]
    Region(#[from] RegionError),
    #[error(transparent)]
    Custom(#[from] CustomError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("info.json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid regex: {0}")]
    Regex(#[from] regex::Error),
}
