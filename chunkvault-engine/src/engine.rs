//! Snapshot and restore orchestration: slot rotation, per-region-file
//! export/merge dispatched across the worker pool, and the `info.json`
//! manifest written (or consulted) around each operation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use regex::Regex;
use tracing::{debug, info, warn};

use chunkvault::custom::CustomDefinition;
use chunkvault::info::{BackupType, SlotInfo, SubSlotInfo, CONSOLE_USER};
use chunkvault::region::{self, RegionError};
use chunkvault::selector::{combine_and_group, group_chunks, GroupedChunks, RegionSelection, Selector, SelectorMode};
use chunkvault::slot::{RootKind, SlotRoot};

use crate::config::{Config, DimensionEntry};
use crate::coordinator::OperationCoordinator;
use crate::error::EngineError;
use crate::host::HostAdapter;
use crate::worker::run_pool;

/// Everything needed to take one snapshot.
pub struct SnapshotRequest {
    pub kind: BackupType,
    pub root: RootKind,
    /// Canonical dimension ids (`minecraft:overworld`, ...) to back up,
    /// each paired with the grouping to export for `Chunk`/`Custom` kinds.
    /// Ignored for `Region` kind, which always copies the whole dimension.
    pub dimensions: Vec<DimensionTarget>,
    pub comment: String,
    pub command: String,
    pub user: String,
    pub user_pos: Option<(f64, f64, f64)>,
    pub chunk_top_left_pos: Option<(i32, i32)>,
    pub chunk_bottom_right_pos: Option<(i32, i32)>,
    pub custom_name: Option<String>,
    pub user_created: Option<String>,
    pub time_created: Option<String>,
    pub sub_slot: Option<BTreeMap<String, SubSlotInfo>>,
    /// Bound on each save-off / save-all-flush handshake wait.
    pub handshake_timeout: Duration,
}

pub struct DimensionTarget {
    pub canonical_id: String,
    /// Present for `Chunk`/`Custom` kinds; `None` for `Region`, which takes
    /// every chunk in every configured subfolder.
    pub grouping: Option<GroupedChunks>,
}

pub struct RestoreRequest {
    pub root: RootKind,
    pub slot: usize,
    pub confirm_timeout: Duration,
    pub countdown_seconds: u32,
}

/// Default bound on a single host handshake wait (save-off, save-all-flush,
/// data-get), per the configured default `time_out`.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct BackupEngine {
    config: Config,
    coordinator: Arc<OperationCoordinator>,
    minecraft_version: String,
}

impl BackupEngine {
    pub fn new(config: Config, coordinator: Arc<OperationCoordinator>, minecraft_version: impl Into<String>) -> Self {
        Self { config, coordinator, minecraft_version: minecraft_version.into() }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The shared coordinator, so a host's `confirm`/`abort`/`force_reload`
    /// command handlers can reach it directly.
    pub fn coordinator(&self) -> &Arc<OperationCoordinator> {
        &self.coordinator
    }

    fn root(&self, kind: RootKind) -> SlotRoot {
        match kind {
            RootKind::Dynamic => SlotRoot::new(&self.config.backup_path, RootKind::Dynamic, self.config.slot),
            RootKind::Static => SlotRoot::new(&self.config.static_backup_path, RootKind::Static, self.config.static_slot),
        }
    }

    fn dimension_entry(&self, canonical_id: &str) -> Result<&DimensionEntry, EngineError> {
        self.config
            .dimension_info
            .values()
            .find(|entry| entry.dimension == canonical_id)
            .ok_or_else(|| EngineError::UnidentifiedDimension(canonical_id.to_string()))
    }

    /// Execute a full snapshot: rotate the slot root, export every
    /// requested dimension's region files (or copy whole trees for
    /// `Region` kind) across the worker pool, then write `info.json`.
    pub fn snapshot(&self, request: SnapshotRequest, host: &dyn HostAdapter) -> Result<SlotInfo, EngineError> {
        self.config.check_dimensions()?;

        let mut seen = std::collections::HashSet::new();
        for target in &request.dimensions {
            if !seen.insert(target.canonical_id.as_str()) {
                return Err(EngineError::InputDimRepeat(target.canonical_id.clone()));
            }
        }

        let guard = self.coordinator.try_begin("snapshot", host)?;

        let save_off_regex = Regex::new(&self.config.data_getter.save_off_regex)?;
        self.coordinator.handshake(
            host,
            &self.config.data_getter.auto_save_off,
            &save_off_regex,
            request.handshake_timeout,
            EngineError::SaveOffTimeout,
        )?;
        guard.mark_autosave_disabled();

        let saved_world_regex = Regex::new(&self.config.data_getter.saved_world_regex)?;
        self.coordinator.handshake(
            host,
            &self.config.data_getter.save_worlds,
            &saved_world_regex,
            request.handshake_timeout,
            EngineError::SaveAllTimeout,
        )?;

        let root = self.root(request.root);
        let slot_path = root.rotate_for_new()?;
        info!(slot = %slot_path.display(), "rotated slot for new snapshot");

        let mut jobs: Vec<ExportJob> = Vec::new();
        for target in &request.dimensions {
            let entry = self.dimension_entry(&target.canonical_id)?;
            let world_dir = Path::new(&self.config.server_path).join(&entry.world_name);

            for subfolder in &entry.region_folder {
                let src_dir = world_dir.join(subfolder);
                let dst_dir = slot_path.join(&entry.world_name).join(subfolder);
                fs::create_dir_all(&dst_dir)?;

                match request.kind {
                    BackupType::Region => {
                        jobs.push(ExportJob::CopyTree { src_dir, dst_dir });
                    }
                    BackupType::Chunk | BackupType::Custom => {
                        let grouping = target.grouping.clone().unwrap_or_default();
                        for (region_filename, selection) in grouping {
                            jobs.push(ExportJob::ExportGroup {
                                src_dir: src_dir.clone(),
                                dst_dir: dst_dir.clone(),
                                region_filename,
                                selection,
                            });
                        }
                    }
                }
            }
        }

        let outcomes = run_pool(jobs, self.config.max_workers, |job| job.run());
        let mut failures = 0usize;
        for outcome in &outcomes {
            if let Err(err) = outcome {
                failures += 1;
                warn!("snapshot task failed: {err}");
            }
        }
        if failures > 0 {
            warn!("{failures} of {} snapshot tasks failed; slot is still finalized with recovered state", outcomes.len());
        }

        let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let info = SlotInfo {
            time: now,
            backup_type: request.kind,
            backup_dimension: request.dimensions.iter().map(|t| t.canonical_id.clone()).collect(),
            user: request.user,
            comment: request.comment,
            command: request.command,
            version_created: env!("CARGO_PKG_VERSION").to_string(),
            minecraft_version: self.minecraft_version.clone(),
            user_pos: request.user_pos,
            chunk_top_left_pos: request.chunk_top_left_pos,
            chunk_bottom_right_pos: request.chunk_bottom_right_pos,
            custom_name: request.custom_name,
            user_created: request.user_created,
            time_created: request.time_created,
            sub_slot: request.sub_slot,
        };
        write_info(&slot_path.join("info.json"), &info)?;

        let (human, _) = folder_size(&slot_path);
        info!(slot = %slot_path.display(), size = %human, "snapshot complete");
        host.broadcast(&host.tr("chunkvault.snapshot.complete"));

        Ok(info)
    }

    /// Execute a restore: validate the slot, run the confirm/countdown
    /// ceremony, stop the host, overwrite world data (capturing what was
    /// there into the overwrite buffer unless restoring from it), then
    /// restart the host.
    pub fn restore(&self, request: RestoreRequest, host: &dyn HostAdapter) -> Result<(), EngineError> {
        let root = self.root(request.root);
        let slot_path = root.slot_path(request.slot);
        let info_path = slot_path.join("info.json");
        if !info_path.exists() {
            return Err(EngineError::LackInfoFile(slot_path.display().to_string()));
        }
        let info = read_info(&info_path)?;

        for dimension in &info.backup_dimension {
            self.dimension_entry(dimension)
                .map_err(|_| EngineError::InvalidInfoDimension(slot_path.display().to_string(), dimension.clone()))?;
        }

        if !slot_has_region_data(&slot_path)? {
            return Err(EngineError::LackRegionFile(slot_path.display().to_string()));
        }

        self.coordinator.request_confirm(host, request.confirm_timeout)?;
        self.coordinator.run_countdown(host, request.countdown_seconds)?;

        host.stop_server().map_err(EngineError::Io)?;
        host.on_server_stopped();

        let overwrite_dir = root.path().join(&self.config.overwrite_backup_folder);
        let is_overwrite_buffer = slot_path == overwrite_dir;
        if !is_overwrite_buffer {
            if overwrite_dir.exists() {
                fs::remove_dir_all(&overwrite_dir)?;
            }
            fs::create_dir_all(&overwrite_dir)?;
        }

        for dimension in &info.backup_dimension {
            let entry = self.dimension_entry(dimension)?;
            let world_dir = Path::new(&self.config.server_path).join(&entry.world_name);

            for subfolder in &entry.region_folder {
                let target_dir = world_dir.join(subfolder);
                let slot_dir = slot_path.join(&entry.world_name).join(subfolder);
                let overwrite_dir = overwrite_dir.join(&entry.world_name).join(subfolder);

                match info.backup_type {
                    BackupType::Region => {
                        restore_region_tree(&slot_dir, &target_dir, if is_overwrite_buffer { None } else { Some(&overwrite_dir) })?;
                    }
                    BackupType::Chunk => {
                        restore_chunk_subfolder(&slot_dir, &target_dir, if is_overwrite_buffer { None } else { Some(&overwrite_dir) })?;
                    }
                    BackupType::Custom => {
                        restore_custom_subfolder(&slot_dir, &target_dir, &info, dimension, if is_overwrite_buffer { None } else { Some(&overwrite_dir) })?;
                    }
                }
            }
        }

        if !is_overwrite_buffer {
            remove_empty_dirs(&overwrite_dir);
            let restore_info = SlotInfo {
                time: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                backup_type: info.backup_type,
                backup_dimension: info.backup_dimension.clone(),
                user: CONSOLE_USER.to_string(),
                comment: format!("restored from slot {}", request.slot),
                command: "restore".to_string(),
                version_created: env!("CARGO_PKG_VERSION").to_string(),
                minecraft_version: self.minecraft_version.clone(),
                user_pos: None,
                chunk_top_left_pos: None,
                chunk_bottom_right_pos: None,
                custom_name: None,
                user_created: None,
                time_created: None,
                sub_slot: None,
            };
            write_info(&overwrite_dir.join("info.json"), &restore_info)?;
        }

        host.start_server().map_err(EngineError::Io)?;
        info!(slot = request.slot, "restore complete");
        Ok(())
    }

    /// Snapshot a custom definition: union every sub-slot's selector per
    /// dimension and run the ordinary snapshot flow with `kind=custom`.
    pub fn save_custom(&self, definition: &CustomDefinition, root: RootKind, user: &str, comment: &str, host: &dyn HostAdapter) -> Result<SlotInfo, EngineError> {
        let dimensions: Vec<DimensionTarget> = definition
            .dimensions()
            .into_iter()
            .map(|dimension| {
                let selectors: Vec<&Selector> = definition.selectors_for_dimension(&dimension).collect();
                let grouping = combine_and_group(selectors);
                DimensionTarget { canonical_id: dimension, grouping: Some(grouping) }
            })
            .collect();

        let sub_slot: BTreeMap<String, SubSlotInfo> = definition
            .sub_slots()
            .map(|(key, sub)| {
                let (top_left, bottom_right) = sub.selector.corner_chunks();
                (
                    key.to_string(),
                    SubSlotInfo {
                        time_created: sub.created_time.clone(),
                        backup_type: "custom".to_string(),
                        backup_dimension: sub.dimension.clone(),
                        user_created: sub.created_by.clone(),
                        chunk_top_left_pos: top_left,
                        chunk_bottom_right_pos: bottom_right,
                        command: sub.origin_command.clone(),
                        comment: sub.comment.clone(),
                        version_created: env!("CARGO_PKG_VERSION").to_string(),
                    },
                )
            })
            .collect();

        self.snapshot(
            SnapshotRequest {
                kind: BackupType::Custom,
                root,
                dimensions,
                comment: comment.to_string(),
                command: format!("custom save {}", definition.name),
                user: user.to_string(),
                user_pos: None,
                chunk_top_left_pos: None,
                chunk_bottom_right_pos: None,
                custom_name: Some(definition.name.clone()),
                user_created: Some(definition.user_created.clone()),
                time_created: Some(definition.time_created.clone()),
                sub_slot: Some(sub_slot),
                handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            },
            host,
        )
    }

    /// Restore some or all sub-slots of a custom-kind slot, rebuilding
    /// selectors from the stored corner positions.
    pub fn partial_restore_custom(&self, root: RootKind, slot: usize, sub_ids: Option<&[u32]>, host: &dyn HostAdapter) -> Result<(), EngineError> {
        let root_handle = self.root(root);
        let slot_path = root_handle.slot_path(slot);
        let info_path = slot_path.join("info.json");
        let info = read_info(&info_path)?;
        if info.backup_type != BackupType::Custom {
            return Err(EngineError::NotCustom(slot_path.display().to_string()));
        }
        let all_subs = info.sub_slot.clone().unwrap_or_default();

        let requested: Vec<(String, SubSlotInfo)> = match sub_ids {
            None => all_subs.into_iter().collect(),
            Some(ids) => {
                let mut out = Vec::new();
                for id in ids {
                    let key = id.to_string();
                    let sub = all_subs
                        .get(&key)
                        .ok_or_else(|| EngineError::UnidentifiedSubSlot { custom: slot_path.display().to_string(), sub: *id })?;
                    out.push((key, sub.clone()));
                }
                out
            }
        };

        let mut by_dimension: BTreeMap<String, Vec<(i32, i32)>> = BTreeMap::new();
        for (_, sub) in &requested {
            let selector = Selector::from_bounds(
                SelectorMode::Rectangle,
                sub.chunk_top_left_pos,
                sub.chunk_bottom_right_pos,
                self.config.max_chunk_length,
                true,
            )?;
            by_dimension.entry(sub.backup_dimension.clone()).or_default().extend(selector.chunks());
        }

        for (dimension, chunks) in by_dimension {
            let entry = self.dimension_entry(&dimension)?;
            let world_dir = Path::new(&self.config.server_path).join(&entry.world_name);
            let grouped = combine_and_group_chunks(&chunks);

            for subfolder in &entry.region_folder {
                let target_dir = world_dir.join(subfolder);
                let slot_dir = slot_path.join(&entry.world_name).join(subfolder);

                for (region_filename, selection) in &grouped {
                    let chunk_list = match selection {
                        RegionSelection::Full => region_chunks(region_filename)?,
                        RegionSelection::Chunks(list) => list.clone(),
                    };
                    let source = slot_dir.join(region_filename.replace(".mca", ".region"));
                    let target = target_dir.join(region_filename);
                    region::merge_custom(&source, &target, &chunk_list, true, None)?;
                }
            }
        }

        host.log(&format!("partial restore of custom slot {slot} complete"));
        Ok(())
    }
}

/// Group the actual chunk set by region file. Unlike rebuilding a selector
/// from the set's bounding box, this never invents coverage for chunks that
/// fall in the gap between two disjoint sub-regions of the same dimension.
fn combine_and_group_chunks(chunks: &[(i32, i32)]) -> GroupedChunks {
    group_chunks(chunks.iter().copied())
}

/// Every absolute chunk coordinate belonging to the region file named
/// `region_filename`, used when a group's selection is
/// [`RegionSelection::Full`] and a chunk list restricted to that one region
/// is still needed (`merge_custom` takes chunks for a single target file).
fn region_chunks(region_filename: &str) -> Result<Vec<(i32, i32)>, RegionError> {
    let (rx, rz) = region::parse_region_filename(Path::new(region_filename))?;
    Ok((0..32).flat_map(move |lz| (0..32).map(move |lx| (rx * 32 + lx, rz * 32 + lz))).collect())
}

enum ExportJob {
    ExportGroup { src_dir: PathBuf, dst_dir: PathBuf, region_filename: String, selection: RegionSelection },
    CopyTree { src_dir: PathBuf, dst_dir: PathBuf },
}

impl ExportJob {
    fn run(self) -> Result<(), RegionError> {
        match self {
            ExportJob::ExportGroup { src_dir, dst_dir, region_filename, selection } => {
                let report = region::export_group(&src_dir, &dst_dir, &region_filename, &selection)?;
                debug!(region = %report.region_filename, chunks = report.chunk_count, "exported region group");
                Ok(())
            }
            ExportJob::CopyTree { src_dir, dst_dir } => copy_mca_files(&src_dir, &dst_dir),
        }
    }
}

/// Copy every top-level `*.mca` file from `src_dir` into `dst_dir`,
/// ignoring subdirectories.
fn copy_mca_files(src_dir: &Path, dst_dir: &Path) -> Result<(), RegionError> {
    fs::create_dir_all(dst_dir)?;
    if !src_dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(src_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if name.to_str().is_some_and(|n| n.ends_with(".mca")) {
            fs::copy(entry.path(), dst_dir.join(&name))?;
        }
    }
    Ok(())
}

/// Replace `target_dir`'s `*.mca` files with `slot_dir`'s, capturing the
/// prior tree into `overwrite_dir` first (unless restoring from the
/// overwrite buffer itself).
fn restore_region_tree(slot_dir: &Path, target_dir: &Path, overwrite_dir: Option<&Path>) -> Result<(), EngineError> {
    if let Some(overwrite_dir) = overwrite_dir {
        copy_mca_files(target_dir, overwrite_dir)?;
    }
    copy_mca_files(slot_dir, target_dir)?;
    Ok(())
}

/// For a chunk-kind slot, restore either whole `.mca` files (copied
/// verbatim at snapshot time) or sparse `.region` files (merged in).
fn restore_chunk_subfolder(slot_dir: &Path, target_dir: &Path, overwrite_dir: Option<&Path>) -> Result<(), EngineError> {
    fs::create_dir_all(target_dir)?;
    if !slot_dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(slot_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name_str) = name.to_str() else { continue };

        if let Some(stem) = name_str.strip_suffix(".mca") {
            let target = target_dir.join(format!("{stem}.mca"));
            if let Some(overwrite_dir) = overwrite_dir {
                if target.exists() {
                    fs::create_dir_all(overwrite_dir)?;
                    fs::copy(&target, overwrite_dir.join(format!("{stem}.mca")))?;
                }
            }
            fs::copy(entry.path(), &target)?;
        } else if let Some(stem) = name_str.strip_suffix(".region") {
            let target = target_dir.join(format!("{stem}.mca"));
            let backup_path = overwrite_dir.map(|dir| dir.join(format!("{stem}.region")));
            if let Some(dir) = overwrite_dir {
                fs::create_dir_all(dir)?;
            }
            region::merge_sparse_into_mca(&entry.path(), &target, true, backup_path.as_deref())?;
        }
    }
    Ok(())
}

/// For a custom-kind slot, dispatch per-sub-region using `merge_custom`
/// restricted to the one dimension being processed.
fn restore_custom_subfolder(slot_dir: &Path, target_dir: &Path, info: &SlotInfo, dimension: &str, overwrite_dir: Option<&Path>) -> Result<(), EngineError> {
    fs::create_dir_all(target_dir)?;
    let Some(sub_slots) = &info.sub_slot else { return Ok(()) };

    let chunks: Vec<(i32, i32)> = sub_slots
        .values()
        .filter(|sub| sub.backup_dimension == dimension)
        .flat_map(|sub| {
            let (min, max) = (sub.chunk_top_left_pos, sub.chunk_bottom_right_pos);
            (min.0..=max.0).flat_map(move |cx| (min.1..=max.1).map(move |cz| (cx, cz)))
        })
        .collect();
    if chunks.is_empty() {
        return Ok(());
    }

    let grouped = combine_and_group_chunks(&chunks);
    for (region_filename, selection) in grouped {
        let chunk_list = match selection {
            RegionSelection::Full => region_chunks(&region_filename)?,
            RegionSelection::Chunks(list) => list,
        };
        let source = slot_dir.join(region_filename.replace(".mca", ".region"));
        let target = target_dir.join(&region_filename);
        let backup_path = overwrite_dir.map(|dir| dir.join(region_filename.replace(".mca", ".region")));
        if let Some(dir) = overwrite_dir {
            fs::create_dir_all(dir)?;
        }
        region::merge_custom(&source, &target, &chunk_list, true, backup_path.as_deref())?;
    }
    Ok(())
}

fn slot_has_region_data(slot_path: &Path) -> Result<bool, EngineError> {
    Ok(walk_files(slot_path)?.any(|path| {
        path.extension().is_some_and(|ext| ext == "mca" || ext == "region")
    }))
}

fn walk_files(root: &Path) -> Result<impl Iterator<Item = PathBuf>, EngineError> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        if !dir.is_dir() {
            continue;
        }
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                out.push(path);
            }
        }
    }
    Ok(out.into_iter())
}

fn remove_empty_dirs(root: &Path) {
    let Ok(entries) = fs::read_dir(root) else { return };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            remove_empty_dirs(&path);
            if fs::read_dir(&path).is_ok_and(|mut d| d.next().is_none()) {
                let _ = fs::remove_dir(&path);
            }
        }
    }
}

fn write_info(path: &Path, info: &SlotInfo) -> Result<(), EngineError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(info)?;
    fs::write(path, json)?;
    Ok(())
}

fn read_info(path: &Path) -> Result<SlotInfo, EngineError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Total size of everything under `path`, as both a human-readable string
/// and the raw byte count.
pub fn folder_size(path: &Path) -> (String, u64) {
    let total = walk_files(path).map(|files| files.filter_map(|f| f.metadata().ok()).map(|m| m.len()).sum()).unwrap_or(0);
    (format_bytes(total), total)
}

/// Render a byte count as `B`/`KB`/`MB`/`GB`/`TB`/`PB` with two decimals.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{size:.2}{unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.2}PB")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_picks_the_right_unit() {
        assert_eq!(format_bytes(512), "512.00B");
        assert_eq!(format_bytes(2048), "2.00KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00MB");
    }

    #[test]
    fn folder_size_sums_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.bin"), vec![0u8; 100]).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/b.bin"), vec![0u8; 50]).unwrap();

        let (_, total) = folder_size(dir.path());
        assert_eq!(total, 150);
    }

    #[test]
    fn region_chunks_stays_within_its_own_region() {
        let chunks = region_chunks("r.-1.2.mca").unwrap();
        assert_eq!(chunks.len(), 1024);
        assert!(chunks.iter().all(|&(cx, cz)| (-32..0).contains(&cx) && (64..96).contains(&cz)));
    }

    #[test]
    fn combine_and_group_chunks_does_not_fill_the_gap_between_disjoint_chunks() {
        let chunks = [(0, 0), (10, 10)];
        let grouped = combine_and_group_chunks(&chunks);
        match grouped.get("r.0.0.mca").unwrap() {
            RegionSelection::Chunks(list) => assert_eq!(list.len(), 2),
            RegionSelection::Full => panic!("two disjoint chunks must never be reported as a full region"),
        }
    }

    #[test]
    fn copy_mca_files_skips_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("r.0.0.mca"), b"data").unwrap();
        fs::write(src.join("nested/r.1.0.mca"), b"nested").unwrap();
        fs::write(src.join("readme.txt"), b"ignore me").unwrap();

        copy_mca_files(&src, &dst).unwrap();
        assert!(dst.join("r.0.0.mca").exists());
        assert!(!dst.join("nested").exists());
        assert!(!dst.join("readme.txt").exists());
    }
}
