//! End-to-end coverage of the snapshot/restore flow against a real
//! filesystem layout, driven through a host adapter that answers the
//! save-off/save-all-flush handshake synchronously.

use std::collections::BTreeMap;
use std::fs;
use std::sync::{Arc, Once};
use std::time::Duration;

use chunkvault::custom::{CustomDefinition, SubSlot};
use chunkvault::info::BackupType;
use chunkvault::region::{self};
use chunkvault::selector::Selector;
use chunkvault::slot::RootKind;

use chunkvault_engine::config::{Config, DataGetterConfig, DimensionEntry};
use chunkvault_engine::coordinator::OperationCoordinator;
use chunkvault_engine::engine::{BackupEngine, DimensionTarget, RestoreRequest, SnapshotRequest};
use chunkvault_engine::host::HostAdapter;

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt().with_test_writer().try_init().ok();
    });
}

/// Stands in for the managed server: answers `execute` for the handshake
/// commands the coordinator waits on by feeding the matching log line back
/// in, synchronously, the way a real server's console output would arrive
/// on another thread but fast enough that the poll sees it immediately.
struct NoopHost {
    coordinator: Arc<OperationCoordinator>,
    data_getter: DataGetterConfig,
}

impl NoopHost {
    fn new(engine: &BackupEngine) -> Self {
        Self { coordinator: engine.coordinator().clone(), data_getter: engine.config().data_getter.clone() }
    }
}

impl HostAdapter for NoopHost {
    fn execute(&self, command: &str) {
        if command == self.data_getter.auto_save_off {
            self.coordinator.on_info("Automatic saving is now disabled");
        } else if command == self.data_getter.save_worlds {
            self.coordinator.on_info("Saved the game");
        }
    }
    fn broadcast(&self, _message: &str) {}
    fn reply(&self, _message: &str) {}
    fn log(&self, _message: &str) {}
    fn stop_server(&self) -> std::io::Result<()> {
        Ok(())
    }
    fn start_server(&self) -> std::io::Result<()> {
        Ok(())
    }
}

fn single_dimension_config(server_path: &std::path::Path, backup_path: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.server_path = server_path.to_string_lossy().to_string();
    config.backup_path = backup_path.to_string_lossy().to_string();
    config.static_backup_path = backup_path.join("static").to_string_lossy().to_string();
    config.slot = 3;
    config.max_workers = 2;
    config.dimension_info = std::collections::HashMap::from([(
        "0".to_string(),
        DimensionEntry {
            dimension: "minecraft:overworld".to_string(),
            world_name: "world".to_string(),
            region_folder: vec!["region".to_string()],
        },
    )]);
    config
}

fn make_engine(server_path: &std::path::Path, backup_path: &std::path::Path) -> BackupEngine {
    let config = single_dimension_config(server_path, backup_path);
    let coordinator = Arc::new(OperationCoordinator::new());
    BackupEngine::new(config, coordinator, "1.20.4")
}

fn chunk_snapshot_request(selector: &Selector) -> SnapshotRequest {
    let grouping = selector.group_by_region();
    let (top_left, bottom_right) = selector.corner_chunks();
    SnapshotRequest {
        kind: BackupType::Chunk,
        root: RootKind::Dynamic,
        dimensions: vec![DimensionTarget { canonical_id: "minecraft:overworld".to_string(), grouping: Some(grouping) }],
        comment: String::new(),
        command: "!!cb make".to_string(),
        user: "Steve".to_string(),
        user_pos: Some((0.5, 64.0, -7.25)),
        chunk_top_left_pos: Some(top_left),
        chunk_bottom_right_pos: Some(bottom_right),
        custom_name: None,
        user_created: None,
        time_created: None,
        sub_slot: None,
        handshake_timeout: Duration::from_secs(2),
    }
}

#[test]
fn snapshot_writes_info_json_and_region_group() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    let server_path = root.path().join("server");
    let backup_path = root.path().join("backups");
    let world_region = server_path.join("world/region");
    fs::create_dir_all(&world_region).unwrap();
    region::init_region(&world_region.join("r.0.-1.mca")).unwrap();

    let engine = make_engine(&server_path, &backup_path);
    let selector = Selector::center_radius((0.5, -7.25), 2, 320, false).unwrap();
    let host = NoopHost::new(&engine);

    let info = engine.snapshot(chunk_snapshot_request(&selector), &host).unwrap();
    assert_eq!(info.backup_type, BackupType::Chunk);

    let slot1 = backup_path.join("slot1");
    assert!(slot1.join("info.json").exists());
    let region_dir = slot1.join("world/region");
    let written: Vec<_> = fs::read_dir(&region_dir).unwrap().filter_map(|e| e.ok()).collect();
    assert!(!written.is_empty(), "snapshot should have written at least one region group file");
}

#[test]
fn repeated_snapshots_rotate_slots_and_respect_capacity() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    let server_path = root.path().join("server");
    let backup_path = root.path().join("backups");
    fs::create_dir_all(server_path.join("world/region")).unwrap();

    let engine = make_engine(&server_path, &backup_path);
    let selector = Selector::rectangle((0.0, 0.0), (15.0, 15.0), 320, false).unwrap();
    let host = NoopHost::new(&engine);

    for _ in 0..4 {
        engine.snapshot(chunk_snapshot_request(&selector), &host).unwrap();
    }

    // Capacity is 3: the oldest of the four snapshots must have rotated out.
    assert!(backup_path.join("slot1").exists());
    assert!(backup_path.join("slot2").exists());
    assert!(backup_path.join("slot3").exists());
    assert!(!backup_path.join("slot4").exists());
}

#[test]
fn restore_captures_overwritten_chunks_into_overwrite_buffer() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    let server_path = root.path().join("server");
    let backup_path = root.path().join("backups");
    let world_region = server_path.join("world/region");
    fs::create_dir_all(&world_region).unwrap();

    let engine = make_engine(&server_path, &backup_path);
    let selector = Selector::rectangle((0.0, 0.0), (15.0, 15.0), 320, false).unwrap();
    let host = NoopHost::new(&engine);

    // Seed the live world with a chunk, snapshot it, then mutate the live
    // world again so the restore has something to overwrite.
    let target_mca = world_region.join("r.0.0.mca");
    region::init_region(&target_mca).unwrap();
    engine.snapshot(chunk_snapshot_request(&selector), &host).unwrap();

    let coordinator = engine.coordinator().clone();
    let confirmer = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        coordinator.confirm();
    });

    engine
        .restore(
            RestoreRequest { root: RootKind::Dynamic, slot: 1, confirm_timeout: Duration::from_secs(2), countdown_seconds: 0 },
            &host,
        )
        .unwrap();
    confirmer.join().unwrap();

    assert!(backup_path.join("overwrite/info.json").exists());
}

#[test]
fn custom_save_spans_two_dimensions_in_one_slot() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    let server_path = root.path().join("server");
    let backup_path = root.path().join("backups");

    let mut config = single_dimension_config(&server_path, &backup_path);
    config.dimension_info.insert(
        "-1".to_string(),
        DimensionEntry {
            dimension: "minecraft:the_nether".to_string(),
            world_name: "world".to_string(),
            region_folder: vec!["DIM-1/region".to_string()],
        },
    );
    fs::create_dir_all(server_path.join("world/region")).unwrap();
    fs::create_dir_all(server_path.join("world/DIM-1/region")).unwrap();

    let coordinator = Arc::new(OperationCoordinator::new());
    let engine = BackupEngine::new(config, coordinator, "1.20.4");
    let host = NoopHost::new(&engine);

    let mut definition = CustomDefinition::new("farm", "2026-01-01 00:00:00", "Steve");
    definition.add_sub(SubSlot {
        selector: Selector::rectangle((0.0, 0.0), (159.0, 0.0), 320, false).unwrap(),
        dimension: "minecraft:overworld".to_string(),
        comment: String::new(),
        origin_command: "custom add farm".to_string(),
        created_time: "2026-01-01 00:00:00".to_string(),
        created_by: "Steve".to_string(),
    });
    definition.add_sub(SubSlot {
        selector: Selector::rectangle((0.0, 0.0), (63.0, 0.0), 320, false).unwrap(),
        dimension: "minecraft:the_nether".to_string(),
        comment: String::new(),
        origin_command: "custom add farm".to_string(),
        created_time: "2026-01-01 00:00:00".to_string(),
        created_by: "Steve".to_string(),
    });

    let info = engine.save_custom(&definition, RootKind::Dynamic, "Steve", "", &host).unwrap();
    assert_eq!(info.backup_type, BackupType::Custom);
    assert_eq!(info.sub_slot.unwrap().len(), 2);
    assert!(backup_path.join("slot1/world/region").exists());
    assert!(backup_path.join("slot1/world/DIM-1/region").exists());
}

/// Two disjoint sub-slots in the same dimension must not cause a partial
/// restore to touch the chunks sitting in the gap between them.
#[test]
fn partial_restore_custom_leaves_the_gap_between_sub_regions_untouched() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    let server_path = root.path().join("server");
    let backup_path = root.path().join("backups");
    let world_region = server_path.join("world/region");
    fs::create_dir_all(&world_region).unwrap();

    let engine = make_engine(&server_path, &backup_path);
    let host = NoopHost::new(&engine);
    let target_mca = world_region.join("r.0.0.mca");

    let chunk = |byte: u8| region::ChunkPayload { compression: 2, payload: vec![byte], timestamp: 100 };
    let mut seed = BTreeMap::new();
    seed.insert((0u8, 0u8), Some(chunk(1))); // sub-slot A
    seed.insert((10u8, 10u8), Some(chunk(2))); // sub-slot B
    seed.insert((5u8, 5u8), Some(chunk(99))); // the gap between them
    let seed_region = root.path().join("seed.region");
    region::write_sparse_region(&seed_region, &seed).unwrap();
    region::merge_sparse_into_mca(&seed_region, &target_mca, true, None).unwrap();

    let mut definition = CustomDefinition::new("two-farms", "2026-01-01 00:00:00", "Steve");
    definition.add_sub(SubSlot {
        selector: Selector::rectangle((0.0, 0.0), (0.0, 0.0), 320, false).unwrap(),
        dimension: "minecraft:overworld".to_string(),
        comment: String::new(),
        origin_command: "custom add two-farms".to_string(),
        created_time: "2026-01-01 00:00:00".to_string(),
        created_by: "Steve".to_string(),
    });
    definition.add_sub(SubSlot {
        selector: Selector::rectangle((160.0, 160.0), (160.0, 160.0), 320, false).unwrap(),
        dimension: "minecraft:overworld".to_string(),
        comment: String::new(),
        origin_command: "custom add two-farms".to_string(),
        created_time: "2026-01-01 00:00:00".to_string(),
        created_by: "Steve".to_string(),
    });
    engine.save_custom(&definition, RootKind::Dynamic, "Steve", "", &host).unwrap();

    // Drift the live world after the backup: the gap chunk changes, and both
    // farm chunks change too, so the restore has something to undo.
    let mut drift = BTreeMap::new();
    drift.insert((0u8, 0u8), Some(chunk(11)));
    drift.insert((10u8, 10u8), Some(chunk(22)));
    drift.insert((5u8, 5u8), Some(chunk(199)));
    let drift_region = root.path().join("drift.region");
    region::write_sparse_region(&drift_region, &drift).unwrap();
    region::merge_sparse_into_mca(&drift_region, &target_mca, true, None).unwrap();

    engine.partial_restore_custom(RootKind::Dynamic, 1, None, &host).unwrap();

    match region::read_chunk(&target_mca, 0, 0) {
        region::ChunkRead::Present(p) => assert_eq!(p.payload, vec![1]),
        other => panic!("expected sub-slot A restored, got {other:?}"),
    }
    match region::read_chunk(&target_mca, 10, 10) {
        region::ChunkRead::Present(p) => assert_eq!(p.payload, vec![2]),
        other => panic!("expected sub-slot B restored, got {other:?}"),
    }
    match region::read_chunk(&target_mca, 5, 5) {
        region::ChunkRead::Present(p) => assert_eq!(p.payload, vec![199], "gap chunk must survive the partial restore untouched"),
        other => panic!("gap chunk must still be present, got {other:?}"),
    }
}
