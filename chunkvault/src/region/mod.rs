//! Anvil `.mca`/`.region` file codec: sector-level reads and writes only.
//!
//! This module never inflates or deflates chunk payloads; it only moves the
//! `length | compression | data` records between sectors. See
//! [`alloc`](super::region::alloc) for the free-sector allocator used by the
//! merge operations.

pub mod alloc;

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use tracing::warn;

use crate::selector::RegionSelection;

use alloc::SectorAllocator;

pub const SECTOR_BYTES: u64 = 4096;
pub const HEADER_BYTES: u64 = 8192;

/// Error type for every region-file level operation.
#[derive(thiserror::Error, Debug)]
pub enum RegionError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("region filename {0:?} does not match the r.<x>.<z>.mca/.region pattern")]
    UnparseableFilename(PathBuf),
    #[error("chunk range in the region header is illegal (out of bounds or overlapping)")]
    IllegalRange,
    #[error("unsupported chunk compression type {0}")]
    IllegalCompression(u8),
    #[error("chunk payload needs {0} sectors, more than a region header can address (255)")]
    OutOfSector(u32),
}

/// Local index of a chunk within its region file, `0..1024`.
///
/// Uses floor-mod, not truncating remainder: `(cx mod 32, cz mod 32)` must
/// stay in `0..32` even for negative chunk coordinates.
#[inline]
pub fn local_index(cx: i32, cz: i32) -> usize {
    let lx = cx.rem_euclid(32) as usize;
    let lz = cz.rem_euclid(32) as usize;
    lx + lz * 32
}

/// Region file coordinates containing the given chunk.
#[inline]
pub fn region_coords_of(cx: i32, cz: i32) -> (i32, i32) {
    (cx >> 5, cz >> 5)
}

/// Region filename for the given region coordinates, e.g. `r.-1.-1.mca`.
pub fn region_filename(rx: i32, rz: i32, ext: &str) -> String {
    format!("r.{rx}.{rz}.{ext}")
}

/// Parse `r.<rx>.<rz>.<ext>` back into region coordinates.
pub fn parse_region_filename(path: &Path) -> Result<(i32, i32), RegionError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| RegionError::UnparseableFilename(path.to_path_buf()))?;
    let mut parts = name.split('.');
    let first = parts.next();
    let rx = parts.next().and_then(|s| s.parse::<i32>().ok());
    let rz = parts.next().and_then(|s| s.parse::<i32>().ok());
    match (first, rx, rz) {
        (Some("r"), Some(rx), Some(rz)) => Ok((rx, rz)),
        _ => Err(RegionError::UnparseableFilename(path.to_path_buf())),
    }
}

/// Decoded offset-table entry: `(sector_start << 8) | sector_count`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectorRange {
    pub offset: u32,
    pub count: u32,
}

impl SectorRange {
    fn is_empty(self) -> bool {
        self.offset == 0 || self.count == 0
    }

    fn decode(raw: u32) -> Self {
        Self { offset: raw >> 8, count: raw & 0xFF }
    }

    fn encode(self) -> u32 {
        (self.offset << 8) | (self.count & 0xFF)
    }
}

/// Parsed header of a region file: 1024 offset entries, 1024 timestamps, and
/// the total sector count the file occupies.
#[derive(Debug, Clone)]
pub struct RegionHeader {
    pub offsets: [SectorRange; 1024],
    pub timestamps: [u32; 1024],
    pub file_sector_count: u32,
}

/// Read the 8KB header of a region file, tolerating truncated entries.
///
/// Entries whose `start + count` exceeds the file's sector count are
/// demoted to "absent" and a warning is logged; parsing never aborts.
pub fn parse_header(path: &Path) -> Result<RegionHeader, RegionError> {
    let mut file = File::open(path)?;
    let file_len = file.seek(SeekFrom::End(0))?;
    let file_sector_count = file_len.div_ceil(SECTOR_BYTES) as u32;
    if file_len % SECTOR_BYTES != 0 {
        warn!("region file {} size {file_len} is not sector-aligned", path.display());
    }

    file.seek(SeekFrom::Start(0))?;
    let mut offsets = [SectorRange::default(); 1024];
    for slot in offsets.iter_mut() {
        let raw = file.read_u32::<BigEndian>()?;
        let range = SectorRange::decode(raw);
        if !range.is_empty() && range.offset.saturating_add(range.count) > file_sector_count {
            warn!(
                "region file {} has an out-of-range chunk entry (offset={}, count={}, file has {} sectors); demoting to absent",
                path.display(), range.offset, range.count, file_sector_count,
            );
            *slot = SectorRange::default();
        } else {
            *slot = range;
        }
    }

    let mut timestamps = [0u32; 1024];
    for slot in timestamps.iter_mut() {
        *slot = file.read_u32::<BigEndian>()?;
    }

    Ok(RegionHeader { offsets, timestamps, file_sector_count })
}

/// Outcome of reading a single chunk slot.
#[derive(Debug, Clone)]
pub enum ChunkRead {
    /// A real, still-compressed chunk payload.
    Present(ChunkPayload),
    /// Explicit-empty marker: `offset=0, timestamp=1`. Only meaningful in
    /// `.region` files; tells a restore to erase this slot.
    Empty,
    /// Not selected / never written: `offset=0, timestamp=0`.
    Absent,
}

#[derive(Debug, Clone)]
pub struct ChunkPayload {
    pub compression: u8,
    pub payload: Vec<u8>,
    pub timestamp: u32,
}

/// Read one chunk's raw (still-compressed) payload from a region file.
///
/// Never decompresses. Tolerates I/O failure by logging a warning and
/// returning `Absent` rather than propagating the error, per the codec's
/// fail-tolerant contract.
pub fn read_chunk(path: &Path, cx: i32, cz: i32) -> ChunkRead {
    match read_chunk_inner(path, cx, cz) {
        Ok(result) => result,
        Err(err) => {
            warn!("failed to read chunk ({cx}, {cz}) from {}: {err}", path.display());
            ChunkRead::Absent
        }
    }
}

fn read_chunk_inner(path: &Path, cx: i32, cz: i32) -> Result<ChunkRead, RegionError> {
    let header = parse_header(path)?;
    let index = local_index(cx, cz);
    let range = header.offsets[index];
    let timestamp = header.timestamps[index];

    if range.is_empty() {
        return Ok(if timestamp == 1 { ChunkRead::Empty } else { ChunkRead::Absent });
    }

    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(range.offset as u64 * SECTOR_BYTES))?;
    let length = file.read_u32::<BigEndian>()?;
    if length == 0 {
        return Err(RegionError::IllegalRange);
    }
    let compression = file.read_u8()?;
    let mut payload = vec![0u8; length as usize - 1];
    file.read_exact(&mut payload)?;

    Ok(ChunkRead::Present(ChunkPayload { compression, payload, timestamp }))
}

/// Write exactly 8192 zero bytes: an empty region file with no chunks.
pub fn init_region(path: &Path) -> Result<(), RegionError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(&[0u8; HEADER_BYTES as usize])?;
    Ok(())
}

/// A sector-count field is 8 bits wide: a chunk can occupy at most 255
/// sectors (~1MB once the length prefix and compression tag are included).
pub const MAX_SECTOR_COUNT: u32 = 0xFF;

/// Sectors needed to store a chunk payload of `len` compressed bytes,
/// including the 4-byte length prefix and 1-byte compression tag.
#[inline]
pub fn sectors_needed(len: usize) -> u32 {
    ((len + 5) as u64).div_ceil(SECTOR_BYTES) as u32
}

/// Sectors needed for `len`, rejecting payloads too large for the header's
/// 8-bit sector-count field instead of silently truncating it.
fn checked_sectors_needed(len: usize) -> Result<u32, RegionError> {
    let count = sectors_needed(len);
    if count > MAX_SECTOR_COUNT {
        return Err(RegionError::OutOfSector(count));
    }
    Ok(count)
}

/// Emit a sparse `.region` file from a map of local `(lx, lz)` slots.
///
/// A present entry is written as a real payload; a `None` entry is written
/// as the explicit-empty marker (`offset=0, timestamp=1`) — a source
/// timestamp of `0` is normalized to `1` so it cannot collide with the
/// not-selected encoding. Slots absent from `entries` are left as
/// `(offset=0, timestamp=0)`, i.e. not-selected.
pub fn write_sparse_region(
    path: &Path,
    entries: &BTreeMap<(u8, u8), Option<ChunkPayload>>,
) -> Result<(), RegionError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut offsets = [SectorRange::default(); 1024];
    let mut timestamps = [0u32; 1024];
    let mut bodies: Vec<(usize, u8, Vec<u8>)> = Vec::new();
    let mut sector_cursor = 2u32;

    for (&(lx, lz), entry) in entries {
        let index = lx as usize + lz as usize * 32;
        match entry {
            None => {
                timestamps[index] = 1;
            }
            Some(chunk) => {
                let count = checked_sectors_needed(chunk.payload.len())?;
                offsets[index] = SectorRange { offset: sector_cursor, count };
                timestamps[index] = if chunk.timestamp == 0 { 1 } else { chunk.timestamp };
                bodies.push((index, chunk.compression, chunk.payload.clone()));
                sector_cursor += count;
            }
        }
    }

    let mut file = File::create(path)?;
    for range in &offsets {
        file.write_u32::<BigEndian>(range.encode())?;
    }
    for ts in &timestamps {
        file.write_u32::<BigEndian>(*ts)?;
    }

    for (index, compression, payload) in bodies {
        let range = offsets[index];
        file.write_u32::<BigEndian>(payload.len() as u32 + 1)?;
        file.write_u8(compression)?;
        file.write_all(&payload)?;
        let written = 4 + 1 + payload.len();
        let padded = range.count as usize * SECTOR_BYTES as usize;
        file.write_all(&vec![0u8; padded - written])?;
    }

    Ok(())
}

/// What to do with one source chunk slot during a merge into a live `.mca`.
enum MergeAction {
    Skip,
    Clear,
    Write(ChunkPayload),
}

/// `clear_absent` distinguishes the two merge flavors: `merge_sparse_into_mca`
/// always ignores a truly-absent source slot, while `merge_custom` clears
/// the target for any requested chunk the source has nothing for, as long
/// as `overwrite` is set.
fn plan_action(read: ChunkRead, overwrite: bool, clear_absent: bool) -> MergeAction {
    match read {
        ChunkRead::Absent => if overwrite && clear_absent { MergeAction::Clear } else { MergeAction::Skip },
        ChunkRead::Empty => if overwrite { MergeAction::Clear } else { MergeAction::Skip },
        ChunkRead::Present(payload) => MergeAction::Write(payload),
    }
}

/// Merge every chunk in `source_region_path` into `target_mca_path`,
/// allocating space with best-fit and optionally capturing what gets
/// overwritten into `backup_path`.
pub fn merge_sparse_into_mca(
    source_region_path: &Path,
    target_mca_path: &Path,
    overwrite: bool,
    backup_path: Option<&Path>,
) -> Result<(), RegionError> {
    let source_header = parse_header(source_region_path)?;

    let mut locals = Vec::new();
    for index in 0..1024usize {
        let range = source_header.offsets[index];
        let timestamp = source_header.timestamps[index];
        if range.is_empty() && timestamp == 0 {
            continue;
        }
        let lx = (index % 32) as i32;
        let lz = (index / 32) as i32;
        locals.push((lx, lz));
    }

    merge_selected(source_region_path, target_mca_path, &locals, overwrite, backup_path, false)
}

/// Identical to [`merge_sparse_into_mca`] but restricted to `chunk_list`
/// (absolute chunk coordinates); chunks in `chunk_list` that the source has
/// no data for are treated as explicit-empty when `overwrite` is set.
pub fn merge_custom(
    source_region_path: &Path,
    target_mca_path: &Path,
    chunk_list: &[(i32, i32)],
    overwrite: bool,
    backup_path: Option<&Path>,
) -> Result<(), RegionError> {
    let (rx, rz) = parse_region_filename(target_mca_path)?;
    let locals: Vec<(i32, i32)> = chunk_list
        .iter()
        .map(|&(cx, cz)| (cx - rx * 32, cz - rz * 32))
        .collect();
    merge_selected(source_region_path, target_mca_path, &locals, overwrite, backup_path, true)
}

fn merge_selected(
    source_region_path: &Path,
    target_mca_path: &Path,
    locals: &[(i32, i32)],
    overwrite: bool,
    backup_path: Option<&Path>,
    clear_absent: bool,
) -> Result<(), RegionError> {
    let source_exists = source_region_path.exists();

    if let Some(parent) = target_mca_path.parent() {
        fs::create_dir_all(parent)?;
    }
    if !target_mca_path.exists() {
        init_region(target_mca_path)?;
    }

    let (rx, rz) = parse_region_filename(target_mca_path)?;
    let target_header = parse_header(target_mca_path)?;
    let target_len = target_mca_path.metadata()?.len();
    let mut allocator = SectorAllocator::scan(&target_header, target_len);

    let mut target_file = OpenOptions::new().read(true).write(true).open(target_mca_path)?;
    let mut backup_entries: BTreeMap<(u8, u8), Option<ChunkPayload>> = BTreeMap::new();

    for &(lx, lz) in locals {
        let index = lx as usize + lz as usize * 32;
        let abs_cx = rx * 32 + lx;
        let abs_cz = rz * 32 + lz;

        let source_read = if source_exists {
            read_chunk(source_region_path, abs_cx, abs_cz)
        } else {
            ChunkRead::Absent
        };

        let action = plan_action(source_read, overwrite, clear_absent);
        if matches!(action, MergeAction::Skip) {
            continue;
        }

        if backup_path.is_some() {
            // Record every slot about to be touched, including one that is
            // currently Absent: a restore that writes a brand-new chunk here
            // must leave the overwrite buffer able to erase it again, not
            // silently omit the slot.
            let prior = match read_chunk(target_mca_path, abs_cx, abs_cz) {
                ChunkRead::Present(payload) => Some(payload),
                ChunkRead::Empty | ChunkRead::Absent => None,
            };
            backup_entries.insert((lx as u8, lz as u8), prior);
        }

        match action {
            MergeAction::Skip => unreachable!(),
            MergeAction::Clear => clear_slot(&mut target_file, &target_header, index)?,
            MergeAction::Write(payload) => {
                write_slot(&mut target_file, &target_header, &mut allocator, index, &payload)?
            }
        }
    }

    if let Some(backup_path) = backup_path {
        write_sparse_region(backup_path, &backup_entries)?;
    }

    Ok(())
}

fn clear_slot(file: &mut File, header: &RegionHeader, index: usize) -> Result<(), RegionError> {
    let range = header.offsets[index];
    if !range.is_empty() {
        file.seek(SeekFrom::Start(range.offset as u64 * SECTOR_BYTES))?;
        file.write_all(&vec![0u8; range.count as usize * SECTOR_BYTES as usize])?;
    }
    write_header_entry(file, index, SectorRange::default(), 1)
}

fn write_slot(
    file: &mut File,
    header: &RegionHeader,
    allocator: &mut SectorAllocator,
    index: usize,
    payload: &ChunkPayload,
) -> Result<(), RegionError> {
    let old_range = header.offsets[index];
    if !old_range.is_empty() {
        allocator.free(old_range);
    }

    let count = checked_sectors_needed(payload.payload.len())?;
    let start = allocator.allocate(count);
    let required_len = (start as u64 + count as u64) * SECTOR_BYTES;
    if file.metadata()?.len() < required_len {
        file.set_len(required_len)?;
    }

    file.seek(SeekFrom::Start(start as u64 * SECTOR_BYTES))?;
    file.write_u32::<BigEndian>(payload.payload.len() as u32 + 1)?;
    file.write_u8(payload.compression)?;
    file.write_all(&payload.payload)?;
    let written = 4 + 1 + payload.payload.len();
    let padded = count as usize * SECTOR_BYTES as usize;
    file.write_all(&vec![0u8; padded - written])?;

    let timestamp = if payload.timestamp == 0 { 1 } else { payload.timestamp };
    write_header_entry(file, index, SectorRange { offset: start, count }, timestamp)?;
    file.flush()?;
    Ok(())
}

fn write_header_entry(
    file: &mut File,
    index: usize,
    range: SectorRange,
    timestamp: u32,
) -> Result<(), RegionError> {
    file.seek(SeekFrom::Start(index as u64 * 4))?;
    file.write_u32::<BigEndian>(range.encode())?;
    file.seek(SeekFrom::Start(HEADER_BYTES / 2 + index as u64 * 4))?;
    file.write_u32::<BigEndian>(timestamp)?;
    Ok(())
}

/// Per-region-file export outcome, surfaced so the engine can log warnings
/// without aborting the whole snapshot.
pub struct ExportReport {
    pub region_filename: String,
    pub chunk_count: usize,
}

/// Export one region's selection from `input_dir` into `output_dir`.
///
/// If `selection` is [`RegionSelection::Full`] and the source `.mca` exists,
/// it is copied byte-for-byte; if it doesn't exist, an empty 8K region file
/// is created instead. Otherwise the requested chunks are read (absent
/// chunks are recorded as explicit-empty, so a later restore can reproduce
/// "no chunk here at snapshot time") and written as a `.region` file.
pub fn export_group(
    input_dir: &Path,
    output_dir: &Path,
    region_filename: &str,
    selection: &RegionSelection,
) -> Result<ExportReport, RegionError> {
    let src = input_dir.join(region_filename);
    fs::create_dir_all(output_dir)?;

    match selection {
        RegionSelection::Full => {
            let dst = output_dir.join(region_filename);
            if src.exists() {
                fs::copy(&src, &dst)?;
            } else {
                init_region(&dst)?;
            }
            Ok(ExportReport { region_filename: region_filename.to_string(), chunk_count: 1024 })
        }
        RegionSelection::Chunks(chunks) => {
            let (rx, rz) = parse_region_filename(Path::new(region_filename))?;
            let dst_name = region_filename.replace(".mca", ".region");
            let dst = output_dir.join(&dst_name);

            let mut entries = BTreeMap::new();
            for &(cx, cz) in chunks {
                let lx = (cx - rx * 32) as u8;
                let lz = (cz - rz * 32) as u8;
                let read = if src.exists() { read_chunk(&src, cx, cz) } else { ChunkRead::Absent };
                let entry = match read {
                    ChunkRead::Present(payload) => Some(payload),
                    ChunkRead::Empty | ChunkRead::Absent => None,
                };
                entries.insert((lx, lz), entry);
            }

            write_sparse_region(&dst, &entries)?;
            Ok(ExportReport { region_filename: dst_name, chunk_count: chunks.len() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn init_region_is_8192_zero_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.0.0.mca");
        init_region(&path).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 8192);
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn parse_header_of_fresh_region_is_all_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.0.0.mca");
        init_region(&path).unwrap();
        let header = parse_header(&path).unwrap();
        assert!(header.offsets.iter().all(|r| r.is_empty()));
        assert!(header.timestamps.iter().all(|&t| t == 0));
    }

    #[test]
    fn local_index_handles_negative_coordinates() {
        // chunk (-1, -1) lives at region (-1, -1), local (31, 31).
        assert_eq!(region_coords_of(-1, -1), (-1, -1));
        assert_eq!(local_index(-1, -1), 31 + 31 * 32);
    }

    #[test]
    fn sectors_needed_accounts_for_length_and_compression_bytes() {
        // A payload needing exactly one full sector after the 5-byte prefix.
        assert_eq!(sectors_needed(4091), 1);
        assert_eq!(sectors_needed(4092), 2);
    }

    #[test]
    fn write_sparse_region_round_trips_present_and_empty_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.0.0.region");

        let mut entries = BTreeMap::new();
        entries.insert((0u8, 0u8), Some(ChunkPayload { compression: 2, payload: vec![1, 2, 3], timestamp: 1000 }));
        entries.insert((1u8, 0u8), None);
        write_sparse_region(&path, &entries).unwrap();

        match read_chunk(&path, 0, 0) {
            ChunkRead::Present(p) => {
                assert_eq!(p.compression, 2);
                assert_eq!(p.payload, vec![1, 2, 3]);
                assert_eq!(p.timestamp, 1000);
            }
            other => panic!("expected Present, got {other:?}"),
        }

        assert!(matches!(read_chunk(&path, 1, 0), ChunkRead::Empty));
        // Never requested: stays not-selected.
        assert!(matches!(read_chunk(&path, 2, 0), ChunkRead::Absent));
    }

    #[test]
    fn write_sparse_region_normalizes_zero_timestamp_to_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.0.0.region");
        let mut entries = BTreeMap::new();
        entries.insert((0u8, 0u8), Some(ChunkPayload { compression: 2, payload: vec![9], timestamp: 0 }));
        write_sparse_region(&path, &entries).unwrap();

        match read_chunk(&path, 0, 0) {
            ChunkRead::Present(p) => assert_eq!(p.timestamp, 1),
            other => panic!("expected Present, got {other:?}"),
        }
    }

    #[test]
    fn merge_sparse_into_empty_mca_reproduces_payload() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("r.0.0.region");
        let target = dir.path().join("r.0.0.mca");

        let mut entries = BTreeMap::new();
        entries.insert((5u8, 6u8), Some(ChunkPayload { compression: 2, payload: vec![4, 5, 6, 7], timestamp: 42 }));
        write_sparse_region(&source, &entries).unwrap();

        merge_sparse_into_mca(&source, &target, true, None).unwrap();

        match read_chunk(&target, 5, 6) {
            ChunkRead::Present(p) => {
                assert_eq!(p.compression, 2);
                assert_eq!(p.payload, vec![4, 5, 6, 7]);
                assert_eq!(p.timestamp, 42);
            }
            other => panic!("expected Present, got {other:?}"),
        }
    }

    #[test]
    fn merge_backup_path_captures_pre_restore_state() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("r.0.0.mca");
        init_region(&target).unwrap();

        // Seed target with an existing chunk at (3, 3).
        let mut seed = BTreeMap::new();
        seed.insert((3u8, 3u8), Some(ChunkPayload { compression: 2, payload: vec![1], timestamp: 1 }));
        let seed_region = dir.path().join("seed.region");
        write_sparse_region(&seed_region, &seed).unwrap();
        merge_sparse_into_mca(&seed_region, &target, true, None).unwrap();

        // Now restore a different payload over it, capturing a backup.
        let mut restore = BTreeMap::new();
        restore.insert((3u8, 3u8), Some(ChunkPayload { compression: 2, payload: vec![9, 9], timestamp: 2 }));
        let restore_region = dir.path().join("restore.region");
        write_sparse_region(&restore_region, &restore).unwrap();

        let backup = dir.path().join("overwrite.region");
        merge_sparse_into_mca(&restore_region, &target, true, Some(&backup)).unwrap();

        match read_chunk(&backup, 3, 3) {
            ChunkRead::Present(p) => assert_eq!(p.payload, vec![1]),
            other => panic!("expected the pre-restore payload in the backup, got {other:?}"),
        }
    }

    #[test]
    fn merge_backup_path_records_a_newly_written_chunk_as_explicit_empty() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("r.0.0.mca");
        init_region(&target).unwrap();

        // Target has nothing at (3, 3); restore writes a brand-new chunk there.
        let mut restore = BTreeMap::new();
        restore.insert((3u8, 3u8), Some(ChunkPayload { compression: 2, payload: vec![9], timestamp: 2 }));
        let restore_region = dir.path().join("restore.region");
        write_sparse_region(&restore_region, &restore).unwrap();

        let backup = dir.path().join("overwrite.region");
        merge_sparse_into_mca(&restore_region, &target, true, Some(&backup)).unwrap();

        // Reverting the overwrite buffer back onto the target must be able to
        // erase the chunk that didn't exist before the restore.
        assert!(matches!(read_chunk(&backup, 3, 3), ChunkRead::Empty));
    }

    #[test]
    fn write_sparse_region_rejects_payload_over_255_sectors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.0.0.region");
        let mut entries = BTreeMap::new();
        let huge = vec![0u8; (MAX_SECTOR_COUNT as usize + 1) * SECTOR_BYTES as usize];
        entries.insert((0u8, 0u8), Some(ChunkPayload { compression: 2, payload: huge, timestamp: 1 }));

        let err = write_sparse_region(&path, &entries).unwrap_err();
        assert!(matches!(err, RegionError::OutOfSector(_)));
    }

    #[test]
    fn export_group_full_region_copies_byte_for_byte() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        fs::create_dir_all(&input).unwrap();
        let src = input.join("r.0.0.mca");
        init_region(&src).unwrap();

        let report = export_group(&input, &output, "r.0.0.mca", &RegionSelection::Full).unwrap();
        assert_eq!(report.chunk_count, 1024);
        assert_eq!(fs::read(output.join("r.0.0.mca")).unwrap(), fs::read(&src).unwrap());
    }

    #[test]
    fn export_group_chunks_records_absent_as_explicit_empty() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        fs::create_dir_all(&input).unwrap();
        // No source file at all: every requested chunk is Absent at read time.
        let report = export_group(
            &input,
            &output,
            "r.0.0.mca",
            &RegionSelection::Chunks(vec![(1, 1)]),
        )
        .unwrap();
        assert_eq!(report.chunk_count, 1);
        assert!(matches!(read_chunk(&output.join("r.0.0.region"), 1, 1), ChunkRead::Empty));
    }
}
