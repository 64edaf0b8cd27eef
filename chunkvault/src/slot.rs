//! Slot directory layout, numbering and rotation under a backup root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

#[derive(thiserror::Error, Debug)]
pub enum SlotError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("dynamic root already holds {existing} slots, more than its capacity of {capacity}; prune manually")]
    DynamicMore { existing: usize, capacity: usize },
    #[error("static root already holds {existing} slots, at or above its capacity of {capacity}")]
    StaticMore { existing: usize, capacity: usize },
}

/// Which of the two capacity-limited parent directories a slot lives under.
///
/// Dynamic rotates (oldest dropped to make room); static refuses new
/// snapshots once full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    Dynamic,
    Static,
}

/// A backup root: one parent directory plus its slot capacity.
pub struct SlotRoot {
    path: PathBuf,
    kind: RootKind,
    capacity: usize,
}

impl SlotRoot {
    pub fn new(path: impl Into<PathBuf>, kind: RootKind, capacity: usize) -> Self {
        Self { path: path.into(), kind, capacity }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> RootKind {
        self.kind
    }

    pub fn slot_path(&self, n: usize) -> PathBuf {
        self.path.join(format!("slot{n}"))
    }

    fn ensure_exists(&self) -> Result<(), SlotError> {
        fs::create_dir_all(&self.path)?;
        Ok(())
    }

    /// Numbered `slot<N>` directories directly under this root, sorted
    /// numerically (not lexicographically — `slot2` sorts before `slot10`).
    pub fn list_numeric_slots(&self) -> Result<Vec<usize>, SlotError> {
        self.ensure_exists()?;
        let mut slots = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(n) = parse_slot_name(name) {
                slots.push(n);
            }
        }
        slots.sort_unstable();
        Ok(slots)
    }

    /// Make room for a new `slot1`, shifting every existing `slot_i` to
    /// `slot_{i+1}`. On the dynamic root, the highest-numbered slot is
    /// deleted if the root is already at capacity; the static root refuses
    /// instead. Returns the freshly created, empty `slot1` path.
    pub fn rotate_for_new(&self) -> Result<PathBuf, SlotError> {
        self.ensure_exists()?;
        let mut existing = self.list_numeric_slots()?;

        if existing.len() > self.capacity {
            return Err(capacity_error(self.kind, existing.len(), self.capacity));
        }

        if existing.len() == self.capacity {
            match self.kind {
                RootKind::Dynamic => {
                    let highest = *existing.last().expect("capacity > 0 implies non-empty");
                    debug!("dynamic root at capacity, deleting slot{highest}");
                    fs::remove_dir_all(self.slot_path(highest))?;
                    existing.pop();
                }
                RootKind::Static => {
                    return Err(capacity_error(self.kind, existing.len(), self.capacity));
                }
            }
        }

        shift_up(&self.path, &existing)?;

        let slot1 = self.slot_path(1);
        fs::create_dir_all(&slot1)?;
        Ok(slot1)
    }

    /// Renumber existing slots to eliminate holes, mapping sorted existing
    /// slots to `1..K`. Idempotent: calling this twice in a row is
    /// equivalent to calling it once.
    pub fn normalize(&self) -> Result<(), SlotError> {
        self.ensure_exists()?;
        let existing = self.list_numeric_slots()?;
        let pairs: Vec<(usize, usize)> = existing
            .into_iter()
            .enumerate()
            .map(|(i, n)| (n, i + 1))
            .filter(|&(from, to)| from != to)
            .collect();
        rename_with_temp_suffix(&self.path, &pairs)
    }

    /// Delete `slot<n>` outright; a later `normalize` closes the hole.
    pub fn delete_slot(&self, n: usize) -> Result<(), SlotError> {
        let path = self.slot_path(n);
        if path.exists() {
            fs::remove_dir_all(path)?;
        }
        Ok(())
    }
}

fn capacity_error(kind: RootKind, existing: usize, capacity: usize) -> SlotError {
    match kind {
        RootKind::Dynamic => SlotError::DynamicMore { existing, capacity },
        RootKind::Static => SlotError::StaticMore { existing, capacity },
    }
}

fn parse_slot_name(name: &str) -> Option<usize> {
    let digits = name.strip_prefix("slot")?;
    if digits.is_empty() || digits.starts_with('0') {
        return None;
    }
    digits.parse::<usize>().ok()
}

/// Shift every slot in `existing` (sorted ascending) up by one, i.e.
/// `slot_i -> slot_{i+1}`, highest first so no target is clobbered before
/// it's read, using the temp-suffix trick for any collision along the way.
fn shift_up(root: &Path, existing: &[usize]) -> Result<(), SlotError> {
    let pairs: Vec<(usize, usize)> = existing.iter().map(|&n| (n, n + 1)).collect();
    rename_with_temp_suffix(root, &pairs)
}

/// Apply a set of `from -> to` slot renames, resolving collisions (a target
/// name that is itself a rename source) by staging through a `_temp`
/// suffix: rename every source to its target (or a `_temp` placeholder if
/// the target is occupied by another pending rename), then drop the `_temp`
/// suffixes. Iterates from the highest `from` down so within-root
/// collisions never clobber an unprocessed source.
fn rename_with_temp_suffix(root: &Path, pairs: &[(usize, usize)]) -> Result<(), SlotError> {
    if pairs.is_empty() {
        return Ok(());
    }

    let mut sorted = pairs.to_vec();
    sorted.sort_by(|a, b| b.0.cmp(&a.0));

    let sources: std::collections::HashSet<usize> = sorted.iter().map(|&(from, _)| from).collect();
    let mut staged = Vec::new();

    for &(from, to) in &sorted {
        let from_path = root.join(format!("slot{from}"));
        if !from_path.exists() {
            continue;
        }
        if sources.contains(&to) {
            let temp_path = root.join(format!("slot{to}_temp"));
            fs::rename(&from_path, &temp_path)?;
            staged.push((temp_path, root.join(format!("slot{to}"))));
        } else {
            fs::rename(&from_path, root.join(format!("slot{to}")))?;
        }
    }

    for (temp_path, final_path) in staged {
        fs::rename(temp_path, final_path)?;
    }

    Ok(())
}
