//! Translating world coordinates into chunk sets grouped by region file.

use std::collections::{BTreeMap, BTreeSet};

use crate::region::region_filename;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SelectorError {
    #[error("selection is {width}x{height} chunks, which exceeds the configured limit of {limit}x{limit}")]
    TooLarge { width: i64, height: i64, limit: i64 },
    #[error("radius {radius} cannot be negative")]
    NegativeRadius { radius: i64 },
}

/// How a selector's bounds were specified; kept so diagnostics and
/// `info.json` manifests can describe the original request shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorMode {
    Rectangle,
    CenterRadius,
}

/// An immutable description of which chunks a snapshot/restore targets.
///
/// Construction validates the `max_chunk_length` limit unless
/// `ignore_size_limit` is requested (used only on the restore path, where a
/// historical selection recorded in an old `info.json` must be honored even
/// if the limit has since been lowered).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    mode: SelectorMode,
    min_cx: i32,
    min_cz: i32,
    max_cx: i32,
    max_cz: i32,
}

impl Selector {
    /// Rectangle selector from two world-space corner points.
    pub fn rectangle(
        (x1, z1): (f64, f64),
        (x2, z2): (f64, f64),
        max_chunk_length: i64,
        ignore_size_limit: bool,
    ) -> Result<Self, SelectorError> {
        let c1 = world_to_chunk(x1, z1);
        let c2 = world_to_chunk(x2, z2);
        let min_cx = c1.0.min(c2.0);
        let max_cx = c1.0.max(c2.0);
        let min_cz = c1.1.min(c2.1);
        let max_cz = c1.1.max(c2.1);

        let selector = Self { mode: SelectorMode::Rectangle, min_cx, min_cz, max_cx, max_cz };
        selector.check_size(max_chunk_length, ignore_size_limit)?;
        Ok(selector)
    }

    /// Center+radius selector; actual side length is `2 * radius + 1`.
    pub fn center_radius(
        (x, z): (f64, f64),
        radius: i64,
        max_chunk_length: i64,
        ignore_size_limit: bool,
    ) -> Result<Self, SelectorError> {
        if radius < 0 {
            return Err(SelectorError::NegativeRadius { radius });
        }
        let (ccx, ccz) = world_to_chunk(x, z);
        let radius = radius as i32;
        let selector = Self {
            mode: SelectorMode::CenterRadius,
            min_cx: ccx - radius,
            min_cz: ccz - radius,
            max_cx: ccx + radius,
            max_cz: ccz + radius,
        };
        selector.check_size(max_chunk_length, ignore_size_limit)?;
        Ok(selector)
    }

    /// Construct directly from already-known chunk bounds, e.g. when
    /// rebuilding a selector from a stored `info.json` for a partial custom
    /// restore. Bounds are taken as given, min/max are not re-derived.
    pub fn from_bounds(
        mode: SelectorMode,
        (min_cx, min_cz): (i32, i32),
        (max_cx, max_cz): (i32, i32),
        max_chunk_length: i64,
        ignore_size_limit: bool,
    ) -> Result<Self, SelectorError> {
        let selector = Self { mode, min_cx, min_cz, max_cx, max_cz };
        selector.check_size(max_chunk_length, ignore_size_limit)?;
        Ok(selector)
    }

    fn check_size(&self, max_chunk_length: i64, ignore_size_limit: bool) -> Result<(), SelectorError> {
        if ignore_size_limit {
            return Ok(());
        }
        let (width, height) = self.dimensions();
        if width > max_chunk_length || height > max_chunk_length {
            return Err(SelectorError::TooLarge { width, height, limit: max_chunk_length });
        }
        Ok(())
    }

    pub fn mode(&self) -> SelectorMode {
        self.mode
    }

    /// `(width, height)` in chunks.
    pub fn dimensions(&self) -> (i64, i64) {
        (
            (self.max_cx - self.min_cx) as i64 + 1,
            (self.max_cz - self.min_cz) as i64 + 1,
        )
    }

    /// Top-left and bottom-right corner chunk coordinates.
    pub fn corner_chunks(&self) -> ((i32, i32), (i32, i32)) {
        ((self.min_cx, self.min_cz), (self.max_cx, self.max_cz))
    }

    /// All selected chunk coordinates. Computed lazily on each call; callers
    /// that need the set repeatedly should cache it themselves.
    pub fn chunks(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        (self.min_cx..=self.max_cx)
            .flat_map(move |cx| (self.min_cz..=self.max_cz).map(move |cz| (cx, cz)))
    }

    /// Bounding-box overlap with another selector; a validation helper, not
    /// used to reject overlapping selections.
    pub fn intersects(&self, other: &Selector) -> bool {
        self.min_cx <= other.max_cx
            && self.max_cx >= other.min_cx
            && self.min_cz <= other.max_cz
            && self.max_cz >= other.min_cz
    }

    /// Group this selector's chunks by containing region file.
    pub fn group_by_region(&self) -> GroupedChunks {
        group_chunks(self.chunks())
    }
}

/// A region's selection: every one of its 1024 chunks, or an explicit list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionSelection {
    Full,
    Chunks(Vec<(i32, i32)>),
}

pub type GroupedChunks = BTreeMap<String, RegionSelection>;

/// Group an arbitrary chunk set by containing region file, marking a region
/// `Full` only when every one of its 1024 chunks is actually present in
/// `chunks` — never inferred from a bounding box, so two disjoint selections
/// sharing a dimension don't absorb the gap between them.
pub fn group_chunks(chunks: impl Iterator<Item = (i32, i32)>) -> GroupedChunks {
    let mut by_region: BTreeMap<(i32, i32), BTreeSet<(i32, i32)>> = BTreeMap::new();
    for (cx, cz) in chunks {
        by_region.entry((cx >> 5, cz >> 5)).or_default().insert((cx, cz));
    }

    let mut result = GroupedChunks::new();
    for ((rx, rz), set) in by_region {
        let name = region_filename(rx, rz, "mca");
        if set.len() == 1024 {
            result.insert(name, RegionSelection::Full);
        } else {
            result.insert(name, RegionSelection::Chunks(set.into_iter().collect()));
        }
    }
    result
}

/// Merge the chunk sets of multiple selectors, then group by region file.
/// Used when saving a [`crate::custom::CustomDefinition`]'s sub-slots that
/// share a dimension.
pub fn combine_and_group<'a>(selectors: impl IntoIterator<Item = &'a Selector>) -> GroupedChunks {
    let mut all = BTreeSet::new();
    for selector in selectors {
        all.extend(selector.chunks());
    }
    group_chunks(all.into_iter())
}

#[inline]
fn world_to_chunk(x: f64, z: f64) -> (i32, i32) {
    (x.div_euclid(16.0) as i32, z.div_euclid(16.0) as i32)
}
