//! Free-sector tracking and best-fit allocation for `.mca` files.

use super::{RegionHeader, SECTOR_BYTES};

/// Tracks the free sector ranges of one region file (sectors `2..total`),
/// sorted by `start`, coalesced, non-overlapping.
///
/// Mutated only through `allocate`/`free`; never shared across files or
/// threads — each merge owns a private allocator scanned fresh from the
/// target file's current header.
pub struct SectorAllocator {
    free: Vec<(u32, u32)>,
    total_sectors: u32,
}

impl SectorAllocator {
    /// Scan a region file's header and file length to build the initial
    /// free-sector list: every sector from 2 onward not claimed by a chunk,
    /// plus a trailing run past the last used sector.
    pub fn scan(header: &RegionHeader, file_len: u64) -> Self {
        let mut total_sectors = (file_len / SECTOR_BYTES) as u32;
        if file_len % SECTOR_BYTES != 0 {
            total_sectors += 1;
        }
        total_sectors = total_sectors.max(2);

        let mut used = vec![false; total_sectors as usize];
        used[0] = true;
        used[1] = true;

        for range in &header.offsets {
            if range.is_empty() {
                continue;
            }
            let end = (range.offset + range.count).min(total_sectors);
            for sector in range.offset..end {
                used[sector as usize] = true;
            }
        }

        let mut free = Vec::new();
        let mut run_start: Option<u32> = None;
        for sector in 2..total_sectors {
            if used[sector as usize] {
                if let Some(start) = run_start.take() {
                    free.push((start, sector - start));
                }
            } else if run_start.is_none() {
                run_start = Some(sector);
            }
        }
        if let Some(start) = run_start {
            free.push((start, total_sectors - start));
        }

        let mut allocator = Self { free, total_sectors };
        allocator.coalesce();
        allocator
    }

    /// Allocate `required` contiguous sectors: best-fit among free ranges
    /// (smallest leftover, ties broken by the first such range), else
    /// append at the end of the file.
    pub fn allocate(&mut self, required: u32) -> u32 {
        let mut best: Option<(usize, u32)> = None;
        for (i, &(_, size)) in self.free.iter().enumerate() {
            if size >= required {
                let waste = size - required;
                if best.map_or(true, |(_, best_waste)| waste < best_waste) {
                    best = Some((i, waste));
                }
            }
        }

        if let Some((i, waste)) = best {
            let (start, _) = self.free[i];
            if waste == 0 {
                self.free.remove(i);
            } else {
                self.free[i] = (start + required, waste);
            }
            start
        } else {
            let start = self.total_sectors;
            self.total_sectors += required;
            start
        }
    }

    /// Return a range to the free list (used when a merge shrinks or
    /// relocates a chunk's existing allocation).
    pub fn free(&mut self, range: super::SectorRange) {
        if range.is_empty() {
            return;
        }
        self.free.push((range.offset, range.count));
        self.coalesce();
    }

    fn coalesce(&mut self) {
        self.free.sort_by_key(|&(start, _)| start);
        let mut merged: Vec<(u32, u32)> = Vec::with_capacity(self.free.len());
        for &(start, count) in &self.free {
            if let Some(last) = merged.last_mut() {
                if last.0 + last.1 >= start {
                    last.1 = last.1.max(start + count - last.0);
                    continue;
                }
            }
            merged.push((start, count));
        }
        self.free = merged;
    }

    #[cfg(test)]
    pub(crate) fn free_ranges(&self) -> &[(u32, u32)] {
        &self.free
    }
}
