// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Draw groups and the Draw-Range Merger
//!
//! A batch's index buffer is partitioned into draw groups, each pointing at
//! one material of the batch. [`integrate_ranges`] composes material
//! overrides onto an existing partition without disturbing the rest of it.

use crate::error::{Error, Result};

/// Sub-range of an index buffer drawn with one material.
///
/// `start` and `count` are in scalar index units (triangle index times 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawGroup {
    pub start: u32,
    pub count: u32,
    pub material_index: u32,
}

impl DrawGroup {
    pub fn new(start: u32, count: u32, material_index: u32) -> Self {
        Self {
            start,
            count,
            material_index,
        }
    }

    #[inline]
    pub fn end(&self) -> u32 {
        self.start + self.count
    }

    #[inline]
    pub fn contains(&self, index: u32) -> bool {
        index >= self.start && index < self.end()
    }
}

/// Material override for a span of scalar indices
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRange<M> {
    pub offset: u32,
    pub count: u32,
    pub material: M,
}

impl<M> DrawRange<M> {
    pub fn new(offset: u32, count: u32, material: M) -> Self {
        Self {
            offset,
            count,
            material,
        }
    }

    #[inline]
    fn end(&self) -> u32 {
        self.offset.saturating_add(self.count)
    }
}

/// Merge runs of contiguous groups sharing a material index.
///
/// Groups separated by a gap or by a different material stay apart.
pub fn coalesce(groups: impl IntoIterator<Item = DrawGroup>) -> Vec<DrawGroup> {
    let mut out: Vec<DrawGroup> = Vec::new();
    for group in groups {
        if group.count == 0 {
            continue;
        }
        match out.last_mut() {
            Some(last) if last.end() == group.start && last.material_index == group.material_index => {
                last.count += group.count;
            }
            _ => out.push(group),
        }
    }
    out
}

/// Compose material overrides onto an existing draw-group partition.
///
/// `existing` must be sorted and non-overlapping; it defines the covered
/// span `[0, N)`. Every index inside a new range takes that range's
/// material (later ranges win where new ranges overlap), every other
/// covered index keeps its original group's material, and contiguous
/// output groups with the same material index are merged. New ranges are
/// clipped to `N`.
///
/// Fails with [`Error::UnknownMaterial`] when a range's material is not in
/// `materials`.
pub fn integrate_ranges<M: PartialEq>(
    existing: &[DrawGroup],
    materials: &[M],
    new_ranges: &[DrawRange<M>],
) -> Result<Vec<DrawGroup>> {
    let coverage_end = existing.last().map_or(0, DrawGroup::end);

    // Resolve material indices up front so a bad range fails before any work
    let mut overrides: Vec<(u32, u32, u32)> = Vec::with_capacity(new_ranges.len());
    for range in new_ranges {
        let index = materials
            .iter()
            .position(|m| *m == range.material)
            .ok_or(Error::UnknownMaterial)? as u32;
        let end = range.end().min(coverage_end);
        if range.offset < end {
            overrides.push((range.offset, end, index));
        }
    }

    if overrides.is_empty() {
        return Ok(coalesce(existing.iter().copied()));
    }

    let mut cuts: Vec<u32> = Vec::with_capacity(existing.len() * 2 + overrides.len() * 2);
    for group in existing {
        cuts.push(group.start);
        cuts.push(group.end());
    }
    for &(start, end, _) in &overrides {
        cuts.push(start);
        cuts.push(end);
    }
    cuts.sort_unstable();
    cuts.dedup();

    let original_at = |point: u32| -> Option<u32> {
        let i = existing.partition_point(|g| g.end() <= point);
        existing
            .get(i)
            .filter(|g| g.contains(point))
            .map(|g| g.material_index)
    };

    let intervals = cuts.windows(2).filter_map(|w| {
        let (start, end) = (w[0], w[1]);
        let edited = overrides
            .iter()
            .rev()
            .find(|&&(s, e, _)| s <= start && start < e)
            .map(|&(_, _, index)| index);
        edited
            .or_else(|| original_at(start))
            .map(|index| DrawGroup::new(start, end - start, index))
    });

    Ok(coalesce(intervals))
}

/// Whether `groups` is a sorted, gap-free partition of `[0, index_count)`
/// with no two adjacent groups sharing a material index.
pub fn is_canonical_partition(groups: &[DrawGroup], index_count: u32) -> bool {
    let mut cursor = 0;
    let mut previous: Option<u32> = None;
    for group in groups {
        if group.start != cursor || group.count == 0 || previous == Some(group.material_index) {
            return false;
        }
        cursor = group.end();
        previous = Some(group.material_index);
    }
    cursor == index_count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(start: u32, count: u32, material_index: u32) -> DrawGroup {
        DrawGroup::new(start, count, material_index)
    }

    const MATERIALS: [&str; 3] = ["base", "red", "blue"];

    #[test]
    fn override_in_the_middle_splits_group() {
        let existing = [g(0, 30, 0)];
        let out = integrate_ranges(&existing, &MATERIALS, &[DrawRange::new(9, 6, "red")]).unwrap();
        assert_eq!(out, vec![g(0, 9, 0), g(9, 6, 1), g(15, 15, 0)]);
    }

    #[test]
    fn later_overlapping_range_wins() {
        let existing = [g(0, 30, 0)];
        let out = integrate_ranges(
            &existing,
            &MATERIALS,
            &[DrawRange::new(0, 15, "red"), DrawRange::new(9, 12, "blue")],
        )
        .unwrap();
        assert_eq!(out, vec![g(0, 9, 1), g(9, 12, 2), g(21, 9, 0)]);
    }

    #[test]
    fn ranges_are_clipped_to_coverage() {
        let existing = [g(0, 12, 0)];
        let out = integrate_ranges(&existing, &MATERIALS, &[DrawRange::new(6, 100, "red")]).unwrap();
        assert_eq!(out, vec![g(0, 6, 0), g(6, 6, 1)]);
    }

    #[test]
    fn unknown_material_is_an_error() {
        let result = integrate_ranges(&[g(0, 3, 0)], &MATERIALS, &[DrawRange::new(0, 3, "green")]);
        assert!(matches!(result, Err(Error::UnknownMaterial)));
    }

    #[test]
    fn coalesce_respects_gaps() {
        let out = coalesce([g(0, 3, 0), g(3, 3, 0), g(9, 3, 0), g(12, 0, 1)]);
        assert_eq!(out, vec![g(0, 6, 0), g(9, 3, 0)]);
    }

    #[test]
    fn canonical_partition_check() {
        assert!(is_canonical_partition(&[g(0, 3, 0), g(3, 3, 1)], 6));
        assert!(!is_canonical_partition(&[g(0, 3, 0), g(3, 3, 0)], 6));
        assert!(!is_canonical_partition(&[g(0, 3, 0), g(6, 3, 1)], 9));
        assert!(!is_canonical_partition(&[g(0, 3, 0)], 6));
    }
}
