//! Playback-frame index over annotation records
//!
//! Annotation batches are sampled at a coarser rate than the video they
//! describe. Each batch is placed on the playback timeline once, at build
//! time, and then held (zero-order hold) until the next batch starts.

use std::collections::BTreeMap;

use tracing::debug;

use super::record::{AnnotationRecord, RawAnnotation};
use crate::error::{OverlayError, Result};

/// Maps annotation-source frame numbers to playback frame numbers.
///
/// Rounding is round-half-to-even, applied exactly once per record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateConversion {
    ratio: f64,
}

impl RateConversion {
    pub fn new(source_fps: f64, target_fps: f64) -> Result<Self> {
        let valid = |r: f64| r.is_finite() && r > 0.0;
        if !valid(source_fps) || !valid(target_fps) {
            return Err(OverlayError::InvalidRate {
                source_fps,
                target_fps,
            });
        }
        Ok(Self {
            ratio: target_fps / source_fps,
        })
    }

    /// Use a precomputed `target / source` multiplier directly
    pub fn from_ratio(ratio: f64) -> Result<Self> {
        Self::new(1.0, ratio)
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn playback_frame(&self, source_frame_index: u64) -> u64 {
        (source_frame_index as f64 * self.ratio).round_ties_even() as u64
    }
}

/// Records grouped by playback frame, keys strictly ascending.
///
/// Read-only once built; safe to share across threads by reference.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnnotationIndex {
    keys: Vec<u64>,
    groups: Vec<Vec<AnnotationRecord>>,
}

impl AnnotationIndex {
    /// Place `records` on the playback timeline. Fails with
    /// [`OverlayError::InvalidRate`] before touching any record if either
    /// rate is not positive.
    pub fn build<I>(records: I, source_fps: f64, target_fps: f64) -> Result<Self>
    where
        I: IntoIterator<Item = RawAnnotation>,
    {
        let conversion = RateConversion::new(source_fps, target_fps)?;
        Ok(Self::build_with(records, conversion))
    }

    pub fn build_with<I>(records: I, conversion: RateConversion) -> Self
    where
        I: IntoIterator<Item = RawAnnotation>,
    {
        // BTreeMap keeps keys sorted; push order keeps ties in input order
        let mut grouped: BTreeMap<u64, Vec<AnnotationRecord>> = BTreeMap::new();
        let mut total = 0usize;
        for raw in records {
            let playback_frame = conversion.playback_frame(raw.source_frame_index);
            grouped.entry(playback_frame).or_default().push(AnnotationRecord {
                source_frame_index: raw.source_frame_index,
                category: raw.category,
                bbox: raw.bbox,
                playback_frame,
            });
            total += 1;
        }

        let (keys, groups): (Vec<_>, Vec<_>) = grouped.into_iter().unzip();
        debug!(
            "Indexed {} records into {} groups (ratio {})",
            total,
            keys.len(),
            conversion.ratio()
        );
        Self { keys, groups }
    }

    /// The group with the greatest playback frame `<= frame`, or an empty
    /// slice if `frame` precedes every group. O(log groups).
    pub fn active_group(&self, frame: u64) -> &[AnnotationRecord] {
        match self.keys.partition_point(|&k| k <= frame) {
            0 => &[],
            i => &self.groups[i - 1],
        }
    }

    /// Records placed exactly on `frame`, without hold
    pub fn group_at(&self, frame: u64) -> &[AnnotationRecord] {
        match self.keys.binary_search(&frame) {
            Ok(i) => &self.groups[i],
            Err(_) => &[],
        }
    }

    /// Distinct playback frames, ascending
    pub fn keys(&self) -> &[u64] {
        &self.keys
    }

    pub fn group_count(&self) -> usize {
        self.keys.len()
    }

    pub fn record_count(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &AnnotationRecord> {
        self.groups.iter().flatten()
    }

    /// Record count per category, sorted by category name
    pub fn category_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for record in self.records() {
            *counts.entry(record.category.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::BoundingBox;

    fn raw(frame: u64, category: &str) -> RawAnnotation {
        RawAnnotation::new(frame, category, BoundingBox::new(10.0, 10.0, 50.0, 50.0))
    }

    #[test]
    fn rejects_non_positive_rates() {
        for (src, dst) in [(0.0, 30.0), (5.0, 0.0), (-1.0, 30.0), (5.0, f64::NAN)] {
            let err = AnnotationIndex::build(vec![raw(0, "car")], src, dst).unwrap_err();
            assert!(matches!(err, OverlayError::InvalidRate { .. }), "{src} {dst}");
        }
    }

    #[test]
    fn single_group_is_held_for_every_later_frame() {
        let index = AnnotationIndex::build(vec![raw(0, "car")], 1.0, 11.9).unwrap();
        assert_eq!(index.keys(), &[0]);
        for f in 0..100 {
            let group = index.active_group(f);
            assert_eq!(group.len(), 1);
            assert_eq!(group[0].category, "car");
        }
    }

    #[test]
    fn hold_switches_at_next_group_boundary() {
        // 11.9 ratio: source 1 -> 12, source 2 -> 24 (23.8)
        let index = AnnotationIndex::build(
            vec![raw(2, "bus"), raw(0, "car"), raw(1, "truck")],
            1.0,
            11.9,
        )
        .unwrap();
        assert_eq!(index.keys(), &[0, 12, 24]);
        assert_eq!(index.active_group(11)[0].category, "car");
        assert_eq!(index.active_group(12)[0].category, "truck");
        assert_eq!(index.active_group(23)[0].category, "truck");
        assert_eq!(index.active_group(24)[0].category, "bus");
        assert_eq!(index.active_group(10_000)[0].category, "bus");
    }

    #[test]
    fn frames_before_first_group_are_empty() {
        let index = AnnotationIndex::build(vec![raw(3, "car")], 1.0, 10.0).unwrap();
        assert!(index.active_group(0).is_empty());
        assert!(index.active_group(29).is_empty());
        assert_eq!(index.active_group(30).len(), 1);
    }

    #[test]
    fn empty_index_has_no_active_group() {
        let index = AnnotationIndex::build(Vec::new(), 5.0, 59.5).unwrap();
        assert!(index.is_empty());
        assert!(index.active_group(42).is_empty());
    }

    #[test]
    fn rounding_is_half_to_even() {
        // ratio 0.5: 1 -> 0.5 -> 0, 3 -> 1.5 -> 2, 5 -> 2.5 -> 2
        let conv = RateConversion::new(2.0, 1.0).unwrap();
        assert_eq!(conv.playback_frame(1), 0);
        assert_eq!(conv.playback_frame(3), 2);
        assert_eq!(conv.playback_frame(5), 2);
        assert_eq!(conv.playback_frame(7), 4);
    }

    #[test]
    fn colliding_source_frames_share_a_group_in_input_order() {
        // ratio 0.5: source 4 -> 2, source 5 -> 2.5 -> 2
        let index =
            AnnotationIndex::build(vec![raw(5, "bus"), raw(4, "car")], 2.0, 1.0).unwrap();
        assert_eq!(index.group_count(), 1);
        let cats: Vec<_> = index.active_group(2).iter().map(|r| r.category.as_str()).collect();
        assert_eq!(cats, ["bus", "car"]);
    }

    #[test]
    fn reference_ratio_places_records() {
        let conv = RateConversion::new(5.0, 59.5).unwrap();
        assert_eq!(conv.playback_frame(0), 0);
        assert_eq!(conv.playback_frame(1), 12);
        assert_eq!(conv.playback_frame(87), 1035);
        assert_eq!(conv.playback_frame(200), 2380);
    }

    #[test]
    fn build_is_deterministic() {
        let input: Vec<_> = (0..50)
            .rev()
            .map(|i| raw(i % 17, if i % 2 == 0 { "car" } else { "rider" }))
            .collect();
        let a = AnnotationIndex::build(input.clone(), 5.0, 59.5).unwrap();
        let b = AnnotationIndex::build(input, 5.0, 59.5).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.record_count(), 50);
    }

    #[test]
    fn group_at_does_not_hold() {
        let index = AnnotationIndex::build(vec![raw(1, "car")], 1.0, 10.0).unwrap();
        assert_eq!(index.group_at(10).len(), 1);
        assert!(index.group_at(11).is_empty());
    }

    #[test]
    fn category_counts_tally_records() {
        let index =
            AnnotationIndex::build(vec![raw(0, "car"), raw(1, "car"), raw(1, "bus")], 1.0, 2.0)
                .unwrap();
        let counts = index.category_counts();
        assert_eq!(counts.get("car"), Some(&2));
        assert_eq!(counts.get("bus"), Some(&1));
    }
}
