//! Slice indices and the inclusive slice range of one iteration.
//!
//! A histological stack is addressed by integer slice indices. The range
//! processed by an iteration is fixed once the iteration starts.

use serde::{Deserialize, Serialize};

/// Position of a section in the ordered slice stack.
pub type SliceIndex = i64;

/// Inclusive range `[start, end]` of slice indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SliceRange {
    start: SliceIndex,
    end: SliceIndex,
}

impl SliceRange {
    /// Create a range. Returns `None` when `start > end`.
    pub fn new(start: SliceIndex, end: SliceIndex) -> Option<Self> {
        if start > end {
            return None;
        }
        Some(Self { start, end })
    }

    /// First slice of the range.
    pub fn start(&self) -> SliceIndex {
        self.start
    }

    /// Last slice of the range (inclusive).
    pub fn end(&self) -> SliceIndex {
        self.end
    }

    /// Number of slices in the range, saturating at `usize::MAX`.
    pub fn len(&self) -> usize {
        usize::try_from(self.end.abs_diff(self.start))
            .unwrap_or(usize::MAX)
            .saturating_add(1)
    }

    /// Ranges are never empty; kept for API symmetry with collections.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Check whether `index` lies inside the range.
    pub fn contains(&self, index: SliceIndex) -> bool {
        index >= self.start && index <= self.end
    }

    /// Iterate over the slice indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = SliceIndex> + Clone {
        self.start..=self.end
    }

    /// Clamp the window `[center - radius, center + radius]` to the range.
    ///
    /// Windows are never wrapped or padded: slices near the boundary get
    /// a shorter window.
    pub fn window(&self, center: SliceIndex, radius: u32) -> impl Iterator<Item = SliceIndex> {
        let radius = radius as SliceIndex;
        let lo = center.saturating_sub(radius).max(self.start);
        let hi = center.saturating_add(radius).min(self.end);
        lo..=hi
    }
}

impl IntoIterator for SliceRange {
    type Item = SliceIndex;
    type IntoIter = std::ops::RangeInclusive<SliceIndex>;

    fn into_iter(self) -> Self::IntoIter {
        self.start..=self.end
    }
}

impl std::fmt::Display for SliceRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_rejects_reversed_bounds() {
        assert!(SliceRange::new(5, 1).is_none());
        assert!(SliceRange::new(3, 3).is_some());
    }

    #[test]
    fn test_range_len_and_contains() {
        let range = SliceRange::new(1, 5).unwrap();
        assert_eq!(range.len(), 5);
        assert!(range.contains(1));
        assert!(range.contains(5));
        assert!(!range.contains(0));
        assert!(!range.contains(6));
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_window_is_clamped_not_wrapped() {
        let range = SliceRange::new(1, 5).unwrap();
        assert_eq!(range.window(1, 2).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(range.window(5, 1).collect::<Vec<_>>(), vec![4, 5]);
        assert_eq!(range.window(3, 0).collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn test_negative_indices() {
        let range = SliceRange::new(-2, 2).unwrap();
        assert_eq!(range.len(), 5);
        assert_eq!(range.window(-2, 1).collect::<Vec<_>>(), vec![-2, -1]);
    }

    #[test]
    fn test_len_saturates_for_extreme_bounds() {
        let range = SliceRange::new(SliceIndex::MIN, SliceIndex::MAX).unwrap();
        assert_eq!(range.len(), usize::MAX);
        let range = SliceRange::new(-1, SliceIndex::MAX).unwrap();
        assert!(range.len() > 1);
    }
}
