//! Slice selection: which slices are optimized and which register
//! against an anchor slice.

use std::collections::{BTreeMap, BTreeSet};
use histostack_core::{SliceIndex, SliceRange};
use crate::config::MaskedRegistration;
use crate::error::{IterationError, Result};

/// Slices eligible for deformable registration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubsetSet(BTreeSet<SliceIndex>);

impl SubsetSet {
    /// Every slice of the range.
    pub fn full(range: SliceRange) -> Self {
        Self(range.iter().collect())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, index: SliceIndex) -> bool {
        self.0.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = SliceIndex> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<SliceIndex> for SubsetSet {
    fn from_iter<I: IntoIterator<Item = SliceIndex>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Slice to anchor-slice overrides.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MaskedAssignment(BTreeMap<SliceIndex, SliceIndex>);

impl MaskedAssignment {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from `(slice, anchor)` pairs, checking both against the range.
    ///
    /// A slice listed twice must name the same anchor both times.
    pub fn from_pairs(range: SliceRange, pairs: &[(SliceIndex, SliceIndex)]) -> Result<Self> {
        let mut map = BTreeMap::new();
        for &(slice, anchor) in pairs {
            if !range.contains(slice) {
                return Err(IterationError::configuration(format!(
                    "Masked assignment references slice {} outside range {}",
                    slice, range
                )));
            }
            if !range.contains(anchor) {
                return Err(IterationError::configuration(format!(
                    "Masked assignment for slice {} references anchor {} outside range {}",
                    slice, anchor, range
                )));
            }
            if let Some(previous) = map.insert(slice, anchor) {
                if previous != anchor {
                    return Err(IterationError::configuration(format!(
                        "Slice {} is assigned to both anchor {} and anchor {}",
                        slice, previous, anchor
                    )));
                }
            }
            if slice == anchor {
                tracing::warn!("Slice {} is assigned to itself as anchor", slice);
            }
        }
        Ok(Self(map))
    }

    /// Anchor slice for `index`, if one was assigned.
    pub fn anchor(&self, index: SliceIndex) -> Option<SliceIndex> {
        self.0.get(&index).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Slices carrying an override, ascending.
    pub fn slices(&self) -> impl Iterator<Item = SliceIndex> + '_ {
        self.0.keys().copied()
    }

    /// `(slice, anchor)` pairs, ascending by slice.
    pub fn pairs(&self) -> impl Iterator<Item = (SliceIndex, SliceIndex)> + '_ {
        self.0.iter().map(|(&slice, &anchor)| (slice, anchor))
    }
}

/// Subset and masked assignment of one iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceSelection {
    pub subset: SubsetSet,
    pub masked: MaskedAssignment,
}

impl SliceSelection {
    /// Register every slice against its neighborhood reference.
    pub fn full(range: SliceRange) -> Self {
        Self {
            subset: SubsetSet::full(range),
            masked: MaskedAssignment::empty(),
        }
    }

    /// Combine the optional parsed inputs into a selection.
    ///
    /// Without a subset list every slice is optimized. Subset entries
    /// outside the range are dropped. When masked registration is active
    /// and a table is supplied, only the slices listed in the table are
    /// optimized.
    pub fn resolve(
        range: SliceRange,
        masked_settings: &MaskedRegistration,
        subset: Option<&[SliceIndex]>,
        masked_pairs: Option<&[(SliceIndex, SliceIndex)]>,
    ) -> Result<Self> {
        let mut selection_subset = match subset {
            Some(list) => {
                let (inside, outside): (Vec<_>, Vec<_>) =
                    list.iter().copied().partition(|&i| range.contains(i));
                if !outside.is_empty() {
                    tracing::warn!(
                        "Ignoring {} subset entries outside range {}: {:?}",
                        outside.len(),
                        range,
                        outside
                    );
                }
                inside.into_iter().collect()
            }
            None => SubsetSet::full(range),
        };

        let masked = match masked_pairs {
            Some(pairs) if masked_settings.is_active() => {
                let masked = MaskedAssignment::from_pairs(range, pairs)?;
                selection_subset = masked.slices().collect();
                tracing::info!(
                    "Masked registration active for {} slices; all others receive identity transforms",
                    masked.len()
                );
                masked
            }
            Some(_) => {
                tracing::warn!("Masked assignment supplied but masked registration is inactive; ignoring it");
                MaskedAssignment::empty()
            }
            None => MaskedAssignment::empty(),
        };

        Ok(Self {
            subset: selection_subset,
            masked,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> SliceRange {
        SliceRange::new(1, 5).unwrap()
    }

    fn active() -> MaskedRegistration {
        MaskedRegistration { enabled: true, weight: 1.0 }
    }

    #[test]
    fn test_default_selection_is_full_range() {
        let selection = SliceSelection::resolve(range(), &MaskedRegistration::default(), None, None).unwrap();
        assert_eq!(selection.subset, SubsetSet::full(range()));
        assert!(selection.masked.is_empty());
    }

    #[test]
    fn test_subset_list_drops_out_of_range_entries() {
        let selection =
            SliceSelection::resolve(range(), &MaskedRegistration::default(), Some(&[1, 3, 5, 9][..]), None).unwrap();
        assert_eq!(selection.subset.iter().collect::<Vec<_>>(), vec![1, 3, 5]);
    }

    #[test]
    fn test_masked_table_replaces_subset() {
        let selection =
            SliceSelection::resolve(range(), &active(), Some(&[1, 2, 3][..]), Some(&[(4, 2), (5, 2)][..])).unwrap();
        assert_eq!(selection.subset.iter().collect::<Vec<_>>(), vec![4, 5]);
        assert_eq!(selection.masked.anchor(4), Some(2));
        assert_eq!(selection.masked.anchor(1), None);
    }

    #[test]
    fn test_inactive_masked_table_is_ignored() {
        let inactive = MaskedRegistration { enabled: true, weight: 0.0 };
        let selection = SliceSelection::resolve(range(), &inactive, None, Some(&[(4, 2)][..])).unwrap();
        assert!(selection.masked.is_empty());
        assert_eq!(selection.subset.len(), 5);
    }

    #[test]
    fn test_out_of_range_masked_entry_is_configuration_error() {
        let err = MaskedAssignment::from_pairs(range(), &[(3, 9)]).unwrap_err();
        assert!(matches!(err, IterationError::Configuration(_)));
        assert!(MaskedAssignment::from_pairs(range(), &[(0, 2)]).is_err());
    }

    #[test]
    fn test_conflicting_masked_entries_are_rejected() {
        assert!(MaskedAssignment::from_pairs(range(), &[(3, 2), (3, 4)]).is_err());
        assert!(MaskedAssignment::from_pairs(range(), &[(3, 2), (3, 2)]).is_ok());
    }
}
