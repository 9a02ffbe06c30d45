use histostack_core::{ArtifactKind, ArtifactResolver, SliceRange, SymbolicResolver};
use proptest::prelude::*;

proptest! {
    #[test]
    fn window_stays_inside_range(start in -50i64..50, span in 0i64..40, offset in 0i64..40, radius in 0u32..10) {
        let range = SliceRange::new(start, start + span).unwrap();
        let center = start + offset.min(span);
        for j in range.window(center, radius) {
            prop_assert!(range.contains(j));
            prop_assert!((j - center).abs() <= radius as i64);
        }
    }

    #[test]
    fn window_contains_center(start in -50i64..50, span in 0i64..40, offset in 0i64..40, radius in 0u32..10) {
        let range = SliceRange::new(start, start + span).unwrap();
        let center = start + offset.min(span);
        prop_assert!(range.window(center, radius).any(|j| j == center));
    }

    #[test]
    fn iter_len_matches(start in -100i64..100, span in 0i64..100) {
        let range = SliceRange::new(start, start + span).unwrap();
        prop_assert_eq!(range.iter().count(), range.len());
    }
}

#[test]
fn reversed_range_is_rejected() {
    assert!(SliceRange::new(5, 4).is_none());
}

#[test]
fn symbolic_resolver_distinguishes_kinds() {
    let resolver = SymbolicResolver;
    let names: Vec<_> = ArtifactKind::ALL
        .iter()
        .map(|&kind| resolver.resolve(kind, 3))
        .collect();
    for (i, a) in names.iter().enumerate() {
        for b in &names[i + 1..] {
            assert_ne!(a, b);
        }
    }
}
