//! Registration assignment resolver.
//!
//! A slice registers either against its own synthetic neighborhood
//! reference or, when the operator assigned an anchor, against the raw
//! images of that anchor slice with the anchor's mask attached.

use histostack_core::{ArtifactKind, ArtifactResolver, Channel, ImageRef, SliceIndex};
use crate::selection::MaskedAssignment;

/// Which image family serves as the fixed target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedTarget {
    /// Synthetic reference built from the neighborhood.
    Synthetic,
    /// Raw images of an anchor slice.
    Raw,
}

/// Resolved fixed target of one slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub slice: SliceIndex,
    pub target: FixedTarget,
    /// Slice whose images are used as fixed target.
    pub fixed_slice: SliceIndex,
    pub mask: Option<ImageRef>,
}

impl Assignment {
    /// Artifact kind of the fixed image for `channel`.
    pub fn fixed_kind(&self, channel: Channel) -> ArtifactKind {
        match self.target {
            FixedTarget::Synthetic => channel.reference_kind(),
            FixedTarget::Raw => channel.raw_kind(),
        }
    }

    pub fn is_masked(&self) -> bool {
        self.target == FixedTarget::Raw
    }
}

/// Resolve the fixed target of `slice`.
pub fn resolve_assignment(
    slice: SliceIndex,
    masked: &MaskedAssignment,
    resolver: &dyn ArtifactResolver,
) -> Assignment {
    match masked.anchor(slice) {
        Some(anchor) => Assignment {
            slice,
            target: FixedTarget::Raw,
            fixed_slice: anchor,
            mask: Some(resolver.resolve(ArtifactKind::CustomMask, anchor)),
        },
        None => Assignment {
            slice,
            target: FixedTarget::Synthetic,
            fixed_slice: slice,
            mask: None,
        },
    }
}
