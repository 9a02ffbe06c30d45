//! Artifact kinds and opaque image references.
//!
//! Every image or transform touched by an iteration is addressed by a
//! logical kind and a slice index. An [`ArtifactResolver`] turns that pair
//! into an [`ImageRef`], which the engine passes around without looking
//! inside.

use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::slice::SliceIndex;

/// Logical kind of an artifact produced or consumed by an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArtifactKind {
    /// Raw intensity image of a slice.
    SourceSlice,
    /// Synthetic intensity reference built from the neighborhood.
    IntensityReference,
    /// Raw outline (contour) image of a slice.
    Outline,
    /// Synthetic outline reference built from the neighborhood.
    OutlineReference,
    /// Custom mask attached to an anchor slice.
    CustomMask,
    /// Deformation field written for a slice.
    Transform,
    /// Output prefix handed to the registration tool.
    OutputNaming,
}

impl ArtifactKind {
    /// All kinds, in a stable order.
    pub const ALL: [ArtifactKind; 7] = [
        ArtifactKind::SourceSlice,
        ArtifactKind::IntensityReference,
        ArtifactKind::Outline,
        ArtifactKind::OutlineReference,
        ArtifactKind::CustomMask,
        ArtifactKind::Transform,
        ArtifactKind::OutputNaming,
    ];

    /// Short identifier used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            ArtifactKind::SourceSlice => "src_slice",
            ArtifactKind::IntensityReference => "processed",
            ArtifactKind::Outline => "outline",
            ArtifactKind::OutlineReference => "poutline",
            ArtifactKind::CustomMask => "cmask",
            ArtifactKind::Transform => "transform",
            ArtifactKind::OutputNaming => "out_naming",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Opaque reference to an image or transform artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// View the reference as a filesystem path.
    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Path> for ImageRef {
    fn from(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }
}

/// Resolves a logical artifact to a stable reference.
///
/// Implementations must be pure: the same kind and index always yield the
/// same reference within one iteration.
pub trait ArtifactResolver: Send + Sync {
    fn resolve(&self, kind: ArtifactKind, index: SliceIndex) -> ImageRef;
}

impl<R: ArtifactResolver + ?Sized> ArtifactResolver for &R {
    fn resolve(&self, kind: ArtifactKind, index: SliceIndex) -> ImageRef {
        (**self).resolve(kind, index)
    }
}

/// Resolver producing `kind:index` tokens, useful when only the shape of
/// a batch matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolicResolver;

impl ArtifactResolver for SymbolicResolver {
    fn resolve(&self, kind: ArtifactKind, index: SliceIndex) -> ImageRef {
        ImageRef::new(format!("{}:{}", kind.name(), index))
    }
}
