//! On-disk layout of iteration artifacts.
//!
//! Each artifact kind lives in its own numbered directory under the work
//! directory, with one file per slice named after the zero-padded index.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use histostack_core::{ArtifactKind, ArtifactResolver, ImageRef, SliceIndex};

/// Path resolver over a work directory.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    work_dir: PathBuf,
}

impl ArtifactLayout {
    pub fn new<P: AsRef<Path>>(work_dir: P) -> Self {
        Self {
            work_dir: work_dir.as_ref().to_path_buf(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Directory holding artifacts of `kind`, relative to the work directory.
    pub fn dir_name(kind: ArtifactKind) -> &'static str {
        match kind {
            ArtifactKind::SourceSlice => "00_src_slices",
            ArtifactKind::IntensityReference => "01_process_slices",
            ArtifactKind::Outline => "02_outline",
            ArtifactKind::OutlineReference => "03_poutline",
            ArtifactKind::CustomMask => "04_cmask",
            ArtifactKind::Transform | ArtifactKind::OutputNaming => "11_transformations",
        }
    }

    /// File name of the artifact of `kind` for slice `index`.
    pub fn file_name(kind: ArtifactKind, index: SliceIndex) -> String {
        match kind {
            ArtifactKind::Transform => format!("{:04}Warp.nii.gz", index),
            ArtifactKind::OutputNaming => format!("{:04}", index),
            _ => format!("{:04}.nii.gz", index),
        }
    }

    pub fn path(&self, kind: ArtifactKind, index: SliceIndex) -> PathBuf {
        self.work_dir
            .join(Self::dir_name(kind))
            .join(Self::file_name(kind, index))
    }

    /// Create the directories written by an iteration.
    pub fn prepare(&self) -> Result<()> {
        for kind in [
            ArtifactKind::IntensityReference,
            ArtifactKind::OutlineReference,
            ArtifactKind::Transform,
        ] {
            let dir = self.work_dir.join(Self::dir_name(kind));
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }
        Ok(())
    }
}

impl ArtifactResolver for ArtifactLayout {
    fn resolve(&self, kind: ArtifactKind, index: SliceIndex) -> ImageRef {
        ImageRef::from(self.path(kind, index).as_path())
    }
}
