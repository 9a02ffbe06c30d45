//! Operation requests handed to the execution backend.
//!
//! Requests are plain owned values; each one is built fresh for its slice
//! and never shared between slices.

use histostack_core::{Channel, ImageRef, SliceIndex};
use crate::config::{MetricKind, Regularization};
use crate::error::{OperationKind, Stage};

/// Spatial dimension of the slices.
pub const SLICE_DIMENSION: u8 = 2;

/// Pixel type written by the averaging operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
    Float,
}

impl PixelType {
    pub fn name(&self) -> &'static str {
        match self {
            PixelType::Float => "float",
        }
    }
}

/// Weighted average of neighbor images into a synthetic reference.
#[derive(Debug, Clone, PartialEq)]
pub struct AverageRequest {
    pub slice: SliceIndex,
    pub channel: Channel,
    pub inputs: Vec<ImageRef>,
    pub weights: Vec<f64>,
    pub output_type: PixelType,
    pub output: ImageRef,
}

impl AverageRequest {
    /// Check the calling contract of the averaging operation.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.inputs.is_empty() {
            return Err(format!(
                "{} reference of slice {} has no contributing neighbors",
                self.channel, self.slice
            ));
        }
        if self.inputs.len() != self.weights.len() {
            return Err(format!(
                "{} reference of slice {} has {} images but {} weights",
                self.channel,
                self.slice,
                self.inputs.len(),
                self.weights.len()
            ));
        }
        Ok(())
    }
}

/// One similarity term of a registration.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDescriptor {
    pub channel: Channel,
    pub fixed: ImageRef,
    pub moving: ImageRef,
    pub kind: MetricKind,
    pub weight: f64,
    pub parameter: f64,
}

/// Transform family of the deformable registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformFamily {
    /// Symmetric normalization (SyN).
    SymmetricNormalization,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformSpec {
    pub family: TransformFamily,
    pub gradient_step: f64,
}

impl TransformSpec {
    pub fn syn(gradient_step: f64) -> Self {
        Self {
            family: TransformFamily::SymmetricNormalization,
            gradient_step,
        }
    }
}

/// Affine pre-alignment settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffineStage {
    pub iterations: Vec<u32>,
    pub rigid: bool,
    pub continue_affine: bool,
}

impl AffineStage {
    /// No affine iterations, no rigid pre-alignment, no continuation.
    pub fn disabled() -> Self {
        Self {
            iterations: vec![0],
            rigid: false,
            continue_affine: false,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.iterations.iter().all(|&i| i == 0) && !self.rigid && !self.continue_affine
    }
}

/// Deformable registration of one slice.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationRequest {
    pub slice: SliceIndex,
    pub dimension: u8,
    pub moving: ImageRef,
    pub output_naming: ImageRef,
    pub iterations: Vec<u32>,
    pub transform: TransformSpec,
    pub regularization: Regularization,
    pub affine: AffineStage,
    pub metrics: Vec<MetricDescriptor>,
    pub mask: Option<ImageRef>,
    pub all_metrics_converge: bool,
}

/// Identity transform for a slice excluded from optimization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlankRequest {
    pub slice: SliceIndex,
    pub input: ImageRef,
    pub output: ImageRef,
}

/// Registration-stage request of a single slice.
#[derive(Debug, Clone, PartialEq)]
pub enum SliceRequest {
    Register(RegistrationRequest),
    Blank(BlankRequest),
}

impl SliceRequest {
    pub fn slice(&self) -> SliceIndex {
        match self {
            SliceRequest::Register(r) => r.slice,
            SliceRequest::Blank(b) => b.slice,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, SliceRequest::Blank(_))
    }
}

/// Any operation the backend can run.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Average(AverageRequest),
    Register(RegistrationRequest),
    Blank(BlankRequest),
}

impl Operation {
    pub fn slice(&self) -> SliceIndex {
        match self {
            Operation::Average(a) => a.slice,
            Operation::Register(r) => r.slice,
            Operation::Blank(b) => b.slice,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Average(_) => OperationKind::Average,
            Operation::Register(_) => OperationKind::Register,
            Operation::Blank(_) => OperationKind::BlankTransform,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Operation::Average(_) => Stage::ReferenceBuild,
            Operation::Register(_) | Operation::Blank(_) => Stage::Registration,
        }
    }
}

impl From<SliceRequest> for Operation {
    fn from(request: SliceRequest) -> Self {
        match request {
            SliceRequest::Register(r) => Operation::Register(r),
            SliceRequest::Blank(b) => Operation::Blank(b),
        }
    }
}

impl From<AverageRequest> for Operation {
    fn from(request: AverageRequest) -> Self {
        Operation::Average(request)
    }
}
