//! Error types for deformable reconstruction iterations.
//!
//! Configuration problems are detected before anything is submitted to
//! the execution backend. Failures reported by the backend carry the
//! slice index, the stage and the operation kind so the caller can decide
//! whether to abort the reconstruction or re-run a single iteration.

use thiserror::Error;
use histostack_core::SliceIndex;

/// Stage of an iteration. Stages are separated by a hard barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Weighted averaging of neighborhood references.
    ReferenceBuild,
    /// Deformable registration and identity transforms.
    Registration,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::ReferenceBuild => f.write_str("reference-build"),
            Stage::Registration => f.write_str("registration"),
        }
    }
}

/// Kind of an operation submitted to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Average,
    Register,
    BlankTransform,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Average => f.write_str("weighted-average"),
            OperationKind::Register => f.write_str("registration"),
            OperationKind::BlankTransform => f.write_str("blank-transform"),
        }
    }
}

/// A single failed operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationFailure {
    pub slice: SliceIndex,
    pub stage: Stage,
    pub operation: OperationKind,
    pub message: String,
}

impl std::fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "slice {} ({} stage, {}): {}",
            self.slice, self.stage, self.operation, self.message
        )
    }
}

fn summarize(failures: &[OperationFailure]) -> String {
    match failures {
        [] => "no failure details".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
    }
}

/// Main error type for iteration operations.
#[derive(Error, Debug)]
pub enum IterationError {
    /// Invalid configuration or selection input.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A neighborhood reference could not be built.
    #[error("Reference build failure: {}", summarize(.failures))]
    ReferenceBuild { failures: Vec<OperationFailure> },

    /// The backend reported failed operations.
    #[error("Backend execution failure in {stage} stage: {}", summarize(.failures))]
    BackendExecution {
        stage: Stage,
        failures: Vec<OperationFailure>,
    },
}

/// Result type for iteration operations.
pub type Result<T> = std::result::Result<T, IterationError>;

impl IterationError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Failed operations carried by this error, if any.
    pub fn failures(&self) -> &[OperationFailure] {
        match self {
            Self::ReferenceBuild { failures } | Self::BackendExecution { failures, .. } => failures,
            _ => &[],
        }
    }

    /// Slices affected by failed operations, ascending and deduplicated.
    pub fn failed_slices(&self) -> Vec<SliceIndex> {
        let mut slices: Vec<_> = self.failures().iter().map(|f| f.slice).collect();
        slices.sort_unstable();
        slices.dedup();
        slices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(slice: SliceIndex) -> OperationFailure {
        OperationFailure {
            slice,
            stage: Stage::Registration,
            operation: OperationKind::Register,
            message: "exit status 1".to_string(),
        }
    }

    #[test]
    fn test_error_creation() {
        let err = IterationError::configuration("negative radius");
        assert!(matches!(err, IterationError::Configuration(_)));
        assert_eq!(err.to_string(), "Configuration error: negative radius");
    }

    #[test]
    fn test_failure_display_names_slice_stage_and_operation() {
        let text = failure(7).to_string();
        assert!(text.contains("slice 7"));
        assert!(text.contains("registration stage"));
        assert!(text.contains("exit status 1"));
    }

    #[test]
    fn test_backend_error_summarizes() {
        let err = IterationError::BackendExecution {
            stage: Stage::Registration,
            failures: vec![failure(4), failure(2), failure(4)],
        };
        let text = err.to_string();
        assert!(text.contains("slice 4"));
        assert!(text.contains("and 2 more"));
        assert_eq!(err.failed_slices(), vec![2, 4]);
    }
}
