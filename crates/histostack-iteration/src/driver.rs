//! Iteration driver.
//!
//! One iteration computes the neighborhood weights, builds every request
//! up front, then submits the reference-averaging batch and, once it has
//! fully succeeded, the registration batch.

use histostack_core::{ArtifactResolver, SliceRange};
use crate::backend::ExecutionBackend;
use crate::config::IterationConfig;
use crate::error::{IterationError, Result, Stage};
use crate::neighborhood::{compute_weights, compute_weights_with, WeightFunction, WeightTable};
use crate::operation::{AverageRequest, Operation, SliceRequest};
use crate::reference::{build_references, check_references};
use crate::request::build_request;
use crate::resolver::resolve_assignment;
use crate::selection::SliceSelection;

/// Every operation of one iteration, built before anything is submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationPlan {
    pub weights: WeightTable,
    pub references: Vec<AverageRequest>,
    pub requests: Vec<SliceRequest>,
}

impl IterationPlan {
    pub fn registration_count(&self) -> usize {
        self.requests.iter().filter(|r| !r.is_blank()).count()
    }

    pub fn blank_count(&self) -> usize {
        self.requests.iter().filter(|r| r.is_blank()).count()
    }

    /// Reference-build batch, channel by channel.
    pub fn reference_batch(&self) -> Vec<Operation> {
        self.references.iter().cloned().map(Operation::from).collect()
    }

    /// Registration batch, ordered by slice.
    pub fn registration_batch(&self) -> Vec<Operation> {
        self.requests.iter().cloned().map(Operation::from).collect()
    }
}

/// Counts of operations executed by an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IterationReport {
    pub averages: usize,
    pub registrations: usize,
    pub blanks: usize,
}

fn check_selection(range: SliceRange, selection: &SliceSelection) -> Result<()> {
    for (slice, anchor) in selection.masked.pairs() {
        if !range.contains(slice) || !range.contains(anchor) {
            return Err(IterationError::configuration(format!(
                "Masked assignment {} -> {} lies outside range {}",
                slice, anchor, range
            )));
        }
    }
    Ok(())
}

/// Build the full plan of an iteration.
///
/// Fails on any configuration problem, including registration requests
/// without metrics and references without neighbors.
pub fn plan_iteration(
    config: &IterationConfig,
    selection: &SliceSelection,
    resolver: &dyn ArtifactResolver,
    weight_function: Option<&dyn WeightFunction>,
) -> Result<IterationPlan> {
    config.validate()?;
    let range = config.slice_range()?;
    let radius = config.radius()?;
    check_selection(range, selection)?;

    let weights = match weight_function {
        Some(function) => compute_weights_with(range, radius, function)?,
        None => compute_weights(range, radius),
    };

    let references = build_references(&weights, &config.channels, resolver);
    check_references(&references)?;

    let requests = range
        .iter()
        .map(|slice| {
            let assignment = resolve_assignment(slice, &selection.masked, resolver);
            tracing::debug!(
                "Slice {}: fixed target {:?} of slice {}, mask: {}",
                slice,
                assignment.target,
                assignment.fixed_slice,
                assignment.mask.is_some()
            );
            build_request(
                slice,
                &assignment,
                &config.channels,
                &config.registration,
                &selection.subset,
                resolver,
            )
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(IterationPlan {
        weights,
        references,
        requests,
    })
}

/// One deformable reconstruction iteration over a slice range.
pub struct DeformableIteration<R> {
    config: IterationConfig,
    selection: SliceSelection,
    resolver: R,
    weight_function: Option<Box<dyn WeightFunction>>,
}

impl<R: ArtifactResolver> DeformableIteration<R> {
    pub fn new(config: IterationConfig, selection: SliceSelection, resolver: R) -> Self {
        Self {
            config,
            selection,
            resolver,
            weight_function: None,
        }
    }

    /// Replace the uniform neighborhood weighting.
    pub fn with_weight_function(mut self, function: Box<dyn WeightFunction>) -> Self {
        self.weight_function = Some(function);
        self
    }

    pub fn config(&self) -> &IterationConfig {
        &self.config
    }

    pub fn selection(&self) -> &SliceSelection {
        &self.selection
    }

    /// Build the plan without submitting anything.
    pub fn plan(&self) -> Result<IterationPlan> {
        plan_iteration(
            &self.config,
            &self.selection,
            &self.resolver,
            self.weight_function.as_deref(),
        )
    }

    /// Plan the iteration and submit both stages to `backend`.
    pub fn run(&self, backend: &dyn ExecutionBackend) -> Result<IterationReport> {
        let plan = self.plan()?;
        tracing::info!(
            "Iteration over slices [{}, {}]: {} references, {} registrations, {} identity transforms",
            self.config.start_slice,
            self.config.end_slice,
            plan.references.len(),
            plan.registration_count(),
            plan.blank_count()
        );

        let references = plan.reference_batch();
        if references.is_empty() {
            tracing::debug!("No active channel; skipping reference-build stage");
        } else {
            let report = backend.execute(Stage::ReferenceBuild, &references);
            if !report.is_success() {
                return Err(IterationError::ReferenceBuild {
                    failures: report.failures(),
                });
            }
        }

        let report = backend.execute(Stage::Registration, &plan.registration_batch());
        if !report.is_success() {
            return Err(IterationError::BackendExecution {
                stage: Stage::Registration,
                failures: report.failures(),
            });
        }

        Ok(IterationReport {
            averages: plan.references.len(),
            registrations: plan.registration_count(),
            blanks: plan.blank_count(),
        })
    }
}
