//! Metric and registration request builder.

use histostack_core::{ArtifactKind, ArtifactResolver, ChannelConfig, SliceIndex};
use crate::config::RegistrationSettings;
use crate::error::{IterationError, Result};
use crate::operation::{
    AffineStage, BlankRequest, MetricDescriptor, RegistrationRequest, SliceRequest, TransformSpec,
    SLICE_DIMENSION,
};
use crate::resolver::Assignment;
use crate::selection::SubsetSet;

/// Similarity metrics of one slice, intensity first then outline.
///
/// Each metric compares the fixed image chosen by `assignment` with the
/// slice's own raw image of the same channel.
pub fn build_metrics(
    assignment: &Assignment,
    channels: &ChannelConfig,
    settings: &RegistrationSettings,
    resolver: &dyn ArtifactResolver,
) -> Vec<MetricDescriptor> {
    channels
        .active()
        .into_iter()
        .map(|(channel, weight)| MetricDescriptor {
            channel,
            fixed: resolver.resolve(assignment.fixed_kind(channel), assignment.fixed_slice),
            moving: resolver.resolve(channel.raw_kind(), assignment.slice),
            kind: settings.metric,
            weight,
            parameter: settings.metric_parameter,
        })
        .collect()
}

/// Build the registration-stage request of `slice`.
///
/// Slices in the subset get a deformable registration; all others get an
/// identity transform so every slice ends up with a transform artifact.
pub fn build_request(
    slice: SliceIndex,
    assignment: &Assignment,
    channels: &ChannelConfig,
    settings: &RegistrationSettings,
    subset: &SubsetSet,
    resolver: &dyn ArtifactResolver,
) -> Result<SliceRequest> {
    if !subset.contains(slice) {
        return Ok(SliceRequest::Blank(BlankRequest {
            slice,
            input: resolver.resolve(ArtifactKind::SourceSlice, slice),
            output: resolver.resolve(ArtifactKind::Transform, slice),
        }));
    }

    let metrics = build_metrics(assignment, channels, settings, resolver);
    if metrics.is_empty() {
        return Err(IterationError::configuration(format!(
            "Slice {} has no active channel to build a similarity metric from",
            slice
        )));
    }

    Ok(SliceRequest::Register(RegistrationRequest {
        slice,
        dimension: SLICE_DIMENSION,
        moving: resolver.resolve(ArtifactKind::SourceSlice, slice),
        output_naming: resolver.resolve(ArtifactKind::OutputNaming, slice),
        iterations: settings.iterations.clone(),
        transform: TransformSpec::syn(settings.gradient_step),
        regularization: settings.regularization.clone(),
        affine: AffineStage::disabled(),
        metrics,
        mask: assignment.mask.clone(),
        all_metrics_converge: true,
    }))
}
