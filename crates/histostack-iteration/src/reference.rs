//! Reference builder.
//!
//! Emits one weighted-average request per active channel and slice. The
//! output of each request is the slice's synthetic reference for that
//! channel.

use histostack_core::{ArtifactResolver, ChannelConfig};
use crate::error::{IterationError, OperationFailure, OperationKind, Result, Stage};
use crate::neighborhood::WeightTable;
use crate::operation::{AverageRequest, PixelType};

/// Build the averaging requests for every slice of the table's range.
///
/// Requests are grouped by channel (intensity first) and ordered by slice
/// within a channel. Inactive channels contribute nothing. Slices without
/// neighbors still get a request with an empty input list.
pub fn build_references(
    table: &WeightTable,
    channels: &ChannelConfig,
    resolver: &dyn ArtifactResolver,
) -> Vec<AverageRequest> {
    let mut requests = Vec::with_capacity(table.range().len() * channels.active().len());

    for (channel, _) in channels.active() {
        for (slice, neighbors) in table.iter() {
            let inputs = neighbors
                .iter()
                .map(|n| resolver.resolve(channel.raw_kind(), n.index))
                .collect();
            let weights = neighbors.iter().map(|n| n.weight).collect();

            requests.push(AverageRequest {
                slice,
                channel,
                inputs,
                weights,
                output_type: PixelType::Float,
                output: resolver.resolve(channel.reference_kind(), slice),
            });
        }
    }

    requests
}

/// Reject the batch if any request breaks the averaging contract.
///
/// All offending slices are reported at once.
pub fn check_references(requests: &[AverageRequest]) -> Result<()> {
    let failures: Vec<_> = requests
        .iter()
        .filter_map(|request| {
            request.validate().err().map(|message| OperationFailure {
                slice: request.slice,
                stage: Stage::ReferenceBuild,
                operation: OperationKind::Average,
                message,
            })
        })
        .collect();

    if failures.is_empty() {
        Ok(())
    } else {
        Err(IterationError::ReferenceBuild { failures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use histostack_core::{Channel, SliceRange, SymbolicResolver};
    use crate::neighborhood::compute_weights;

    #[test]
    fn test_one_request_per_slice_and_active_channel() {
        let table = compute_weights(SliceRange::new(1, 5).unwrap(), 1);
        let channels = ChannelConfig::new()
            .with_intensity(true, 1.0)
            .with_outline(true, 0.5);
        let requests = build_references(&table, &channels, &SymbolicResolver);

        assert_eq!(requests.len(), 10);
        assert!(requests[..5].iter().all(|r| r.channel == Channel::Intensity));
        assert!(requests[5..].iter().all(|r| r.channel == Channel::Outline));

        let slice3 = &requests[2];
        assert_eq!(slice3.slice, 3);
        assert_eq!(slice3.inputs.iter().map(|r| r.as_str()).collect::<Vec<_>>(), vec!["src_slice:2", "src_slice:4"]);
        assert_eq!(slice3.weights, vec![1.0, 1.0]);
        assert_eq!(slice3.output.as_str(), "processed:3");

        let outline3 = &requests[7];
        assert_eq!(outline3.inputs[0].as_str(), "outline:2");
        assert_eq!(outline3.output.as_str(), "poutline:3");
    }

    #[test]
    fn test_inactive_channel_emits_nothing() {
        let table = compute_weights(SliceRange::new(1, 5).unwrap(), 1);
        let channels = ChannelConfig::new()
            .with_intensity(false, 1.0)
            .with_outline(true, 0.0);
        assert!(build_references(&table, &channels, &SymbolicResolver).is_empty());
    }

    #[test]
    fn test_zero_radius_requests_are_rejected() {
        let table = compute_weights(SliceRange::new(1, 3).unwrap(), 0);
        let requests = build_references(&table, &ChannelConfig::new(), &SymbolicResolver);
        assert_eq!(requests.len(), 3);
        assert!(requests.iter().all(|r| r.inputs.is_empty()));

        let err = check_references(&requests).unwrap_err();
        assert_eq!(err.failed_slices(), vec![1, 2, 3]);
        assert!(err.failures().iter().all(|f| f.stage == Stage::ReferenceBuild));
    }
}
