//! Validation utilities for iteration configuration.
//!
//! Every check here runs before the first operation is built, so a bad
//! configuration aborts the iteration with nothing submitted.

use histostack_core::{ChannelSetting, SliceIndex, SliceRange};
use crate::error::{IterationError, Result};

/// Largest number of slices one iteration accepts.
pub const MAX_SLICES: usize = 1 << 20;

/// Validate the slice range bounds.
pub fn validate_slice_range(start: SliceIndex, end: SliceIndex) -> Result<SliceRange> {
    let range = SliceRange::new(start, end).ok_or_else(|| {
        IterationError::configuration(format!(
            "start slice ({}) must not be greater than end slice ({})",
            start, end
        ))
    })?;
    if range.len() > MAX_SLICES {
        return Err(IterationError::configuration(format!(
            "Slice range {} holds more than {} slices",
            range, MAX_SLICES
        )));
    }
    Ok(range)
}

/// Validate the neighborhood radius.
pub fn validate_radius(eps: i64) -> Result<u32> {
    if eps < 0 {
        return Err(IterationError::configuration(format!(
            "Neighbourhood radius must be non-negative, got {}",
            eps
        )));
    }

    u32::try_from(eps).map_err(|_| {
        IterationError::configuration(format!("Neighbourhood radius too large: {}", eps))
    })
}

/// Validate a channel weight.
pub fn validate_channel_weight(name: &str, setting: &ChannelSetting) -> Result<()> {
    if !setting.weight.is_finite() || setting.weight < 0.0 {
        return Err(IterationError::configuration(format!(
            "{} channel weight must be a finite non-negative number, got {}",
            name, setting.weight
        )));
    }

    Ok(())
}

/// Validate a neighbor weight produced by a weighting function.
pub fn validate_neighbor_weight(target: SliceIndex, neighbor: SliceIndex, weight: f64) -> Result<()> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(IterationError::configuration(format!(
            "Weight of neighbor {} for slice {} must be finite and non-negative, got {}",
            neighbor, target, weight
        )));
    }

    Ok(())
}

/// Validate the solver iteration schedule.
pub fn validate_iteration_schedule(schedule: &[u32]) -> Result<()> {
    if schedule.is_empty() {
        return Err(IterationError::configuration(
            "Iteration schedule must contain at least one level",
        ));
    }

    Ok(())
}

/// Parse an iteration schedule written as `100x50x0`.
pub fn parse_iteration_schedule(text: &str) -> Result<Vec<u32>> {
    let text = text.trim();
    if text.is_empty() {
        return Err(IterationError::configuration("Iteration schedule is empty"));
    }

    let schedule = text
        .split('x')
        .map(|level| {
            level.trim().parse::<u32>().map_err(|_| {
                IterationError::configuration(format!(
                    "Invalid iteration schedule '{}': '{}' is not a non-negative integer",
                    text, level
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    validate_iteration_schedule(&schedule)?;
    Ok(schedule)
}

/// Validate the SyN gradient step.
pub fn validate_gradient_step(step: f64) -> Result<()> {
    if !step.is_finite() || step <= 0.0 {
        return Err(IterationError::configuration(format!(
            "SyN gradient step must be positive, got {}",
            step
        )));
    }

    Ok(())
}

/// Validate regularization parameters.
pub fn validate_regularization_parameters(parameters: &[f64]) -> Result<()> {
    if parameters.is_empty() {
        return Err(IterationError::configuration(
            "Regularization needs at least one parameter",
        ));
    }

    if let Some(bad) = parameters.iter().find(|p| !p.is_finite() || **p < 0.0) {
        return Err(IterationError::configuration(format!(
            "Regularization parameters must be finite and non-negative, got {}",
            bad
        )));
    }

    Ok(())
}

/// Validate the similarity metric parameter.
pub fn validate_metric_parameter(parameter: f64) -> Result<()> {
    if !parameter.is_finite() || parameter < 0.0 {
        return Err(IterationError::configuration(format!(
            "Metric parameter must be finite and non-negative, got {}",
            parameter
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_slice_range() {
        assert!(validate_slice_range(1, 5).is_ok());
        assert!(validate_slice_range(5, 5).is_ok());
        assert!(validate_slice_range(6, 5).is_err());
    }

    #[test]
    fn test_oversized_slice_range_is_rejected() {
        assert!(validate_slice_range(SliceIndex::MIN, SliceIndex::MAX).is_err());
        assert!(validate_slice_range(0, MAX_SLICES as SliceIndex - 1).is_ok());
        assert!(validate_slice_range(0, MAX_SLICES as SliceIndex).is_err());
    }

    #[test]
    fn test_validate_radius() {
        assert_eq!(validate_radius(0).unwrap(), 0);
        assert_eq!(validate_radius(3).unwrap(), 3);
        assert!(validate_radius(-1).is_err());
        assert!(validate_radius(i64::MAX).is_err());
    }

    #[test]
    fn test_validate_channel_weight() {
        assert!(validate_channel_weight("intensity", &ChannelSetting::new(true, 1.0)).is_ok());
        assert!(validate_channel_weight("intensity", &ChannelSetting::new(true, 0.0)).is_ok());
        assert!(validate_channel_weight("outline", &ChannelSetting::new(true, -1.0)).is_err());
        assert!(validate_channel_weight("outline", &ChannelSetting::new(true, f64::NAN)).is_err());
    }

    #[test]
    fn test_parse_iteration_schedule() {
        assert_eq!(parse_iteration_schedule("1000x500x0").unwrap(), vec![1000, 500, 0]);
        assert_eq!(parse_iteration_schedule(" 20 ").unwrap(), vec![20]);
        assert!(parse_iteration_schedule("").is_err());
        assert!(parse_iteration_schedule("10xx5").is_err());
        assert!(parse_iteration_schedule("10x-5").is_err());
        assert!(parse_iteration_schedule("ten").is_err());
    }

    #[test]
    fn test_validate_regularization_parameters() {
        assert!(validate_regularization_parameters(&[3.0, 1.0]).is_ok());
        assert!(validate_regularization_parameters(&[]).is_err());
        assert!(validate_regularization_parameters(&[3.0, -1.0]).is_err());
    }

    #[test]
    fn test_validate_gradient_step() {
        assert!(validate_gradient_step(0.25).is_ok());
        assert!(validate_gradient_step(0.0).is_err());
        assert!(validate_gradient_step(f64::INFINITY).is_err());
    }
}
