//! Configuration record of a single reconstruction iteration.
//!
//! The record is assembled once (from a config file or command-line
//! flags), validated, and then only read by the engine.

use serde::{Deserialize, Serialize};
use histostack_core::{ChannelConfig, SliceRange};
use crate::error::Result;
use crate::validation::{
    validate_channel_weight, validate_gradient_step, validate_iteration_schedule,
    validate_metric_parameter, validate_radius, validate_regularization_parameters,
    validate_slice_range,
};

/// Similarity metric used by the registration tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    /// Neighborhood cross-correlation.
    #[serde(rename = "CC")]
    CrossCorrelation,
    /// Mutual information.
    #[serde(rename = "MI")]
    MutualInformation,
    /// Mean squared difference.
    #[serde(rename = "MSQ")]
    MeanSquares,
    /// Probabilistic point-set matching.
    #[serde(rename = "PR")]
    Probabilistic,
}

impl MetricKind {
    pub fn ants_name(&self) -> &'static str {
        match self {
            MetricKind::CrossCorrelation => "CC",
            MetricKind::MutualInformation => "MI",
            MetricKind::MeanSquares => "MSQ",
            MetricKind::Probabilistic => "PR",
        }
    }
}

impl std::str::FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CC" => Ok(MetricKind::CrossCorrelation),
            "MI" => Ok(MetricKind::MutualInformation),
            "MSQ" => Ok(MetricKind::MeanSquares),
            "PR" => Ok(MetricKind::Probabilistic),
            other => Err(format!("unknown metric '{}' (expected CC, MI, MSQ or PR)", other)),
        }
    }
}

/// Regularizer applied to the deformation field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegularizationKind {
    Gauss,
    #[serde(rename = "DMFFD")]
    Dmffd,
}

impl RegularizationKind {
    pub fn ants_name(&self) -> &'static str {
        match self {
            RegularizationKind::Gauss => "Gauss",
            RegularizationKind::Dmffd => "DMFFD",
        }
    }
}

impl std::str::FromStr for RegularizationKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "Gauss" | "gauss" => Ok(RegularizationKind::Gauss),
            "DMFFD" | "dmffd" => Ok(RegularizationKind::Dmffd),
            other => Err(format!("unknown regularization '{}' (expected Gauss or DMFFD)", other)),
        }
    }
}

/// Regularization kind with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Regularization {
    pub kind: RegularizationKind,
    pub parameters: Vec<f64>,
}

impl Default for Regularization {
    fn default() -> Self {
        Self {
            kind: RegularizationKind::Gauss,
            parameters: vec![3.0, 1.0],
        }
    }
}

/// Solver settings shared by all slices of an iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationSettings {
    pub metric: MetricKind,
    /// Metric parameter (radius for CC, bins for MI).
    pub metric_parameter: f64,
    /// Iterations per resolution level, coarse to fine.
    pub iterations: Vec<u32>,
    /// Gradient step of the SyN transform.
    pub gradient_step: f64,
    pub regularization: Regularization,
}

impl Default for RegistrationSettings {
    fn default() -> Self {
        Self {
            metric: MetricKind::CrossCorrelation,
            metric_parameter: 4.0,
            iterations: vec![1000, 1000],
            gradient_step: 0.25,
            regularization: Regularization::default(),
        }
    }
}

/// Switch for registration against operator-chosen anchor slices.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MaskedRegistration {
    pub enabled: bool,
    pub weight: f64,
}

impl MaskedRegistration {
    pub fn is_active(&self) -> bool {
        self.enabled && self.weight > 0.0
    }
}

/// Immutable configuration of one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationConfig {
    pub start_slice: i64,
    pub end_slice: i64,
    /// Neighborhood radius; negative values are rejected by [`IterationConfig::validate`].
    pub neighbourhood: i64,
    #[serde(default)]
    pub channels: ChannelConfig,
    #[serde(default)]
    pub masked: MaskedRegistration,
    #[serde(default)]
    pub registration: RegistrationSettings,
}

impl Default for IterationConfig {
    fn default() -> Self {
        Self {
            start_slice: 0,
            end_slice: 0,
            neighbourhood: 1,
            channels: ChannelConfig::default(),
            masked: MaskedRegistration::default(),
            registration: RegistrationSettings::default(),
        }
    }
}

impl IterationConfig {
    /// Create a config for the inclusive slice range with default settings.
    pub fn new(start_slice: i64, end_slice: i64) -> Self {
        Self {
            start_slice,
            end_slice,
            ..Self::default()
        }
    }

    pub fn with_neighbourhood(mut self, eps: i64) -> Self {
        self.neighbourhood = eps;
        self
    }

    pub fn with_channels(mut self, channels: ChannelConfig) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_masked(mut self, enabled: bool, weight: f64) -> Self {
        self.masked = MaskedRegistration { enabled, weight };
        self
    }

    pub fn with_registration(mut self, registration: RegistrationSettings) -> Self {
        self.registration = registration;
        self
    }

    /// Validated slice range.
    pub fn slice_range(&self) -> Result<SliceRange> {
        validate_slice_range(self.start_slice, self.end_slice)
    }

    /// Validated neighborhood radius.
    pub fn radius(&self) -> Result<u32> {
        validate_radius(self.neighbourhood)
    }

    /// Run every configuration check.
    pub fn validate(&self) -> Result<()> {
        self.slice_range()?;
        self.radius()?;
        validate_channel_weight("intensity", &self.channels.intensity)?;
        validate_channel_weight("outline", &self.channels.outline)?;
        validate_metric_parameter(self.registration.metric_parameter)?;
        validate_iteration_schedule(&self.registration.iterations)?;
        validate_gradient_step(self.registration.gradient_step)?;
        validate_regularization_parameters(&self.registration.regularization.parameters)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = IterationConfig::new(1, 5);
        assert!(config.validate().is_ok());
        assert_eq!(config.slice_range().unwrap().len(), 5);
    }

    #[test]
    fn test_negative_radius_is_rejected() {
        let config = IterationConfig::new(1, 5).with_neighbourhood(-1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_schedule_is_rejected() {
        let mut settings = RegistrationSettings::default();
        settings.iterations.clear();
        let config = IterationConfig::new(1, 5).with_registration(settings);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_metric_kind_parsing() {
        assert_eq!("cc".parse::<MetricKind>().unwrap(), MetricKind::CrossCorrelation);
        assert_eq!("MI".parse::<MetricKind>().unwrap(), MetricKind::MutualInformation);
        assert!("NCC".parse::<MetricKind>().is_err());
    }

    #[test]
    fn test_masked_registration_switch() {
        assert!(!MaskedRegistration::default().is_active());
        assert!(MaskedRegistration { enabled: true, weight: 1.0 }.is_active());
        assert!(!MaskedRegistration { enabled: true, weight: 0.0 }.is_active());
    }
}
