//! Image channels taking part in an iteration.

use serde::{Deserialize, Serialize};
use crate::artifact::ArtifactKind;

/// An image channel of the slice stack.
///
/// The declaration order is the order in which channels contribute
/// similarity metrics to a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    Intensity,
    Outline,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Intensity, Channel::Outline];

    /// Raw per-slice image of this channel.
    pub fn raw_kind(&self) -> ArtifactKind {
        match self {
            Channel::Intensity => ArtifactKind::SourceSlice,
            Channel::Outline => ArtifactKind::Outline,
        }
    }

    /// Synthetic neighborhood reference of this channel.
    pub fn reference_kind(&self) -> ArtifactKind {
        match self {
            Channel::Intensity => ArtifactKind::IntensityReference,
            Channel::Outline => ArtifactKind::OutlineReference,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Intensity => "intensity",
            Channel::Outline => "outline",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Presence flag and weight of a single channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelSetting {
    pub enabled: bool,
    pub weight: f64,
}

impl ChannelSetting {
    pub fn new(enabled: bool, weight: f64) -> Self {
        Self { enabled, weight }
    }

    pub fn disabled() -> Self {
        Self { enabled: false, weight: 0.0 }
    }

    /// A channel is active only when it is enabled and carries a positive weight.
    pub fn is_active(&self) -> bool {
        self.enabled && self.weight > 0.0
    }
}

impl Default for ChannelSetting {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Channel configuration of an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub intensity: ChannelSetting,
    pub outline: ChannelSetting,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            intensity: ChannelSetting::new(true, 1.0),
            outline: ChannelSetting::disabled(),
        }
    }
}

impl ChannelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the intensity channel.
    pub fn with_intensity(mut self, enabled: bool, weight: f64) -> Self {
        self.intensity = ChannelSetting::new(enabled, weight);
        self
    }

    /// Set the outline channel.
    pub fn with_outline(mut self, enabled: bool, weight: f64) -> Self {
        self.outline = ChannelSetting::new(enabled, weight);
        self
    }

    pub fn setting(&self, channel: Channel) -> &ChannelSetting {
        match channel {
            Channel::Intensity => &self.intensity,
            Channel::Outline => &self.outline,
        }
    }

    /// Active channels with their weights, intensity first.
    pub fn active(&self) -> Vec<(Channel, f64)> {
        Channel::ALL
            .iter()
            .filter_map(|&channel| {
                let setting = self.setting(channel);
                setting.is_active().then_some((channel, setting.weight))
            })
            .collect()
    }

    pub fn any_active(&self) -> bool {
        self.intensity.is_active() || self.outline.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_needs_flag_and_weight() {
        assert!(ChannelSetting::new(true, 2.0).is_active());
        assert!(!ChannelSetting::new(true, 0.0).is_active());
        assert!(!ChannelSetting::new(false, 2.0).is_active());
    }

    #[test]
    fn test_active_order_is_intensity_then_outline() {
        let config = ChannelConfig::new()
            .with_intensity(true, 2.0)
            .with_outline(true, 0.5);
        assert_eq!(
            config.active(),
            vec![(Channel::Intensity, 2.0), (Channel::Outline, 0.5)]
        );
    }

    #[test]
    fn test_inactive_outline_is_skipped() {
        let config = ChannelConfig::new()
            .with_intensity(true, 2.0)
            .with_outline(true, 0.0);
        assert_eq!(config.active(), vec![(Channel::Intensity, 2.0)]);
    }

    #[test]
    fn test_channel_kinds() {
        assert_eq!(Channel::Intensity.raw_kind(), ArtifactKind::SourceSlice);
        assert_eq!(Channel::Outline.reference_kind(), ArtifactKind::OutlineReference);
    }
}
