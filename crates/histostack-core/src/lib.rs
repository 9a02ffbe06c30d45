pub mod slice;
pub mod artifact;
pub mod channel;

pub use slice::{SliceIndex, SliceRange};
pub use artifact::{ArtifactKind, ArtifactResolver, ImageRef, SymbolicResolver};
pub use channel::{Channel, ChannelConfig, ChannelSetting};
