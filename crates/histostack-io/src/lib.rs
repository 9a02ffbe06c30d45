pub mod layout;
pub mod selection;
pub mod config;
pub mod command;
pub mod average;

pub use layout::ArtifactLayout;
pub use selection::{read_masked_file, read_subset_file};
pub use config::{read_config, write_config};
pub use command::{render_operation, CommandRunner, ToolPaths};
pub use average::NiftiAverager;
