use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use histostack_io::{read_config, read_masked_file, read_subset_file};
use histostack_iteration::validation::parse_iteration_schedule;
use histostack_iteration::{IterationConfig, MetricKind, RegularizationKind, SliceSelection};

#[derive(Debug, Clone, Args)]
pub struct IterationArgs {
    /// JSON config file; explicit flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Work directory holding the numbered artifact directories
    #[arg(short, long)]
    pub work_dir: PathBuf,

    /// First slice of the range
    #[arg(long, allow_negative_numbers = true)]
    pub start_slice: Option<i64>,

    /// Last slice of the range (inclusive)
    #[arg(long, allow_negative_numbers = true)]
    pub end_slice: Option<i64>,

    /// Neighbourhood radius used to build the reference images
    #[arg(long, allow_negative_numbers = true)]
    pub neighbourhood: Option<i64>,

    /// Use the intensity channel (on by default)
    #[arg(long, conflicts_with = "no_input_volume")]
    pub input_volume: bool,

    /// Leave the intensity channel out of the references and metrics
    #[arg(long)]
    pub no_input_volume: bool,

    /// Weight of the intensity channel
    #[arg(long)]
    pub input_volume_weight: Option<f64>,

    /// Use the outline channel
    #[arg(long)]
    pub outline_volume: bool,

    /// Weight of the outline channel
    #[arg(long)]
    pub outline_volume_weight: Option<f64>,

    /// Enable registration against anchor slices
    #[arg(long)]
    pub masked_volume: bool,

    /// Weight switch of the masked registration
    #[arg(long)]
    pub masked_volume_weight: Option<f64>,

    /// Two-column file of `slice anchor` pairs
    #[arg(long)]
    pub masked_volume_file: Option<PathBuf>,

    /// File listing the slices to register; all others get identity transforms
    #[arg(long)]
    pub register_subset: Option<PathBuf>,

    /// Similarity metric (CC, MI, MSQ, PR)
    #[arg(long)]
    pub ants_image_metric: Option<MetricKind>,

    /// Metric parameter (radius for CC, bins for MI)
    #[arg(long)]
    pub ants_image_metric_opt: Option<f64>,

    /// Iterations per level, e.g. 1000x1000
    #[arg(long)]
    pub ants_iterations: Option<String>,

    /// SyN gradient step
    #[arg(long)]
    pub ants_transformation: Option<f64>,

    /// Regularization type (Gauss, DMFFD)
    #[arg(long)]
    pub ants_regularization_type: Option<RegularizationKind>,

    /// Regularization parameters, comma separated
    #[arg(long, value_delimiter = ',')]
    pub ants_regularization: Option<Vec<f64>>,

    /// Write the effective config to this file
    #[arg(long)]
    pub save_config: Option<PathBuf>,
}

impl IterationArgs {
    /// Base config from file (or defaults) with explicit flags applied.
    pub fn to_config(&self) -> Result<IterationConfig> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => IterationConfig::default(),
        };

        if let Some(start) = self.start_slice {
            config.start_slice = start;
        }
        if let Some(end) = self.end_slice {
            config.end_slice = end;
        }
        if let Some(eps) = self.neighbourhood {
            config.neighbourhood = eps;
        }

        if self.input_volume {
            config.channels.intensity.enabled = true;
        }
        if self.no_input_volume {
            config.channels.intensity.enabled = false;
        }
        if let Some(weight) = self.input_volume_weight {
            config.channels.intensity.weight = weight;
        }
        if self.outline_volume {
            config.channels.outline.enabled = true;
        }
        if let Some(weight) = self.outline_volume_weight {
            config.channels.outline.weight = weight;
        }
        if self.masked_volume {
            config.masked.enabled = true;
        }
        if let Some(weight) = self.masked_volume_weight {
            config.masked.weight = weight;
        }

        let registration = &mut config.registration;
        if let Some(metric) = self.ants_image_metric {
            registration.metric = metric;
        }
        if let Some(parameter) = self.ants_image_metric_opt {
            registration.metric_parameter = parameter;
        }
        if let Some(schedule) = &self.ants_iterations {
            registration.iterations = parse_iteration_schedule(schedule)?;
        }
        if let Some(step) = self.ants_transformation {
            registration.gradient_step = step;
        }
        if let Some(kind) = self.ants_regularization_type {
            registration.regularization.kind = kind;
        }
        if let Some(parameters) = &self.ants_regularization {
            registration.regularization.parameters = parameters.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Read the optional selection files.
    pub fn to_selection(&self, config: &IterationConfig) -> Result<SliceSelection> {
        let range = config.slice_range()?;
        let subset = self
            .register_subset
            .as_ref()
            .map(read_subset_file)
            .transpose()?;
        let masked = self
            .masked_volume_file
            .as_ref()
            .map(read_masked_file)
            .transpose()?;

        SliceSelection::resolve(range, &config.masked, subset.as_deref(), masked.as_deref())
            .context("Invalid slice selection")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: IterationArgs,
    }

    fn parse(argv: &[&str]) -> IterationArgs {
        TestCli::parse_from(std::iter::once("histostack").chain(argv.iter().copied())).args
    }

    #[test]
    fn test_flags_build_config() {
        let args = parse(&[
            "--work-dir", "/tmp/w",
            "--start-slice", "1",
            "--end-slice", "20",
            "--neighbourhood", "2",
            "--outline-volume",
            "--outline-volume-weight", "0.5",
            "--ants-image-metric", "MI",
            "--ants-iterations", "100x50",
            "--ants-regularization", "2,0.5",
        ]);
        let config = args.to_config().unwrap();
        assert_eq!((config.start_slice, config.end_slice, config.neighbourhood), (1, 20, 2));
        assert!(config.channels.outline.is_active());
        assert_eq!(config.registration.metric, MetricKind::MutualInformation);
        assert_eq!(config.registration.iterations, vec![100, 50]);
        assert_eq!(config.registration.regularization.parameters, vec![2.0, 0.5]);
    }

    #[test]
    fn test_negative_radius_is_rejected() {
        let args = parse(&[
            "--work-dir", "/tmp/w",
            "--start-slice", "1",
            "--end-slice", "5",
            "--neighbourhood", "-1",
        ]);
        assert!(args.to_config().is_err());
    }

    #[test]
    fn test_no_input_volume_disables_intensity() {
        let args = parse(&[
            "--work-dir", "/tmp/w",
            "--start-slice", "1",
            "--end-slice", "5",
            "--no-input-volume",
            "--outline-volume",
        ]);
        let config = args.to_config().unwrap();
        assert!(!config.channels.intensity.is_active());
        assert!(config.channels.outline.is_active());
    }

    #[test]
    fn test_intensity_is_on_without_flags() {
        let args = parse(&["--work-dir", "/tmp/w", "--start-slice", "1", "--end-slice", "5"]);
        assert!(args.to_config().unwrap().channels.intensity.is_active());
    }

    #[test]
    fn test_input_volume_switches_conflict() {
        let result = TestCli::try_parse_from([
            "histostack", "--work-dir", "/tmp/w", "--input-volume", "--no-input-volume",
        ]);
        assert!(result.is_err());
    }
}
