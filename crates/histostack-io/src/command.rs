//! Rendering of operations into external tool invocations.
//!
//! Averages and identity transforms are expressed as Convert3D (`c2d`)
//! stack programs, registrations as ANTs `ANTS` calls.

use anyhow::{anyhow, bail, Context, Result};
use std::process::Command;
use histostack_iteration::operation::{
    AverageRequest, BlankRequest, RegistrationRequest, SLICE_DIMENSION,
};
use histostack_iteration::{Operation, OperationRunner};

/// Executables used by [`CommandRunner`].
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub ants: String,
    pub c2d: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ants: "ANTS".to_string(),
            c2d: "c2d".to_string(),
        }
    }
}

fn join_numbers<T: std::fmt::Display>(values: &[T], separator: &str) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(separator)
}

/// `c2d a -scale wa b -scale wb -add ... -type float -o out`, weights
/// normalized to sum to one.
pub fn render_average(tools: &ToolPaths, request: &AverageRequest) -> Result<Vec<String>> {
    request.validate().map_err(|e| anyhow!(e))?;
    let total: f64 = request.weights.iter().sum();
    if total <= 0.0 {
        bail!(
            "{} reference of slice {}: weights sum to {}",
            request.channel,
            request.slice,
            total
        );
    }

    let mut args = vec![tools.c2d.clone()];
    for (i, (input, weight)) in request.inputs.iter().zip(&request.weights).enumerate() {
        args.push(input.to_string());
        args.push("-scale".to_string());
        args.push((weight / total).to_string());
        if i > 0 {
            args.push("-add".to_string());
        }
    }
    args.extend([
        "-type".to_string(),
        request.output_type.name().to_string(),
        "-o".to_string(),
        request.output.to_string(),
    ]);
    Ok(args)
}

pub fn render_registration(tools: &ToolPaths, request: &RegistrationRequest) -> Result<Vec<String>> {
    if request.metrics.is_empty() {
        bail!("registration of slice {} has no metrics", request.slice);
    }

    let mut args = vec![tools.ants.clone(), request.dimension.to_string()];
    for metric in &request.metrics {
        args.push("-m".to_string());
        args.push(format!(
            "{}[{},{},{},{}]",
            metric.kind.ants_name(),
            metric.fixed,
            metric.moving,
            metric.weight,
            metric.parameter
        ));
    }
    args.extend([
        "-t".to_string(),
        format!("SyN[{}]", request.transform.gradient_step),
        "-r".to_string(),
        format!(
            "{}[{}]",
            request.regularization.kind.ants_name(),
            join_numbers(&request.regularization.parameters, ",")
        ),
        "-o".to_string(),
        request.output_naming.to_string(),
        "-i".to_string(),
        join_numbers(&request.iterations, "x"),
        "--number-of-affine-iterations".to_string(),
        join_numbers(&request.affine.iterations, "x"),
        "--rigid-affine".to_string(),
        request.affine.rigid.to_string(),
        "--continue-affine".to_string(),
        request.affine.continue_affine.to_string(),
    ]);
    if request.all_metrics_converge {
        args.push("--use-all-metrics-for-convergence".to_string());
        args.push("1".to_string());
    }
    if let Some(mask) = &request.mask {
        args.push("-x".to_string());
        args.push(mask.to_string());
    }
    Ok(args)
}

/// Zero two-component displacement field on the grid of the input slice.
pub fn render_blank(tools: &ToolPaths, request: &BlankRequest) -> Vec<String> {
    vec![
        tools.c2d.clone(),
        request.input.to_string(),
        "-scale".to_string(),
        "0".to_string(),
        "-dup".to_string(),
        "-omc".to_string(),
        SLICE_DIMENSION.to_string(),
        request.output.to_string(),
    ]
}

pub fn render_operation(tools: &ToolPaths, operation: &Operation) -> Result<Vec<String>> {
    match operation {
        Operation::Average(a) => render_average(tools, a),
        Operation::Register(r) => render_registration(tools, r),
        Operation::Blank(b) => Ok(render_blank(tools, b)),
    }
}

/// Runs operations as external processes.
///
/// Averages can be routed to an in-process runner instead.
pub struct CommandRunner {
    tools: ToolPaths,
    averager: Option<Box<dyn OperationRunner>>,
}

impl CommandRunner {
    pub fn new(tools: ToolPaths) -> Self {
        Self { tools, averager: None }
    }

    /// Run weighted averages with `averager` instead of `c2d`.
    pub fn with_averager(mut self, averager: Box<dyn OperationRunner>) -> Self {
        self.averager = Some(averager);
        self
    }

    fn spawn(&self, args: &[String]) -> Result<()> {
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| anyhow!("empty command line"))?;
        tracing::debug!("Executing: {}", args.join(" "));

        let output = Command::new(program)
            .args(rest)
            .output()
            .with_context(|| format!("Failed to start {}", program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            bail!(
                "{} exited with {}: {}",
                program,
                output.status,
                tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
            );
        }
        Ok(())
    }
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new(ToolPaths::default())
    }
}

impl OperationRunner for CommandRunner {
    fn run(&self, operation: &Operation) -> std::result::Result<(), String> {
        if let (Operation::Average(_), Some(averager)) = (operation, &self.averager) {
            return averager.run(operation);
        }
        render_operation(&self.tools, operation)
            .and_then(|args| self.spawn(&args))
            .map_err(|e| format!("{:#}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use histostack_core::{Channel, ChannelConfig, ImageRef, SliceRange, SymbolicResolver};
    use histostack_iteration::driver::plan_iteration;
    use histostack_iteration::operation::PixelType;
    use histostack_iteration::{IterationConfig, SliceRequest, SliceSelection};

    fn average(weights: Vec<f64>) -> AverageRequest {
        AverageRequest {
            slice: 3,
            channel: Channel::Intensity,
            inputs: (0..weights.len()).map(|i| ImageRef::new(format!("n{}.nii.gz", i))).collect(),
            weights,
            output_type: PixelType::Float,
            output: ImageRef::new("ref.nii.gz"),
        }
    }

    #[test]
    fn test_render_average_normalizes_weights() {
        let args = render_average(&ToolPaths::default(), &average(vec![1.0, 3.0])).unwrap();
        assert_eq!(
            args.join(" "),
            "c2d n0.nii.gz -scale 0.25 n1.nii.gz -scale 0.75 -add -type float -o ref.nii.gz"
        );
    }

    #[test]
    fn test_render_average_rejects_empty_and_zero_weights() {
        assert!(render_average(&ToolPaths::default(), &average(vec![])).is_err());
        assert!(render_average(&ToolPaths::default(), &average(vec![0.0, 0.0])).is_err());
    }

    #[test]
    fn test_render_registration() {
        let config = IterationConfig::new(1, 5)
            .with_channels(ChannelConfig::new().with_intensity(true, 2.0).with_outline(true, 1.0));
        let range = SliceRange::new(1, 5).unwrap();
        let plan = plan_iteration(&config, &SliceSelection::full(range), &SymbolicResolver, None).unwrap();
        let SliceRequest::Register(request) = &plan.requests[1] else {
            panic!("slice 2 should be registered");
        };

        let line = render_registration(&ToolPaths::default(), request).unwrap().join(" ");
        assert_eq!(
            line,
            "ANTS 2 -m CC[processed:2,src_slice:2,2,4] -m CC[poutline:2,outline:2,1,4] \
             -t SyN[0.25] -r Gauss[3,1] -o out_naming:2 -i 1000x1000 \
             --number-of-affine-iterations 0 --rigid-affine false --continue-affine false \
             --use-all-metrics-for-convergence 1"
        );
    }

    #[test]
    fn test_render_blank() {
        let request = BlankRequest {
            slice: 2,
            input: ImageRef::new("in.nii.gz"),
            output: ImageRef::new("0002Warp.nii.gz"),
        };
        assert_eq!(
            render_blank(&ToolPaths::default(), &request).join(" "),
            "c2d in.nii.gz -scale 0 -dup -omc 2 0002Warp.nii.gz"
        );
    }

    #[test]
    fn test_missing_tool_is_reported() {
        let tools = ToolPaths {
            ants: "definitely-not-a-real-ants-binary".to_string(),
            c2d: "definitely-not-a-real-c2d-binary".to_string(),
        };
        let runner = CommandRunner::new(tools);
        let op = Operation::Blank(BlankRequest {
            slice: 1,
            input: ImageRef::new("a"),
            output: ImageRef::new("b"),
        });
        let err = runner.run(&op).unwrap_err();
        assert!(err.contains("Failed to start"));
    }
}
