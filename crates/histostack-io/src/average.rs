//! In-process weighted averaging of NIfTI slices.

use anyhow::{anyhow, bail, Context, Result};
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use ndarray::{ArrayD, IxDyn};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use std::path::Path;
use histostack_iteration::operation::AverageRequest;
use histostack_iteration::{Operation, OperationRunner};

struct Slice {
    header: NiftiHeader,
    shape: Vec<usize>,
    values: Vec<f32>,
}

fn read_slice(path: &Path) -> Result<Slice> {
    let obj = ReaderOptions::new()
        .read_file(path)
        .with_context(|| format!("Failed to read NIfTI file {}", path.display()))?;
    let header = obj.header().clone();
    let volume = obj
        .into_volume()
        .into_ndarray::<f32>()
        .context("Failed to convert volume to ndarray")?;

    // iter() walks the logical order whatever the memory layout
    Ok(Slice {
        header,
        shape: volume.shape().to_vec(),
        values: volume.iter().copied().collect(),
    })
}

/// Computes `Σ wᵢ·imgᵢ / Σ wᵢ` with burn tensors and writes a float image.
#[derive(Debug, Clone)]
pub struct NiftiAverager<B: Backend> {
    device: B::Device,
}

impl<B: Backend> NiftiAverager<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    pub fn average(&self, request: &AverageRequest) -> Result<()> {
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

        let mut reference: Option<(NiftiHeader, Vec<usize>)> = None;
        let mut sum: Option<Tensor<B, 1>> = None;

        for (input, weight) in request.inputs.iter().zip(&request.weights) {
            let slice = read_slice(input.as_path())?;
            if let Some((_, shape)) = &reference {
                if *shape != slice.shape {
                    bail!(
                        "{} has shape {:?}, expected {:?}",
                        input,
                        slice.shape,
                        shape
                    );
                }
            }

            let len = slice.values.len();
            let tensor = Tensor::<B, 1>::from_data(TensorData::new(slice.values, [len]), &self.device)
                .mul_scalar((weight / total) as f32);
            sum = Some(match sum {
                Some(acc) => acc.add(tensor),
                None => tensor,
            });
            if reference.is_none() {
                reference = Some((slice.header, slice.shape));
            }
        }

        let (header, shape) = reference.ok_or_else(|| anyhow!("no input images"))?;
        let sum = sum.ok_or_else(|| anyhow!("no input images"))?;
        let values = sum
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Failed to get tensor data: {:?}", e))?;

        let array = ArrayD::from_shape_vec(IxDyn(&shape), values)
            .map_err(|e| anyhow!("Failed to create ndarray: {}", e))?;

        WriterOptions::new(request.output.as_path())
            .reference_header(&header)
            .write_nifti(&array)
            .map_err(|e| anyhow!("Failed to write NIfTI file {}: {}", request.output, e))?;

        tracing::debug!(
            "Averaged {} images into {}",
            request.inputs.len(),
            request.output
        );
        Ok(())
    }
}

impl<B: Backend> OperationRunner for NiftiAverager<B> {
    fn run(&self, operation: &Operation) -> std::result::Result<(), String> {
        match operation {
            Operation::Average(request) => self.average(request).map_err(|e| format!("{:#}", e)),
            other => Err(format!(
                "in-process averager cannot run {} for slice {}",
                other.kind(),
                other.slice()
            )),
        }
    }
}
