use anyhow::Result;
use burn_ndarray::NdArray;
use histostack_core::{ArtifactKind, ChannelConfig, SliceRange};
use histostack_io::command::render_operation;
use histostack_io::selection::{parse_masked, parse_subset};
use histostack_io::{ArtifactLayout, NiftiAverager, ToolPaths};
use histostack_iteration::{
    DeformableIteration, IterationConfig, Operation, OperationRunner, SequentialBackend,
    SliceSelection,
};
use ndarray::Array2;
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};
use std::sync::Mutex;
use tempfile::tempdir;

type TestBackend = NdArray<f32>;

/// Averages in process, records everything else.
struct LocalRunner {
    averager: NiftiAverager<TestBackend>,
    rendered: Mutex<Vec<String>>,
}

impl OperationRunner for LocalRunner {
    fn run(&self, operation: &Operation) -> Result<(), String> {
        match operation {
            Operation::Average(_) => self.averager.run(operation),
            other => {
                let line = render_operation(&ToolPaths::default(), other)
                    .map_err(|e| e.to_string())?
                    .join(" ");
                self.rendered.lock().unwrap().push(line);
                Ok(())
            }
        }
    }
}

#[test]
fn test_iteration_builds_references_on_disk() -> Result<()> {
    let dir = tempdir()?;
    let layout = ArtifactLayout::new(dir.path());
    layout.prepare()?;
    std::fs::create_dir_all(dir.path().join(ArtifactLayout::dir_name(ArtifactKind::SourceSlice)))?;

    for slice in 1..=5 {
        let array = Array2::from_elem((6, 5), slice as f32);
        WriterOptions::new(layout.path(ArtifactKind::SourceSlice, slice)).write_nifti(&array)?;
    }

    let range = SliceRange::new(1, 5).unwrap();
    let subset = parse_subset("1\n3\n5\n")?;
    let selection = SliceSelection::resolve(range, &Default::default(), Some(&subset[..]), None)?;
    let config = IterationConfig::new(1, 5)
        .with_neighbourhood(1)
        .with_channels(ChannelConfig::new().with_intensity(true, 1.0));

    let runner = LocalRunner {
        averager: NiftiAverager::new(Default::default()),
        rendered: Mutex::new(Vec::new()),
    };
    let backend = SequentialBackend::new(runner);
    let report = DeformableIteration::new(config, selection, layout.clone()).run(&backend)?;

    assert_eq!(report.averages, 5);
    assert_eq!(report.registrations, 3);
    assert_eq!(report.blanks, 2);

    // slice 3 averages slices 2 and 4; slice 1 only has slice 2
    let expected = [(1, 2.0f32), (3, 3.0), (5, 4.0)];
    for (slice, value) in expected {
        let obj = ReaderOptions::new().read_file(layout.path(ArtifactKind::IntensityReference, slice))?;
        let volume = obj.into_volume().into_ndarray::<f32>()?;
        assert_eq!(volume.shape(), &[6, 5]);
        assert!(volume.iter().all(|v| (v - value).abs() < 1e-6), "slice {}", slice);
    }
    Ok(())
}

#[test]
fn test_masked_plan_uses_layout_paths() -> Result<()> {
    let layout = ArtifactLayout::new("/work");
    let range = SliceRange::new(10, 14).unwrap();
    let pairs = parse_masked("12 10\n")?;
    let config = IterationConfig::new(10, 14).with_masked(true, 1.0);
    let selection = SliceSelection::resolve(range, &config.masked, None, Some(&pairs[..]))?;

    let plan = DeformableIteration::new(config, selection, layout).plan()?;
    assert_eq!(plan.registration_count(), 1);
    assert_eq!(plan.blank_count(), 4);

    let lines: Vec<String> = plan
        .registration_batch()
        .iter()
        .map(|op| render_operation(&ToolPaths::default(), op).map(|args| args.join(" ")))
        .collect::<Result<_>>()?;

    assert!(lines[2].contains("CC[/work/00_src_slices/0010.nii.gz,/work/00_src_slices/0012.nii.gz,1,4]"));
    assert!(lines[2].ends_with("-x /work/04_cmask/0010.nii.gz"));
    assert!(lines[0].starts_with("c2d /work/00_src_slices/0010.nii.gz -scale 0"));
    assert!(lines[0].ends_with("/work/11_transformations/0010Warp.nii.gz"));
    Ok(())
}
