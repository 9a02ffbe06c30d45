use anyhow::Result;
use burn_ndarray::NdArray;
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

mod args;
mod progress_bar;

use args::IterationArgs;
use histostack_io::command::render_operation;
use histostack_io::{write_config, ArtifactLayout, CommandRunner, NiftiAverager, ToolPaths};
use histostack_iteration::{
    ConsoleProgressCallback, DeformableIteration, DryRunBackend, ExecutionBackend, ParallelBackend,
    SequentialBackend,
};
use progress_bar::ProgressBarCallback;

#[derive(Parser)]
#[command(name = "histostack")]
#[command(about = "Slice-wise deformable reconstruction of histological stacks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one reconstruction iteration
    Run {
        #[command(flatten)]
        iteration: IterationArgs,

        #[command(flatten)]
        execution: ExecutionArgs,
    },

    /// Print the commands of one iteration without running them
    Plan {
        #[command(flatten)]
        iteration: IterationArgs,

        #[command(flatten)]
        tools: ToolArgs,
    },
}

#[derive(Debug, Clone, Args)]
struct ToolArgs {
    /// ANTs registration executable
    #[arg(long, default_value = "ANTS")]
    ants_path: String,

    /// Convert3D executable
    #[arg(long, default_value = "c2d")]
    c2d_path: String,
}

impl ToolArgs {
    fn tools(&self) -> ToolPaths {
        ToolPaths {
            ants: self.ants_path.clone(),
            c2d: self.c2d_path.clone(),
        }
    }
}

#[derive(Debug, Clone, Args)]
struct ExecutionArgs {
    /// Number of worker processes
    #[arg(short, long, default_value = "1")]
    jobs: usize,

    /// Build reference images in process instead of calling c2d
    #[arg(long)]
    in_process_average: bool,

    /// Log operations without running them
    #[arg(long)]
    dry_run: bool,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,

    #[command(flatten)]
    tools: ToolArgs,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { iteration, execution } => run(&iteration, &execution),
        Commands::Plan { iteration, tools } => plan(&iteration, &tools),
    }
}

fn build_iteration(args: &IterationArgs) -> Result<DeformableIteration<ArtifactLayout>> {
    let config = args.to_config()?;
    if let Some(path) = &args.save_config {
        write_config(path, &config)?;
        info!("Saved effective config to {}", path.display());
    }
    let selection = args.to_selection(&config)?;
    info!(
        "Slices [{}, {}], radius {}, {} slices to register, {} masked assignments",
        config.start_slice,
        config.end_slice,
        config.neighbourhood,
        selection.subset.len(),
        selection.masked.len()
    );

    Ok(DeformableIteration::new(config, selection, ArtifactLayout::new(&args.work_dir)))
}

fn build_backend(execution: &ExecutionArgs) -> Result<Box<dyn ExecutionBackend>> {
    if execution.dry_run {
        return Ok(Box::new(DryRunBackend::new()));
    }

    let mut runner = CommandRunner::new(execution.tools.tools());
    if execution.in_process_average {
        runner = runner.with_averager(Box::new(NiftiAverager::<NdArray<f32>>::new(Default::default())));
    }

    let console = Arc::new(ConsoleProgressCallback::default());
    let backend: Box<dyn ExecutionBackend> = if execution.jobs > 1 {
        let mut backend = ParallelBackend::new(runner, execution.jobs)?.with_callback(console);
        if !execution.no_progress {
            backend = backend.with_callback(Arc::new(ProgressBarCallback::new()));
        }
        Box::new(backend)
    } else {
        let mut backend = SequentialBackend::new(runner).with_callback(console);
        if !execution.no_progress {
            backend = backend.with_callback(Arc::new(ProgressBarCallback::new()));
        }
        Box::new(backend)
    };
    Ok(backend)
}

fn run(args: &IterationArgs, execution: &ExecutionArgs) -> Result<()> {
    let iteration = build_iteration(args)?;
    if !execution.dry_run {
        ArtifactLayout::new(&args.work_dir).prepare()?;
    }
    let backend = build_backend(execution)?;

    let report = iteration.run(backend.as_ref())?;
    info!(
        "Iteration complete: {} references, {} registrations, {} identity transforms",
        report.averages, report.registrations, report.blanks
    );
    Ok(())
}

fn plan(args: &IterationArgs, tools: &ToolArgs) -> Result<()> {
    let iteration = build_iteration(args)?;
    let plan = iteration.plan()?;
    let tools = tools.tools();

    println!("# reference-build stage ({} operations)", plan.references.len());
    for op in plan.reference_batch() {
        println!("{}", render_operation(&tools, &op)?.join(" "));
    }
    println!();
    println!("# registration stage ({} operations)", plan.requests.len());
    for op in plan.registration_batch() {
        println!("{}", render_operation(&tools, &op)?.join(" "));
    }
    Ok(())
}
