//! Execution backends.
//!
//! The engine hands each stage to an [`ExecutionBackend`] as one ordered
//! batch. Operations inside a batch are independent, so a backend may run
//! them in any order or concurrently; the report always lists outcomes in
//! submission order.

use std::sync::{Arc, Mutex};
use rayon::prelude::*;
use crate::error::{IterationError, OperationFailure, Result, Stage};
use crate::operation::Operation;
use crate::progress::{ProgressCallback, ProgressTracker};

/// Runs a single operation.
pub trait OperationRunner: Send + Sync {
    fn run(&self, operation: &Operation) -> std::result::Result<(), String>;
}

impl<R: OperationRunner + ?Sized> OperationRunner for Arc<R> {
    fn run(&self, operation: &Operation) -> std::result::Result<(), String> {
        (**self).run(operation)
    }
}

/// Outcome of one operation of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationOutcome {
    pub failure: Option<OperationFailure>,
}

/// Per-item outcomes of a submitted batch, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub stage: Stage,
    pub outcomes: Vec<OperationOutcome>,
}

impl BatchReport {
    pub fn failures(&self) -> Vec<OperationFailure> {
        self.outcomes.iter().filter_map(|o| o.failure.clone()).collect()
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.failure.is_none())
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Runs a whole stage batch and blocks until every item has finished.
pub trait ExecutionBackend {
    fn execute(&self, stage: Stage, batch: &[Operation]) -> BatchReport;
}

fn run_tracked<R: OperationRunner>(
    runner: &R,
    tracker: &ProgressTracker,
    stage: Stage,
    operation: &Operation,
) -> OperationOutcome {
    tracing::debug!("Running {} for slice {}", operation.kind(), operation.slice());
    let failure = runner.run(operation).err().map(|message| OperationFailure {
        slice: operation.slice(),
        stage,
        operation: operation.kind(),
        message,
    });
    tracker.update(operation.slice(), failure.as_ref());
    OperationOutcome { failure }
}

/// Runs operations one after another on the calling thread.
pub struct SequentialBackend<R> {
    runner: R,
    progress: ProgressTracker,
}

impl<R: OperationRunner> SequentialBackend<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            progress: ProgressTracker::new(),
        }
    }

    /// Add a progress callback.
    pub fn with_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress.add_callback(callback);
        self
    }
}

impl<R: OperationRunner> ExecutionBackend for SequentialBackend<R> {
    fn execute(&self, stage: Stage, batch: &[Operation]) -> BatchReport {
        self.progress.start(stage, batch.len());
        let outcomes: Vec<OperationOutcome> = batch
            .iter()
            .map(|op| run_tracked(&self.runner, &self.progress, stage, op))
            .collect();
        self.progress.complete();
        BatchReport { stage, outcomes }
    }
}

/// Runs operations across a fixed-size worker pool.
pub struct ParallelBackend<R> {
    runner: R,
    pool: rayon::ThreadPool,
    progress: ProgressTracker,
}

impl<R: OperationRunner> ParallelBackend<R> {
    /// Create a backend with `workers` threads.
    pub fn new(runner: R, workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(IterationError::configuration("Worker pool needs at least one worker"));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("histostack-worker-{}", i))
            .build()
            .map_err(|e| IterationError::configuration(format!("Failed to build worker pool: {}", e)))?;

        Ok(Self {
            runner,
            pool,
            progress: ProgressTracker::new(),
        })
    }

    /// Add a progress callback.
    pub fn with_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress.add_callback(callback);
        self
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl<R: OperationRunner> ExecutionBackend for ParallelBackend<R> {
    fn execute(&self, stage: Stage, batch: &[Operation]) -> BatchReport {
        self.progress.start(stage, batch.len());
        let outcomes: Vec<OperationOutcome> = self.pool.install(|| {
            batch
                .par_iter()
                .map(|op| run_tracked(&self.runner, &self.progress, stage, op))
                .collect()
        });
        self.progress.complete();
        BatchReport { stage, outcomes }
    }
}

/// Logs every operation without running it and records submitted batches.
#[derive(Debug, Default)]
pub struct DryRunBackend {
    submitted: Mutex<Vec<(Stage, Vec<Operation>)>>,
}

impl DryRunBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches submitted so far, in submission order.
    pub fn submitted(&self) -> Vec<(Stage, Vec<Operation>)> {
        self.submitted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ExecutionBackend for DryRunBackend {
    fn execute(&self, stage: Stage, batch: &[Operation]) -> BatchReport {
        for op in batch {
            tracing::info!("[dry-run] {} stage: {} for slice {}", stage, op.kind(), op.slice());
        }
        self.submitted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((stage, batch.to_vec()));

        BatchReport {
            stage,
            outcomes: vec![OperationOutcome { failure: None }; batch.len()],
        }
    }
}
