//! Progress tracking and callbacks for batch execution.
//!
//! Backends report each finished operation to a [`ProgressTracker`], which
//! fans the information out to the registered callbacks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use histostack_core::SliceIndex;
use crate::error::{OperationFailure, Stage};

/// Progress information for one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressInfo {
    pub stage: Stage,
    /// Operations finished so far.
    pub completed: usize,
    /// Operations in the batch.
    pub total: usize,
    /// Operations that failed so far.
    pub failed: usize,
    /// Slice of the most recently finished operation.
    pub slice: Option<SliceIndex>,
    /// Time elapsed since the stage started.
    pub elapsed: Duration,
    /// Estimated remaining time.
    pub estimated_remaining: Option<Duration>,
}

impl ProgressInfo {
    pub fn new(stage: Stage, completed: usize, total: usize, elapsed: Duration) -> Self {
        Self {
            stage,
            completed,
            total,
            failed: 0,
            slice: None,
            elapsed,
            estimated_remaining: None,
        }
    }

    /// Calculate progress percentage.
    pub fn progress_percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.completed as f64 / self.total as f64) * 100.0
    }

    /// Calculate estimated remaining time.
    pub fn calculate_remaining(&mut self) {
        if self.completed > 0 {
            let per_op = self.elapsed.as_secs_f64() / self.completed as f64;
            let remaining = self.total.saturating_sub(self.completed);
            self.estimated_remaining = Some(Duration::from_secs_f64(per_op * remaining as f64));
        }
    }
}

/// Progress callback trait for monitoring batch execution.
pub trait ProgressCallback: Send + Sync {
    /// Called after each finished operation.
    fn on_progress(&self, info: &ProgressInfo);

    /// Called when a stage batch is submitted.
    fn on_stage_start(&self, _stage: Stage, _total: usize) {}

    /// Called when every operation of the stage has finished.
    fn on_stage_complete(&self, _info: &ProgressInfo) {}

    /// Called for each failed operation.
    fn on_error(&self, _failure: &OperationFailure) {}
}

/// Console progress callback that logs to tracing.
#[derive(Debug, Clone)]
pub struct ConsoleProgressCallback {
    log_interval: usize,
}

impl Default for ConsoleProgressCallback {
    fn default() -> Self {
        Self { log_interval: 10 }
    }
}

impl ConsoleProgressCallback {
    /// Log every n-th finished operation. An interval of 0 is treated as 1.
    pub fn new(log_interval: usize) -> Self {
        Self {
            log_interval: log_interval.max(1),
        }
    }

    pub fn log_interval(&self) -> usize {
        self.log_interval
    }
}

impl ProgressCallback for ConsoleProgressCallback {
    fn on_progress(&self, info: &ProgressInfo) {
        if info.completed % self.log_interval == 0 || info.completed == info.total {
            let remaining = info
                .estimated_remaining
                .map(|d| format!("{:.1}s", d.as_secs_f64()))
                .unwrap_or_else(|| "N/A".to_string());

            tracing::info!(
                "{} {}/{} ({:.1}%) | failed: {} | elapsed: {:.1}s | ETA: {}",
                info.stage,
                info.completed,
                info.total,
                info.progress_percent(),
                info.failed,
                info.elapsed.as_secs_f64(),
                remaining
            );
        }
    }

    fn on_stage_start(&self, stage: Stage, total: usize) {
        tracing::info!("Submitting {} stage: {} operations", stage, total);
    }

    fn on_stage_complete(&self, info: &ProgressInfo) {
        tracing::info!(
            "{} stage finished in {:.2}s ({} failed of {})",
            info.stage,
            info.elapsed.as_secs_f64(),
            info.failed,
            info.total
        );
    }

    fn on_error(&self, failure: &OperationFailure) {
        tracing::error!("Operation failed: {}", failure);
    }
}

/// Event recorded by [`HistoryCallback`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    StageStarted { stage: Stage, total: usize },
    Progress(ProgressInfo),
    StageCompleted(ProgressInfo),
    Failed(OperationFailure),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// History callback that records every event.
#[derive(Debug, Clone, Default)]
pub struct HistoryCallback {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl HistoryCallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the recorded events.
    pub fn events(&self) -> Vec<ProgressEvent> {
        lock(&self.events).clone()
    }

    /// Stages in the order they were started.
    pub fn started_stages(&self) -> Vec<Stage> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::StageStarted { stage, .. } => Some(*stage),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        lock(&self.events).clear();
    }
}

impl ProgressCallback for HistoryCallback {
    fn on_progress(&self, info: &ProgressInfo) {
        lock(&self.events).push(ProgressEvent::Progress(info.clone()));
    }

    fn on_stage_start(&self, stage: Stage, total: usize) {
        lock(&self.events).push(ProgressEvent::StageStarted { stage, total });
    }

    fn on_stage_complete(&self, info: &ProgressInfo) {
        lock(&self.events).push(ProgressEvent::StageCompleted(info.clone()));
    }

    fn on_error(&self, failure: &OperationFailure) {
        lock(&self.events).push(ProgressEvent::Failed(failure.clone()));
    }
}

/// Progress tracker that manages multiple callbacks.
///
/// Safe to update from several worker threads.
#[derive(Clone, Default)]
pub struct ProgressTracker {
    callbacks: Vec<Arc<dyn ProgressCallback>>,
    state: Arc<TrackerState>,
}

#[derive(Default)]
struct TrackerState {
    stage: Mutex<Option<(Stage, Instant)>>,
    total: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a callback.
    pub fn add_callback(&mut self, callback: Arc<dyn ProgressCallback>) {
        self.callbacks.push(callback);
    }

    /// Start tracking a stage batch.
    pub fn start(&self, stage: Stage, total: usize) {
        *lock(&self.state.stage) = Some((stage, Instant::now()));
        self.state.total.store(total, Ordering::SeqCst);
        self.state.completed.store(0, Ordering::SeqCst);
        self.state.failed.store(0, Ordering::SeqCst);
        for callback in &self.callbacks {
            callback.on_stage_start(stage, total);
        }
    }

    fn snapshot(&self, completed: usize) -> ProgressInfo {
        let current = *lock(&self.state.stage);
        let (stage, started) = current.unwrap_or((Stage::ReferenceBuild, Instant::now()));
        let mut info = ProgressInfo::new(
            stage,
            completed,
            self.state.total.load(Ordering::SeqCst),
            started.elapsed(),
        );
        info.failed = self.state.failed.load(Ordering::SeqCst);
        info
    }

    /// Record one finished operation.
    pub fn update(&self, slice: SliceIndex, failure: Option<&OperationFailure>) {
        if let Some(failure) = failure {
            self.state.failed.fetch_add(1, Ordering::SeqCst);
            for callback in &self.callbacks {
                callback.on_error(failure);
            }
        }

        let completed = self.state.completed.fetch_add(1, Ordering::SeqCst) + 1;
        let mut info = self.snapshot(completed);
        info.slice = Some(slice);
        info.calculate_remaining();

        for callback in &self.callbacks {
            callback.on_progress(&info);
        }
    }

    /// Complete tracking of the current stage.
    pub fn complete(&self) {
        let info = self.snapshot(self.state.completed.load(Ordering::SeqCst));
        for callback in &self.callbacks {
            callback.on_stage_complete(&info);
        }
    }
}
