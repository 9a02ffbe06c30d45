use indicatif::{ProgressBar, ProgressStyle};
use histostack_iteration::progress::{ProgressCallback, ProgressInfo};
use histostack_iteration::Stage;

/// Terminal progress bar for stage batches.
pub struct ProgressBarCallback {
    bar: ProgressBar,
}

impl ProgressBarCallback {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg:>16} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Self { bar }
    }
}

impl ProgressCallback for ProgressBarCallback {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_position(info.completed as u64);
    }

    fn on_stage_start(&self, stage: Stage, total: usize) {
        self.bar.reset();
        self.bar.set_length(total as u64);
        self.bar.set_message(stage.to_string());
    }

    fn on_stage_complete(&self, info: &ProgressInfo) {
        self.bar
            .finish_with_message(format!("{} ({} failed)", info.stage, info.failed));
    }
}
