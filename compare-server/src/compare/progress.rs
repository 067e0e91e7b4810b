//! Progress reporting for comparisons.

/// Receives caller-visible progress while a comparison runs.
///
/// Calls are made inline from the comparison task, so implementations must
/// return promptly.
pub trait ProgressSink: Send + Sync {
    /// `completed` of `total` steps are done.
    fn progress(&self, completed: usize, total: usize);

    fn info(&self, _message: &str) {}

    fn warn(&self, _message: &str) {}
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn progress(&self, _completed: usize, _total: usize) {}
}

/// Forwards progress to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn progress(&self, completed: usize, total: usize) {
        tracing::debug!(completed, total, "comparison progress");
    }

    fn info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }
}
