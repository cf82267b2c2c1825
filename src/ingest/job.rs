//! Cancellation and progress for a running pass.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use log::info;

/// Shared cancellation flag, cloned into everything that must observe it.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a pass reports to, and polls, while it runs.
pub trait IngestJobContext {
    /// Polled before every unit of work.
    fn is_cancelled(&self) -> bool;

    /// Called once the total number of units is known.
    fn switch_to_determinate(&self, total_units: usize);

    fn progress(&self, message: &str, position: Option<usize>);

    /// Completion notification posted once at the end of a pass.
    fn post_message(&self, subject: &str, details: &str);
}

/// Job context that reports through the log.
#[derive(Debug, Clone, Default)]
pub struct LoggingJob {
    cancel: CancellationFlag,
    total_units: Arc<AtomicUsize>,
}

impl LoggingJob {
    pub fn new(cancel: CancellationFlag) -> Self {
        Self {
            cancel,
            total_units: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl IngestJobContext for LoggingJob {
    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn switch_to_determinate(&self, total_units: usize) {
        self.total_units.store(total_units, Ordering::SeqCst);
    }

    fn progress(&self, message: &str, position: Option<usize>) {
        let total = self.total_units.load(Ordering::SeqCst);
        match position {
            Some(pos) if total > 0 => info!("[{}/{}] {}", pos, total, message),
            _ => info!("{}", message),
        }
    }

    fn post_message(&self, subject: &str, details: &str) {
        info!("{}: {}", subject, details);
    }
}
