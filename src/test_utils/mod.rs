//! Test fixtures shared by the unit tests.

#![cfg(test)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::ingest::job::{CancellationFlag, IngestJobContext};

/// Everything a job context saw, for assertions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedJob {
    pub determinate_totals: Vec<usize>,
    pub progress: Vec<(String, Option<usize>)>,
    pub messages: Vec<(String, String)>,
}

/// Job context that records every call and cancels on demand.
///
/// `cancel_after_polls` makes the n-th and later cancellation polls report
/// true, which lets a caller stop a pass at an exact unit boundary.
#[derive(Debug, Default)]
pub struct RecordingJob {
    cancel: CancellationFlag,
    polls: AtomicUsize,
    cancel_after_polls: Option<usize>,
    record: Mutex<RecordedJob>,
}

impl RecordingJob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancelled_after(polls: usize) -> Self {
        Self {
            cancel_after_polls: Some(polls),
            ..Self::default()
        }
    }

    pub fn flag(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn recorded(&self) -> RecordedJob {
        self.record
            .lock()
            .map(|record| record.clone())
            .unwrap_or_default()
    }

    fn with_record(&self, f: impl FnOnce(&mut RecordedJob)) {
        if let Ok(mut record) = self.record.lock() {
            f(&mut record);
        }
    }
}

impl IngestJobContext for RecordingJob {
    fn is_cancelled(&self) -> bool {
        let polled = self.polls.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.cancel_after_polls {
            if polled >= limit {
                self.cancel.cancel();
            }
        }
        self.cancel.is_cancelled()
    }

    fn switch_to_determinate(&self, total_units: usize) {
        self.with_record(|r| r.determinate_totals.push(total_units));
    }

    fn progress(&self, message: &str, position: Option<usize>) {
        self.with_record(|r| r.progress.push((message.to_string(), position)));
    }

    fn post_message(&self, subject: &str, details: &str) {
        self.with_record(|r| r.messages.push((subject.to_string(), details.to_string())));
    }
}

mod tests {
    use super::*;

    #[test]
    fn test_recording_job_cancels_after_polls() {
        let job = RecordingJob::cancelled_after(2);
        assert!(!job.is_cancelled());
        assert!(!job.is_cancelled());
        assert!(job.is_cancelled());
        assert!(job.flag().is_cancelled());
        assert_eq!(job.polls(), 3);
    }

    #[test]
    fn test_recording_job_records_calls() {
        let job = RecordingJob::new();
        job.switch_to_determinate(4);
        job.progress("Processing a.zip", Some(1));
        job.post_message("iLeapp", "done");

        let recorded = job.recorded();
        assert_eq!(recorded.determinate_totals, vec![4]);
        assert_eq!(recorded.progress, vec![("Processing a.zip".to_string(), Some(1))]);
        assert_eq!(recorded.messages.len(), 1);
    }
}
