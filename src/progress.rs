use std::sync::Arc;

use parking_lot::Mutex;

pub const FINISHED_STATUS: &str = "Finished";

/// Progress of one archive operation as shown to the caller.
///
/// The percentage never decreases, and once [`complete`](Self::complete) has been
/// called the record is terminal and ignores further updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressState {
    pub activity_id: u32,
    pub activity: String,
    pub status: String,
    percent: u8,
    completed: bool,
}

impl ProgressState {
    pub fn new(activity_id: u32, activity: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            activity_id,
            activity: activity.into(),
            status: status.into(),
            percent: 0,
            completed: false,
        }
    }

    /// Placeholder record that exists before the worker has labelled its activity.
    pub fn starting(activity_id: u32) -> Self {
        Self::new(activity_id, "Starting Thread", "Starting")
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Relabels the record for the activity the worker is about to perform.
    pub fn begin(&mut self, activity: impl Into<String>, status: impl Into<String>) {
        if self.completed {
            return;
        }
        self.activity = activity.into();
        self.status = status.into();
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        if !self.completed {
            self.status = status.into();
        }
    }

    /// Raises the percentage, clamped to 100. Returns whether the value changed.
    pub fn advance(&mut self, percent: u8) -> bool {
        let percent = percent.min(100);
        if self.completed || percent <= self.percent {
            return false;
        }
        self.percent = percent;
        true
    }

    pub fn complete(&mut self) {
        self.status = FINISHED_STATUS.to_string();
        self.completed = true;
    }
}

/// Shared progress record; written by the worker, finalised by the coordinator.
pub type ProgressHandle = Arc<Mutex<ProgressState>>;

pub fn percent_of(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) as u128 * 100) / total as u128) as u8
}
