//! Runs a [`Worker`] on its own thread and forwards its output to a sink.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::cancel::CancellationToken;
use crate::channel::OutputChannel;
use crate::error::{ArchiveError, Result, SinkError};
use crate::message::{ErrorRecord, Message, OutputObject};
use crate::progress::ProgressState;
use crate::worker::{ArchiveOperation, Worker, WorkerOutput, WorkerState};

static NEXT_ACTIVITY_ID: AtomicU32 = AtomicU32::new(1);

/// Destination for everything a worker produces, called on the invoking thread.
pub trait OutputSink {
    fn write_progress(&mut self, progress: &ProgressState) -> std::result::Result<(), SinkError>;

    fn write_verbose(&mut self, line: &str) -> std::result::Result<(), SinkError>;

    fn write_error(&mut self, record: &ErrorRecord) -> std::result::Result<(), SinkError>;

    fn write_object(&mut self, object: &OutputObject) -> std::result::Result<(), SinkError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub state: WorkerState,
    pub errors: usize,
    pub objects: usize,
}

impl RunSummary {
    pub fn succeeded(&self) -> bool {
        self.state == WorkerState::Succeeded && self.errors == 0
    }
}

/// Owns the cancellation signal for one operation.
pub struct Coordinator {
    cancel: CancellationToken,
    activity_id: u32,
}

impl Coordinator {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            activity_id: NEXT_ACTIVITY_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// A handle that an interrupt handler can use to stop the operation.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        if self.cancel.cancel() {
            debug!("Cancellation requested for activity {}", self.activity_id);
        }
    }

    /// Runs the worker to completion, dispatching its messages to `sink` as they
    /// arrive. Worker failures are delivered as error records; only sink
    /// failures and thread spawn failures are returned as errors.
    pub fn run<O: ArchiveOperation>(
        &self,
        mut worker: Worker<O>,
        sink: &mut dyn OutputSink,
    ) -> Result<RunSummary> {
        let channel = Arc::new(OutputChannel::new());
        let progress = Arc::new(Mutex::new(ProgressState::starting(self.activity_id)));
        let output = WorkerOutput::new(Arc::clone(&channel), Arc::clone(&progress));

        let cancel = self.cancel.clone();
        let handle = thread::Builder::new()
            .name(format!("archive-worker-{}", self.activity_id))
            .spawn(move || {
                match catch_unwind(AssertUnwindSafe(|| worker.execute(&cancel, &output))) {
                    Ok(state) => state,
                    Err(payload) => {
                        let reason = panic_message(payload.as_ref());
                        error!("Archive worker panicked: {}", reason);
                        output.write_error(ErrorRecord::new(ArchiveError::WorkerPanicked(reason), None));
                        output.close();
                        WorkerState::Failed
                    }
                }
            })?;

        let mut summary = RunSummary {
            state: WorkerState::Running,
            errors: 0,
            objects: 0,
        };
        let mut sink_error = None;

        for message in channel.drain() {
            match &message {
                Message::Error(_) => summary.errors += 1,
                Message::Object(_) => summary.objects += 1,
                _ => {}
            }
            if sink_error.is_some() {
                continue;
            }
            if let Err(e) = dispatch(sink, &message) {
                warn!("Output sink failed, stopping the worker: {}", e);
                self.cancel();
                sink_error = Some(e);
            }
        }

        summary.state = handle.join().unwrap_or_else(|_| {
            error!("Archive worker thread terminated abnormally");
            WorkerState::Failed
        });

        let terminal = {
            let mut progress = progress.lock();
            progress.complete();
            progress.clone()
        };
        match sink.write_progress(&terminal) {
            Ok(()) => {}
            Err(SinkError::Detached) => debug!("Progress display already gone at completion"),
            Err(e) if sink_error.is_none() => sink_error = Some(e),
            Err(e) => warn!("Final progress not written: {}", e),
        }

        match sink_error {
            Some(e) => Err(e.into()),
            None => Ok(summary),
        }
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

fn dispatch(sink: &mut dyn OutputSink, message: &Message) -> std::result::Result<(), SinkError> {
    match message {
        Message::Log(line) => sink.write_verbose(line),
        Message::Progress(progress) => sink.write_progress(progress),
        Message::Error(record) => sink.write_error(record),
        Message::Object(object) => sink.write_object(object),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
