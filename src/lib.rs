//! Archive extraction, listing and inspection on a background worker, with
//! progress, log lines, errors and result objects streamed back to the caller
//! in order.

pub mod cancel;
pub mod channel;
pub mod cli;
pub mod config;
pub mod console;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod message;
pub mod models;
pub mod operations;
pub mod parallel;
pub mod progress;
pub mod secret;
pub mod utils;
pub mod worker;
pub mod zip_engine;

pub use cancel::CancellationToken;
pub use coordinator::{Coordinator, OutputSink, RunSummary};
pub use error::{ArchiveError, ErrorKind, Result, SinkError};
pub use message::{ErrorRecord, Message, OutputObject};
pub use models::{ArchiveEntry, ArchiveIdentity, ArchiveInformation, Password, PasswordSource};
pub use progress::ProgressState;
pub use worker::{Worker, WorkerState};
pub use zip_engine::ZipEngine;
