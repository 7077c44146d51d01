//! Background unit of work for one archive command.
//!
//! A [`Worker`] walks its archives one by one: it checks for cancellation,
//! resolves the archive identity, opens a session through the engine and hands
//! it to its [`ArchiveOperation`]. Failures never escape [`Worker::execute`];
//! they are turned into error records, and the output channel is closed on
//! every return path.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::cancel::CancellationToken;
use crate::channel::OutputChannel;
use crate::engine::{ArchiveEngine, ArchiveSession};
use crate::error::{ArchiveError, Result};
use crate::message::{ErrorRecord, Message, OutputObject};
use crate::models::{ArchiveIdentity, Password};
use crate::progress::{percent_of, ProgressHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

/// The worker's side of the output channel plus the shared progress record.
#[derive(Clone)]
pub struct WorkerOutput {
    channel: Arc<OutputChannel>,
    progress: ProgressHandle,
}

impl WorkerOutput {
    pub fn new(channel: Arc<OutputChannel>, progress: ProgressHandle) -> Self {
        Self { channel, progress }
    }

    pub fn write(&self, text: impl Into<String>) {
        self.channel.push(Message::Log(text.into()));
    }

    pub fn write_object(&self, object: OutputObject) {
        self.channel.push(Message::Object(object));
    }

    pub fn write_error(&self, record: ErrorRecord) {
        self.channel.push(Message::Error(record));
    }

    /// Pushes a snapshot of the current progress record.
    pub fn write_progress(&self) {
        let snapshot = self.progress.lock().clone();
        self.channel.push(Message::Progress(snapshot));
    }

    /// Raises the percentage and pushes a snapshot when it changed.
    pub fn advance(&self, percent: u8) {
        let snapshot = {
            let mut progress = self.progress.lock();
            progress.advance(percent).then(|| progress.clone())
        };
        if let Some(snapshot) = snapshot {
            self.channel.push(Message::Progress(snapshot));
        }
    }

    pub fn begin(&self, activity: impl Into<String>, status: impl Into<String>) {
        self.progress.lock().begin(activity, status);
    }

    pub fn set_status(&self, status: impl Into<String>) {
        self.progress.lock().set_status(status);
    }

    pub fn progress(&self) -> &ProgressHandle {
        &self.progress
    }

    pub(crate) fn close(&self) -> bool {
        self.channel.close()
    }
}

/// What a worker does with each opened archive.
pub trait ArchiveOperation: Send + 'static {
    /// Runs before the archive is opened, e.g. to announce it.
    fn prepare(&mut self, archive: &ArchiveIdentity, output: &WorkerOutput);

    fn run(
        &mut self,
        session: &mut dyn ArchiveSession,
        archive: &ArchiveIdentity,
        output: &WorkerOutput,
    ) -> Result<()>;
}

pub struct Worker<O> {
    operation: O,
    engine: Arc<dyn ArchiveEngine>,
    base_dir: PathBuf,
    archives: Vec<PathBuf>,
    password: Password,
    state: WorkerState,
    current: Option<PathBuf>,
}

impl<O: ArchiveOperation> Worker<O> {
    pub fn new(
        engine: Arc<dyn ArchiveEngine>,
        operation: O,
        base_dir: impl Into<PathBuf>,
        archives: Vec<PathBuf>,
        password: Password,
    ) -> Self {
        Self {
            operation,
            engine,
            base_dir: base_dir.into(),
            archives,
            password,
            state: WorkerState::Pending,
            current: None,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Runs the operation to a final state. Closes the output channel before returning.
    pub fn execute(&mut self, cancel: &CancellationToken, output: &WorkerOutput) -> WorkerState {
        self.state = match self.process(cancel, output) {
            Ok(()) => WorkerState::Succeeded,
            Err(ArchiveError::Cancelled) => {
                info!("Archive operation cancelled");
                WorkerState::Cancelled
            }
            Err(e) => {
                error!("Archive operation failed: {}", e);
                output.write_error(ErrorRecord::new(e, self.current.clone()));
                WorkerState::Failed
            }
        };
        output.close();
        self.state
    }

    fn process(&mut self, cancel: &CancellationToken, output: &WorkerOutput) -> Result<()> {
        cancel.check()?;
        self.state = WorkerState::Running;

        let total = self.archives.len() as u64;
        for (done, raw) in self.archives.iter().enumerate() {
            // Cancellation is only observed before an archive is opened.
            cancel.check()?;

            let identity = ArchiveIdentity::resolve(&self.base_dir, raw, self.password.clone());
            self.current = Some(identity.path().to_path_buf());
            debug!("Processing {:?}", identity.path());

            self.operation.prepare(&identity, output);
            let mut session = self.engine.open(identity.path(), identity.password())?;
            let result = self.operation.run(session.as_mut(), &identity, output);
            session.close();
            result?;

            output.advance(percent_of(done as u64 + 1, total));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::engine::EngineEvents;
    use crate::error::ErrorKind;
    use crate::models::{ArchiveEntry, ArchiveInformation};
    use crate::progress::ProgressState;
    use parking_lot::Mutex;
    use std::path::Path;

    /// Which engine step a [`ScriptedEngine`] should fail at.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum FailAt {
        Nowhere,
        Open,
        Extract,
        Panic,
    }

    /// Engine double that records opens and closes and fails on request.
    pub struct ScriptedEngine {
        pub fail_at: FailAt,
        pub opened: Arc<Mutex<Vec<PathBuf>>>,
        pub closed: Arc<Mutex<usize>>,
        /// Cancelled right after the first file of an extraction starts.
        pub cancel_mid_extract: Option<CancellationToken>,
    }

    impl ScriptedEngine {
        pub fn new(fail_at: FailAt) -> Self {
            Self {
                fail_at,
                opened: Arc::default(),
                closed: Arc::default(),
                cancel_mid_extract: None,
            }
        }
    }

    struct ScriptedSession {
        fail_at: FailAt,
        closed: Arc<Mutex<usize>>,
        events: EngineEvents,
        cancel_mid_extract: Option<CancellationToken>,
    }

    impl ArchiveEngine for ScriptedEngine {
        fn open(&self, path: &Path, _password: Option<&str>) -> Result<Box<dyn ArchiveSession>> {
            self.opened.lock().push(path.to_path_buf());
            if self.fail_at == FailAt::Open {
                return Err(ArchiveError::access(path, "scripted open failure"));
            }
            Ok(Box::new(ScriptedSession {
                fail_at: self.fail_at,
                closed: Arc::clone(&self.closed),
                events: EngineEvents::default(),
                cancel_mid_extract: self.cancel_mid_extract.clone(),
            }))
        }
    }

    impl ArchiveSession for ScriptedSession {
        fn subscribe(&mut self, events: EngineEvents) {
            self.events = events;
        }

        fn extract(&mut self, _target: &Path) -> Result<()> {
            self.events.file_started("a.txt");
            if let Some(cancel) = &self.cancel_mid_extract {
                cancel.cancel();
            }
            self.events.progress(50);
            match self.fail_at {
                FailAt::Extract => return Err(ArchiveError::extraction(Some("b/c.txt"), "disk full")),
                FailAt::Panic => panic!("scripted engine panic"),
                _ => {}
            }
            self.events.file_started("b/c.txt");
            self.events.progress(100);
            Ok(())
        }

        fn entries(&mut self) -> Result<Vec<ArchiveEntry>> {
            Ok(Vec::new())
        }

        fn check(&mut self) -> Result<()> {
            Ok(())
        }

        fn information(&mut self) -> Result<ArchiveInformation> {
            Err(ArchiveError::integrity("*", "not scripted"))
        }

        fn close(self: Box<Self>) {}
    }

    impl Drop for ScriptedSession {
        fn drop(&mut self) {
            *self.closed.lock() += 1;
        }
    }

    struct CountingOperation {
        runs: usize,
    }

    impl ArchiveOperation for CountingOperation {
        fn prepare(&mut self, archive: &ArchiveIdentity, output: &WorkerOutput) {
            output.write(format!("prepare {}", archive.file_name()));
        }

        fn run(
            &mut self,
            session: &mut dyn ArchiveSession,
            _archive: &ArchiveIdentity,
            _output: &WorkerOutput,
        ) -> Result<()> {
            self.runs += 1;
            session.extract(Path::new("/unused"))
        }
    }

    fn output() -> (Arc<OutputChannel>, WorkerOutput) {
        let channel = Arc::new(OutputChannel::new());
        let progress = Arc::new(Mutex::new(ProgressState::starting(1)));
        (Arc::clone(&channel), WorkerOutput::new(channel, progress))
    }

    fn worker(engine: ScriptedEngine, archives: &[&str]) -> Worker<CountingOperation> {
        Worker::new(
            Arc::new(engine),
            CountingOperation { runs: 0 },
            "/base",
            archives.iter().map(PathBuf::from).collect(),
            Password::default(),
        )
    }

    #[test]
    fn success_closes_the_channel_and_session() {
        let engine = ScriptedEngine::new(FailAt::Nowhere);
        let closed = Arc::clone(&engine.closed);
        let mut worker = worker(engine, &["one.zip", "two.zip"]);
        let (channel, out) = output();

        assert_eq!(worker.state(), WorkerState::Pending);
        let state = worker.execute(&CancellationToken::new(), &out);

        assert_eq!(state, WorkerState::Succeeded);
        assert!(channel.is_closed());
        assert_eq!(*closed.lock(), 2);
        assert_eq!(worker.operation.runs, 2);
    }

    #[test]
    fn cancelled_before_start_never_opens() {
        let engine = ScriptedEngine::new(FailAt::Nowhere);
        let opened = Arc::clone(&engine.opened);
        let mut worker = worker(engine, &["one.zip"]);
        let (channel, out) = output();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let state = worker.execute(&cancel, &out);

        assert_eq!(state, WorkerState::Cancelled);
        assert!(opened.lock().is_empty());
        assert!(channel.is_closed());
        assert_eq!(channel.drain().count(), 0);
    }

    #[test]
    fn open_failure_becomes_one_error_record() {
        let mut worker = worker(ScriptedEngine::new(FailAt::Open), &["missing.zip"]);
        let (channel, out) = output();

        let state = worker.execute(&CancellationToken::new(), &out);
        assert_eq!(state, WorkerState::Failed);

        let errors: Vec<ErrorRecord> = channel
            .drain()
            .filter_map(|m| match m {
                Message::Error(record) => Some(record),
                _ => None,
            })
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].cause.kind(), ErrorKind::Access);
        assert_eq!(errors[0].target.as_deref(), Some(Path::new("/base/missing.zip")));
    }

    #[test]
    fn failure_mid_operation_still_closes_everything() {
        let engine = ScriptedEngine::new(FailAt::Extract);
        let closed = Arc::clone(&engine.closed);
        let mut worker = worker(engine, &["one.zip", "two.zip"]);
        let (channel, out) = output();

        let state = worker.execute(&CancellationToken::new(), &out);

        assert_eq!(state, WorkerState::Failed);
        assert!(channel.is_closed());
        assert_eq!(*closed.lock(), 1);
        // The second archive is never attempted after the first failure.
        assert_eq!(worker.operation.runs, 1);
    }
}
