mod common;

use std::path::PathBuf;
use std::sync::Arc;

use common::{sample_zip, RecordingSink};
use zip_runner::config::EngineConfig;
use zip_runner::operations::{ExtractOperation, InspectOperation, ListOperation};
use zip_runner::progress::FINISHED_STATUS;
use zip_runner::secret::ProtectedSecret;
use zip_runner::{
    Coordinator, ErrorKind, OutputObject, Password, PasswordSource, Worker, WorkerState, ZipEngine,
};

fn engine() -> Arc<ZipEngine> {
    Arc::new(ZipEngine::new(EngineConfig {
        buffer_size: 8,
        verify_threads: 2,
    }))
}

#[test]
fn extracting_the_sample_streams_messages_and_writes_files() {
    let dir = tempfile::tempdir().unwrap();
    sample_zip(&dir.path().join("sample.zip"), None);

    let worker = Worker::new(
        engine(),
        ExtractOperation::new(dir.path(), "out"),
        dir.path(),
        vec![PathBuf::from("sample.zip")],
        Password::default(),
    );
    let mut sink = RecordingSink::default();
    let summary = Coordinator::new().run(worker, &mut sink).unwrap();

    assert!(summary.succeeded());
    let lines = sink.verbose();
    assert!(lines[0].starts_with("Extracting archive"));
    assert!(lines.contains(&"Extracting file \"a.txt\""));
    assert!(lines.contains(&"Extracting file \"b/c.txt\""));
    assert_eq!(lines.last(), Some(&"Extraction finished"));

    let percents = sink.percents();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{percents:?}");
    assert_eq!(percents.last(), Some(&100));

    let terminal = sink.terminal().unwrap();
    assert_eq!(terminal.status, FINISHED_STATUS);

    let out = dir.path().join("out");
    assert_eq!(std::fs::metadata(out.join("a.txt")).unwrap().len(), 10);
    assert_eq!(std::fs::metadata(out.join("b/c.txt")).unwrap().len(), 20);
}

#[test]
fn wrong_password_is_one_access_error_and_nothing_else() {
    let dir = tempfile::tempdir().unwrap();
    sample_zip(&dir.path().join("locked.zip"), Some("correct horse"));

    let password = PasswordSource::Plain("battery staple".into()).resolve().unwrap();
    let worker = Worker::new(
        engine(),
        ExtractOperation::new(dir.path(), "out"),
        dir.path(),
        vec![PathBuf::from("locked.zip")],
        password,
    );
    let mut sink = RecordingSink::default();
    let summary = Coordinator::new().run(worker, &mut sink).unwrap();

    assert_eq!(summary.state, WorkerState::Failed);
    assert_eq!(sink.errors(), vec![ErrorKind::Access]);
    assert!(sink.objects().is_empty());
    assert!(!sink.verbose().contains(&"Extraction finished"));
    assert!(!dir.path().join("out").join("a.txt").exists());
    assert!(sink.terminal().is_some());
}

#[test]
fn protected_password_opens_an_encrypted_archive() {
    let dir = tempfile::tempdir().unwrap();
    sample_zip(&dir.path().join("locked.zip"), Some("correct horse"));

    let source = PasswordSource::from_parts(None, Some(ProtectedSecret::new("correct horse"))).unwrap();
    let worker = Worker::new(
        engine(),
        ExtractOperation::new(dir.path(), "out"),
        dir.path(),
        vec![PathBuf::from("locked.zip")],
        source.resolve().unwrap(),
    );
    let mut sink = RecordingSink::default();
    let summary = Coordinator::new().run(worker, &mut sink).unwrap();

    assert!(summary.succeeded(), "{:?}", sink.seen);
    assert_eq!(
        std::fs::read(dir.path().join("out/b/c.txt")).unwrap(),
        vec![b'c'; 20]
    );
}

#[test]
fn inspecting_the_sample_returns_one_information_object() {
    let dir = tempfile::tempdir().unwrap();
    sample_zip(&dir.path().join("sample.zip"), None);

    let worker = Worker::new(
        engine(),
        InspectOperation,
        dir.path(),
        vec![PathBuf::from("sample.zip")],
        Password::default(),
    );
    let mut sink = RecordingSink::default();
    let summary = Coordinator::new().run(worker, &mut sink).unwrap();

    assert!(summary.succeeded());
    let objects = sink.objects();
    assert_eq!(objects.len(), 1);
    match objects[0] {
        OutputObject::Information(info) => {
            assert_eq!(info.files_count, 2);
            assert!(info.files.iter().any(|f| f == "a.txt"));
            assert!(info.files.iter().any(|f| f == "b/c.txt"));
            assert_eq!(info.unpacked_size, 30);
            assert_eq!(info.file_name, "sample.zip");
        }
        other => panic!("unexpected object {other:?}"),
    }
}

#[test]
fn listing_several_archives_reports_progress_per_archive() {
    let dir = tempfile::tempdir().unwrap();
    sample_zip(&dir.path().join("one.zip"), None);
    sample_zip(&dir.path().join("two.zip"), None);

    let worker = Worker::new(
        engine(),
        ListOperation,
        dir.path(),
        vec![PathBuf::from("one.zip"), PathBuf::from("two.zip")],
        Password::default(),
    );
    let mut sink = RecordingSink::default();
    let summary = Coordinator::new().run(worker, &mut sink).unwrap();

    assert!(summary.succeeded());
    assert_eq!(summary.objects, 4);
    assert_eq!(
        sink.verbose()
            .iter()
            .filter(|l| l.starts_with("Getting archive data"))
            .count(),
        2
    );
    assert_eq!(sink.percents(), vec![50, 100, 100]);
}

#[test]
fn cancelled_operation_opens_nothing() {
    let dir = tempfile::tempdir().unwrap();
    sample_zip(&dir.path().join("sample.zip"), None);

    let coordinator = Coordinator::new();
    coordinator.cancellation().cancel();

    let worker = Worker::new(
        engine(),
        ExtractOperation::new(dir.path(), "out"),
        dir.path(),
        vec![PathBuf::from("sample.zip")],
        Password::default(),
    );
    let mut sink = RecordingSink::default();
    let summary = coordinator.run(worker, &mut sink).unwrap();

    assert_eq!(summary.state, WorkerState::Cancelled);
    assert!(sink.errors().is_empty());
    assert!(!dir.path().join("out").exists());
    assert!(sink.terminal().is_some());
}

#[test]
fn both_password_sources_fail_before_any_worker() {
    let err = PasswordSource::from_parts(
        Some("plain".into()),
        Some(ProtectedSecret::new("protected")),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}
