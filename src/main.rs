use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use zip_runner::cli::{self, Commands, PASSWORD_ENV};
use zip_runner::config::EngineConfig;
use zip_runner::console::ConsoleSink;
use zip_runner::coordinator::{Coordinator, RunSummary};
use zip_runner::engine::ArchiveEngine;
use zip_runner::operations::{ExtractOperation, InspectOperation, ListOperation};
use zip_runner::worker::{ArchiveOperation, Worker, WorkerState};
use zip_runner::{CancellationToken, Result, ZipEngine};

const EXIT_CANCELLED: u8 = 130;

fn main() -> ExitCode {
    let args = cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    match run_app(args.command) {
        Ok(summary) => match summary.state {
            WorkerState::Cancelled => ExitCode::from(EXIT_CANCELLED),
            _ if summary.succeeded() => ExitCode::SUCCESS,
            _ => ExitCode::FAILURE,
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_app(command: Commands) -> Result<RunSummary> {
    let common = command.common().clone();

    let password = common
        .password_source(std::env::var(PASSWORD_ENV).ok(), || {
            rpassword::prompt_password("Archive password: ")
        })?
        .resolve()?;
    let config = EngineConfig::from_env()?.with_overrides(common.buffer_size, common.threads)?;
    debug!("Engine configuration: {:?}", config);

    let base_dir = std::env::current_dir()?;
    let engine: Arc<dyn ArchiveEngine> = Arc::new(ZipEngine::new(config));
    let coordinator = Coordinator::new();
    watch_interrupts(coordinator.cancellation());

    let mut sink = ConsoleSink::new(common.verbose, common.json);

    match command {
        Commands::Extract { archive, target, .. } => {
            let operation = ExtractOperation::new(&base_dir, target);
            let worker = Worker::new(engine, operation, base_dir, vec![archive], password);
            run_worker(&coordinator, worker, &mut sink)
        }
        Commands::List { archives, .. } => {
            let worker = Worker::new(engine, ListOperation, base_dir, archives, password);
            run_worker(&coordinator, worker, &mut sink)
        }
        Commands::Info { archives, .. } => {
            let worker = Worker::new(engine, InspectOperation, base_dir, archives, password);
            run_worker(&coordinator, worker, &mut sink)
        }
    }
}

fn run_worker<O: ArchiveOperation>(
    coordinator: &Coordinator,
    worker: Worker<O>,
    sink: &mut ConsoleSink,
) -> Result<RunSummary> {
    let summary = coordinator.run(worker, sink)?;
    info!(
        "Worker finished as {:?} with {} errors and {} objects",
        summary.state, summary.errors, summary.objects
    );
    Ok(summary)
}

/// First Ctrl-C requests a cooperative stop, the second exits immediately.
fn watch_interrupts(cancel: CancellationToken) {
    let spawned = thread::Builder::new()
        .name("interrupt-watcher".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!("Interrupt handling unavailable: {}", e);
                    return;
                }
            };
            runtime.block_on(async {
                loop {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!("Failed to listen for Ctrl-C: {}", e);
                        return;
                    }
                    if !cancel.cancel() {
                        std::process::exit(EXIT_CANCELLED.into());
                    }
                    eprintln!("Stopping after the current archive; press Ctrl-C again to quit now");
                }
            });
        });
    if let Err(e) = spawned {
        warn!("Could not start interrupt watcher: {}", e);
    }
}
