use std::thread;

use crate::error::{ArchiveError, Result};

pub const BUFFER_SIZE_ENV: &str = "ZIP_RUNNER_BUFFER_SIZE";
pub const VERIFY_THREADS_ENV: &str = "ZIP_RUNNER_VERIFY_THREADS";

const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024; // 1MB buffer

/// Archive engine settings, resolved once at startup and handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub buffer_size: usize,
    pub verify_threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            verify_threads: thread::available_parallelism().map(|p| p.get()).unwrap_or(1),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(value) = lookup(BUFFER_SIZE_ENV) {
            config.buffer_size = parse_positive(BUFFER_SIZE_ENV, &value)?;
        }
        if let Some(value) = lookup(VERIFY_THREADS_ENV) {
            config.verify_threads = parse_positive(VERIFY_THREADS_ENV, &value)?;
        }
        Ok(config)
    }

    pub fn with_overrides(mut self, buffer_size: Option<usize>, verify_threads: Option<usize>) -> Result<Self> {
        if let Some(size) = buffer_size {
            config_guard("buffer size", size)?;
            self.buffer_size = size;
        }
        if let Some(threads) = verify_threads {
            config_guard("thread count", threads)?;
            self.verify_threads = threads;
        }
        Ok(self)
    }
}

fn parse_positive(key: &str, value: &str) -> Result<usize> {
    let parsed = value
        .trim()
        .parse::<usize>()
        .map_err(|e| ArchiveError::Configuration(format!("{key}={value:?}: {e}")))?;
    config_guard(key, parsed)?;
    Ok(parsed)
}

fn config_guard(what: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(ArchiveError::Configuration(format!("{what} must be greater than zero")));
    }
    Ok(())
}
