use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::error::Result;
use crate::models::PasswordSource;
use crate::secret::ProtectedSecret;

pub const PASSWORD_ENV: &str = "ZIP_RUNNER_PASSWORD";

#[derive(Parser, Debug)]
#[command(author, version, about = "Extract, list and inspect zip archives with live progress", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Extract an archive into a target directory.
    #[command(alias = "x")]
    Extract {
        /// The archive to extract.
        archive: PathBuf,

        /// The directory the archive is expanded into.
        target: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// List the entries of one or more archives.
    #[command(alias = "l")]
    List {
        #[arg(required = true)]
        archives: Vec<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Verify one or more archives and print their summary.
    #[command(alias = "i")]
    Info {
        #[arg(required = true)]
        archives: Vec<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },
}

impl Commands {
    pub fn common(&self) -> &CommonArgs {
        match self {
            Commands::Extract { common, .. }
            | Commands::List { common, .. }
            | Commands::Info { common, .. } => common,
        }
    }
}

#[derive(ClapArgs, Clone, Debug, Default)]
pub struct CommonArgs {
    /// Password for encrypted archives. Falls back to ZIP_RUNNER_PASSWORD.
    #[arg(long)]
    pub password: Option<String>,

    /// Prompt for the password without echoing it.
    #[arg(long)]
    pub secure_password: bool,

    /// Print progress messages for each archive and file.
    #[arg(short, long)]
    pub verbose: bool,

    /// Print result objects as JSON lines.
    #[arg(long)]
    pub json: bool,

    /// Threads used to verify archive entries.
    #[arg(long)]
    pub threads: Option<usize>,

    /// Read buffer size in bytes.
    #[arg(long)]
    pub buffer_size: Option<usize>,
}

impl CommonArgs {
    /// Builds the password source from the flags. Conflicting flags are rejected
    /// here, before any worker exists.
    pub fn password_source(
        &self,
        env_password: Option<String>,
        prompt: impl FnOnce() -> std::io::Result<String>,
    ) -> Result<PasswordSource> {
        PasswordSource::ensure_exclusive(self.password.is_some(), self.secure_password)?;
        let protected = if self.secure_password {
            Some(ProtectedSecret::new(&zeroize::Zeroizing::new(prompt()?)))
        } else {
            None
        };
        let plain = match (&self.password, &protected) {
            (Some(password), _) => Some(password.clone()),
            (None, None) => env_password,
            (None, Some(_)) => None,
        };
        PasswordSource::from_parts(plain, protected)
    }
}

pub fn parse() -> Args {
    Args::parse()
}
