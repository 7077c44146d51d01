use std::path::{Path, PathBuf};

use serde::Serialize;
use zeroize::Zeroizing;

use crate::error::{ArchiveError, Result};
use crate::secret::{unwrap_secret, ProtectedSecret};
use crate::utils::resolve_path;

/// Where the caller's password comes from. At most one source is active.
#[derive(Debug, Default)]
pub enum PasswordSource {
    #[default]
    None,
    Plain(String),
    Protected(ProtectedSecret),
}

impl PasswordSource {
    /// Validates the caller-supplied password parameters before any worker exists.
    pub fn from_parts(plain: Option<String>, protected: Option<ProtectedSecret>) -> Result<Self> {
        Self::ensure_exclusive(plain.is_some(), protected.is_some())?;
        match (plain, protected) {
            (Some(plain), _) => Ok(PasswordSource::Plain(plain)),
            (None, Some(secret)) => Ok(PasswordSource::Protected(secret)),
            (None, None) => Ok(PasswordSource::None),
        }
    }

    /// Rejects a plain and a protected password given together. Front-ends call this
    /// before asking the user for a secret.
    pub fn ensure_exclusive(plain: bool, protected: bool) -> Result<()> {
        if plain && protected {
            return Err(ArchiveError::Configuration(
                "a plain password and a protected password cannot be used together".into(),
            ));
        }
        Ok(())
    }

    /// Materialises the plain password, unwrapping a protected secret if needed.
    pub fn resolve(self) -> Result<Password> {
        let mut password = Password::default();
        match self {
            PasswordSource::None => {}
            PasswordSource::Plain(plain) => password.set(Zeroizing::new(plain)),
            PasswordSource::Protected(secret) => password.set(unwrap_secret(&secret)?),
        }
        Ok(password)
    }
}

#[derive(Default, Clone)]
pub struct Password(pub Option<Zeroizing<String>>);

impl Password {
    pub fn set(&mut self, value: Zeroizing<String>) {
        self.0 = if value.is_empty() { None } else { Some(value) };
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref().map(String::as_str)
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(if self.0.is_some() { "Password(****)" } else { "Password(None)" })
    }
}

/// A resolved archive location plus the password used to open it.
#[derive(Debug, Clone)]
pub struct ArchiveIdentity {
    path: PathBuf,
    password: Password,
}

impl ArchiveIdentity {
    pub fn resolve(base: &Path, archive: &Path, password: Password) -> Self {
        Self {
            path: resolve_path(base, archive),
            password,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_str()
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArchiveFormat {
    Zip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    pub index: usize,
    pub file_name: String,
    pub is_directory: bool,
    pub size: u64,
    pub packed_size: u64,
    pub crc32: u32,
    pub method: String,
    pub encrypted: bool,
    pub unix_mode: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveInformation {
    pub file_name: String,
    pub full_path: PathBuf,
    pub packed_size: u64,
    pub unpacked_size: u64,
    pub files_count: usize,
    pub files: Vec<String>,
    pub file_data: Vec<ArchiveEntry>,
    pub format: ArchiveFormat,
    pub method: Option<String>,
}
