//! Protected in-memory passwords.
//!
//! A [`ProtectedSecret`] keeps its UTF-16 code units masked with a per-instance
//! random key, so the plain text never sits in memory until [`unwrap_secret`]
//! materialises it. Every buffer involved is zeroed when dropped.

use std::fmt;

use rand::Rng;
use zeroize::Zeroizing;

use crate::error::{ArchiveError, Result};

pub struct ProtectedSecret {
    masked: Zeroizing<Vec<u16>>,
    mask: Zeroizing<Vec<u16>>,
}

impl ProtectedSecret {
    /// Protects a plain password. The caller should zero its own copy afterwards.
    pub fn new(plain: &str) -> Self {
        let units: Zeroizing<Vec<u16>> = Zeroizing::new(plain.encode_utf16().collect());
        Self::from_utf16_units(&units)
    }

    /// Protects raw UTF-16 code units as received from a platform prompt.
    pub fn from_utf16_units(units: &[u16]) -> Self {
        let mut rng = rand::thread_rng();
        let mask: Zeroizing<Vec<u16>> = Zeroizing::new((0..units.len()).map(|_| rng.gen()).collect());
        let masked = units.iter().zip(mask.iter()).map(|(u, m)| u ^ m).collect();

        Self {
            masked: Zeroizing::new(masked),
            mask,
        }
    }

    pub fn len(&self) -> usize {
        self.masked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masked.is_empty()
    }
}

impl fmt::Debug for ProtectedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtectedSecret")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// Converts a protected secret into its plain-text form.
///
/// The transient unmasked buffer is scrubbed on every path, including when the
/// code units do not form valid UTF-16.
pub fn unwrap_secret(secret: &ProtectedSecret) -> Result<Zeroizing<String>> {
    let plain_units: Zeroizing<Vec<u16>> = Zeroizing::new(
        secret
            .masked
            .iter()
            .zip(secret.mask.iter())
            .map(|(u, m)| u ^ m)
            .collect(),
    );

    String::from_utf16(&plain_units)
        .map(Zeroizing::new)
        .map_err(|e| ArchiveError::SecretDecode(e.to_string()))
}
