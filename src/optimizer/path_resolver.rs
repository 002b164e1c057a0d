//! # Path Resolution Module
//!
//! Centralizza la conversione identifier → path su disco.
//! Gli identifier arrivano sia dallo scanner (`sub/a.jpg`) sia dall'hook di upload
//! (`/sub/a.jpg`): vengono normalizzati alla forma senza `/` iniziale.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Utility per risolvere gli identifier rispetto alla root di storage
pub struct PathResolver;

impl PathResolver {
    /// Strip the leading separators so both identifier styles share a ledger key
    pub fn normalize_identifier(identifier: &str) -> &str {
        identifier.trim_start_matches('/')
    }

    /// Resolve an identifier against the storage root.
    ///
    /// Identifiers climbing out of the root (`..`) are rejected.
    pub fn resolve(root: &Path, identifier: &str) -> io::Result<PathBuf> {
        let relative = Path::new(Self::normalize_identifier(identifier));

        if relative.as_os_str().is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "Empty identifier"));
        }

        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Identifier {} points outside the storage root", identifier),
            ));
        }

        Ok(root.join(relative))
    }
}
