//! # Ledger Module
//!
//! Questo modulo gestisce il ledger dei file già compressi per evitare rielaborazioni.
//!
//! ## Responsabilità:
//! - Traccia quali identifier sono già stati compressi e con quale larghezza
//! - Persiste il ledger in SQLite (tabella `ledger`)
//! - Fornisce il check di idempotenza usato dal workflow di compressione
//! - Permette di invalidare un'entry (soft-delete) per forzare la ricompressione
//!
//! ## Strutture dati:
//! - `LedgerEntry`: identifier, dimension (width usata), owner_ref
//! - `LedgerStore`: trait implementato dagli store (e dai fake nei test)
//! - `SqliteLedger`: implementazione su SQLite
//!
//! ## Strategia di persistence:
//! - Un database per root di storage (basato su hash del path)
//! - Salvataggio in `~/.tinify-optimizer/pipeline_<hash>.db`
//! - Unicità dell'identifier solo tra le righe non cancellate
//!
//! ## Schema:
//! ```sql
//! CREATE TABLE ledger (
//!     id          INTEGER PRIMARY KEY AUTOINCREMENT,
//!     identifier  TEXT NOT NULL,
//!     dimension   INTEGER NOT NULL,
//!     owner_ref   INTEGER NOT NULL DEFAULT 1,
//!     deleted     INTEGER NOT NULL DEFAULT 0,
//!     created_at  INTEGER NOT NULL
//! )
//! ```

use crate::error::StoreError;
use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

/// A file that has been compressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Storage-relative path
    pub identifier: String,
    /// Target width used for the compression
    pub dimension: u32,
    pub owner_ref: i64,
}

impl LedgerEntry {
    pub fn new(identifier: impl Into<String>, dimension: u32, owner_ref: i64) -> Self {
        Self {
            identifier: identifier.into(),
            dimension,
            owner_ref,
        }
    }
}

/// Persistence of processed identifiers
pub trait LedgerStore: Send + Sync {
    /// True when a non-deleted row exists for `identifier`
    fn has_active_entry(&self, identifier: &str) -> Result<bool, StoreError>;

    fn insert(&self, entry: &LedgerEntry) -> Result<(), StoreError>;

    /// Soft-delete the active rows of `identifier`, returning how many were flagged
    fn invalidate(&self, identifier: &str) -> Result<usize, StoreError>;

    /// Number of non-deleted rows
    fn active_count(&self) -> Result<usize, StoreError>;

    /// An identifier is eligible when it is non-empty and not ledgered yet
    fn is_eligible(&self, identifier: &str) -> Result<bool, StoreError> {
        if identifier.is_empty() {
            return Ok(false);
        }
        Ok(!self.has_active_entry(identifier)?)
    }
}

/// Default database for a storage root: `~/.tinify-optimizer/pipeline_<hash>.db`
pub fn default_database_path(storage_root: &Path) -> Result<PathBuf, StoreError> {
    let state_dir = dirs::home_dir()
        .ok_or_else(|| StoreError::Unavailable("Could not find home directory".to_string()))?
        .join(".tinify-optimizer");

    std::fs::create_dir_all(&state_dir)?;

    let mut hasher = Sha256::new();
    hasher.update(storage_root.to_string_lossy().as_bytes());
    let hash = hex::encode(hasher.finalize())[..16].to_string();

    Ok(state_dir.join(format!("pipeline_{}.db", hash)))
}

pub(crate) fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, StoreError> {
    conn.lock()
        .map_err(|_| StoreError::Unavailable("database connection lock poisoned".to_string()))
}

/// Ledger stored in a SQLite database
pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    /// Open (or create) the ledger in the database at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS ledger (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                identifier  TEXT NOT NULL,
                dimension   INTEGER NOT NULL,
                owner_ref   INTEGER NOT NULL DEFAULT 1,
                deleted     INTEGER NOT NULL DEFAULT 0,
                created_at  INTEGER NOT NULL
            )",
            [],
        )?;

        // Only one active row per identifier; invalidated rows are kept as history
        conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_ledger_active_identifier
             ON ledger(identifier) WHERE deleted = 0",
            [],
        )?;

        Ok(Self { conn: Mutex::new(conn) })
    }
}

impl LedgerStore for SqliteLedger {
    fn has_active_entry(&self, identifier: &str) -> Result<bool, StoreError> {
        let conn = lock(&self.conn)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM ledger WHERE identifier = ?1 AND deleted = 0",
            params![identifier],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn insert(&self, entry: &LedgerEntry) -> Result<(), StoreError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;

        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO ledger (identifier, dimension, owner_ref, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![entry.identifier, entry.dimension, entry.owner_ref, now],
        )?;
        Ok(())
    }

    fn invalidate(&self, identifier: &str) -> Result<usize, StoreError> {
        let conn = lock(&self.conn)?;
        let updated = conn.execute(
            "UPDATE ledger SET deleted = 1 WHERE identifier = ?1 AND deleted = 0",
            params![identifier],
        )?;
        Ok(updated)
    }

    fn active_count(&self) -> Result<usize, StoreError> {
        let conn = lock(&self.conn)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM ledger WHERE deleted = 0", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
