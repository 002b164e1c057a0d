//! # Catalog Module
//!
//! Accesso al catalogo dei file (record canonici e relativi metadata).
//!
//! ## Responsabilità:
//! - Lookup dei record per identifier (match per sottostringa, come `LIKE %x%`)
//! - Lookup dei metadata (width/height) tramite l'id del record
//! - Aggiornamento dei soli campi size, width, height
//!
//! Il catalogo appartiene al sistema ospite: la pipeline non crea né cancella record.
//! `SqliteCatalog` crea le tabelle solo se mancano, per l'uso stand-alone.

use crate::error::StoreError;
use crate::state::lock;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;

/// Canonical file record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRecord {
    pub id: i64,
    pub identifier: String,
    pub size: u64,
}

/// Width/height metadata attached to a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogMetadata {
    pub id: i64,
    pub file_id: i64,
    pub width: u32,
    pub height: u32,
}

/// File catalog owned by the host system
pub trait CatalogStore: Send + Sync {
    /// Records whose identifier contains `fragment`
    fn find_records_by_identifier(&self, fragment: &str) -> Result<Vec<CatalogRecord>, StoreError>;

    fn find_metadata_by_file_id(&self, file_id: i64) -> Result<Vec<CatalogMetadata>, StoreError>;

    fn update_record_size(&self, id: i64, size: u64) -> Result<(), StoreError>;

    fn update_metadata_dimensions(&self, id: i64, width: u32, height: u32) -> Result<(), StoreError>;
}

/// Escape the LIKE wildcards so the fragment is matched literally
fn like_pattern(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len() + 2);
    escaped.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<CatalogRecord> {
    Ok(CatalogRecord {
        id: row.get(0)?,
        identifier: row.get(1)?,
        size: row.get::<_, i64>(2)?.max(0) as u64,
    })
}

fn metadata_from_row(row: &Row<'_>) -> rusqlite::Result<CatalogMetadata> {
    Ok(CatalogMetadata {
        id: row.get(0)?,
        file_id: row.get(1)?,
        width: row.get::<_, i64>(2)?.max(0) as u32,
        height: row.get::<_, i64>(3)?.max(0) as u32,
    })
}

/// Catalog stored in SQLite (`catalog_files` and `catalog_metadata`)
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
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
            "CREATE TABLE IF NOT EXISTS catalog_files (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                identifier  TEXT NOT NULL,
                size        INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS catalog_metadata (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                file_id     INTEGER NOT NULL,
                width       INTEGER NOT NULL DEFAULT 0,
                height      INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY(file_id) REFERENCES catalog_files(id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_catalog_metadata_file_id ON catalog_metadata(file_id)",
            [],
        )?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Register a file record, returning its id
    pub fn insert_record(&self, identifier: &str, size: u64) -> Result<i64, StoreError> {
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO catalog_files (identifier, size) VALUES (?1, ?2)",
            params![identifier, size as i64],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Attach a metadata row to a file record, returning its id
    pub fn insert_metadata(&self, file_id: i64, width: u32, height: u32) -> Result<i64, StoreError> {
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO catalog_metadata (file_id, width, height) VALUES (?1, ?2, ?3)",
            params![file_id, width, height],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

impl CatalogStore for SqliteCatalog {
    fn find_records_by_identifier(&self, fragment: &str) -> Result<Vec<CatalogRecord>, StoreError> {
        if fragment.is_empty() {
            return Ok(Vec::new());
        }

        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, identifier, size FROM catalog_files
             WHERE identifier LIKE ?1 ESCAPE '\\'
             ORDER BY id",
        )?;
        let records = stmt
            .query_map(params![like_pattern(fragment)], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn find_metadata_by_file_id(&self, file_id: i64) -> Result<Vec<CatalogMetadata>, StoreError> {
        if file_id <= 0 {
            return Ok(Vec::new());
        }

        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, file_id, width, height FROM catalog_metadata WHERE file_id = ?1 ORDER BY id",
        )?;
        let metadata = stmt
            .query_map(params![file_id], metadata_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(metadata)
    }

    fn update_record_size(&self, id: i64, size: u64) -> Result<(), StoreError> {
        let conn = lock(&self.conn)?;
        conn.execute("UPDATE catalog_files SET size = ?1 WHERE id = ?2", params![size as i64, id])?;
        Ok(())
    }

    fn update_metadata_dimensions(&self, id: i64, width: u32, height: u32) -> Result<(), StoreError> {
        let conn = lock(&self.conn)?;
        conn.execute(
            "UPDATE catalog_metadata SET width = ?1, height = ?2 WHERE id = ?3",
            params![width, height, id],
        )?;
        Ok(())
    }
}
