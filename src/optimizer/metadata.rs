//! # Metadata Sync Module
//!
//! Riallinea i record del catalogo con lo stato reale dei file su disco.
//!
//! ## Flusso per singolo file:
//! 1. Cerca il record nel catalogo (match per sottostringa, vince il primo)
//! 2. Legge dimensione in byte e dimensioni in pixel del file
//! 3. Aggiorna la size del record se disponibile e non zero
//! 4. Aggiorna width/height dei metadata se entrambi disponibili
//!
//! Gli errori dello store (`StoreError`) vengono assorbiti senza log:
//! l'arricchimento dei metadata non deve mai interrompere un'operazione bulk.

use crate::{
    catalog::CatalogStore,
    error::{OptimizeError, StoreError},
    file_manager::FileManager,
    optimizer::{bulk::{BulkOptimizer, BulkReport}, path_resolver::PathResolver},
};
use std::path::Path;

/// Result of a metadata refresh for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataOutcome {
    /// No usable catalog record matches the identifier
    NoRecord,
    /// The record exists but neither size nor dimensions could be read
    Unchanged,
    /// Values written back to the catalog; `None` means the field was left untouched
    Updated {
        size: Option<u64>,
        dimensions: Option<(u32, u32)>,
    },
    /// The catalog raised an error; the refresh was abandoned
    StoreUnavailable,
}

/// Refreshes catalog size/width/height from the files on disk
pub struct MetadataSync {
    catalog: Box<dyn CatalogStore>,
}

impl MetadataSync {
    pub fn new(catalog: Box<dyn CatalogStore>) -> Self {
        Self { catalog }
    }

    /// Refresh the catalog entry of one file. Never fails.
    pub async fn sync(&self, root: &Path, identifier: &str) -> MetadataOutcome {
        match self.try_sync(root, identifier).await {
            Ok(outcome) => outcome,
            Err(_) => MetadataOutcome::StoreUnavailable,
        }
    }

    /// Refresh every eligible file under `root`
    pub async fn bulk_refresh(&self, root: &Path) -> Result<BulkReport, OptimizeError> {
        BulkOptimizer::new(root).refresh_metadata(self).await
    }

    async fn try_sync(&self, root: &Path, identifier: &str) -> Result<MetadataOutcome, StoreError> {
        let identifier = PathResolver::normalize_identifier(identifier);

        let record = match self.catalog.find_records_by_identifier(identifier)?.into_iter().next() {
            Some(record) if record.id > 0 => record,
            _ => return Ok(MetadataOutcome::NoRecord),
        };

        let (size, dimensions) = match PathResolver::resolve(root, identifier) {
            Ok(path) => (
                FileManager::get_file_size(&path).await.ok().filter(|size| *size > 0),
                FileManager::get_image_dimensions(&path).await,
            ),
            Err(_) => (None, None),
        };

        if let Some(size) = size {
            self.catalog.update_record_size(record.id, size)?;
        }

        let metadata = self.catalog.find_metadata_by_file_id(record.id)?.into_iter().next();
        let dimensions = match (metadata, dimensions) {
            (Some(metadata), Some((width, height))) if metadata.id > 0 => {
                self.catalog.update_metadata_dimensions(metadata.id, width, height)?;
                Some((width, height))
            }
            _ => None,
        };

        if size.is_none() && dimensions.is_none() {
            return Ok(MetadataOutcome::Unchanged);
        }
        Ok(MetadataOutcome::Updated { size, dimensions })
    }
}
