//! # Bulk Orchestrator
//!
//! Orchestratore delle operazioni su tutto l'albero di storage: scansione e poi
//! workflow per singolo file, in sequenza, senza interrompersi sui singoli errori.
//!
//! - `compress_all`: scan + `CompressionWorkflow` (credenziali validate all'avvio)
//! - `refresh_metadata`: scan + `MetadataSync` (fallisce solo se non trova file)

use crate::{
    error::OptimizeError,
    file_manager::FileManager,
    optimizer::{compression::CompressionWorkflow, metadata::MetadataSync},
    progress::{BulkStats, ProgressManager},
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, warn};

/// Coarse result of a bulk run, mapped to the process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkStatus {
    Success,
    Failure,
}

impl BulkStatus {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Success => ExitCode::SUCCESS,
            Self::Failure => ExitCode::FAILURE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkReport {
    pub status: BulkStatus,
    pub stats: BulkStats,
}

/// Runs a workflow over every eligible file of the storage root
pub struct BulkOptimizer {
    storage_root: PathBuf,
    show_progress: bool,
}

impl BulkOptimizer {
    pub fn new(storage_root: &Path) -> Self {
        Self {
            storage_root: storage_root.to_path_buf(),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// Compress every eligible file.
    ///
    /// Per-file failures are logged and counted; rejected credentials or an
    /// unreadable tree abort the run.
    pub async fn compress_all(&self, workflow: &CompressionWorkflow) -> Result<BulkReport, OptimizeError> {
        let start_time = Instant::now();
        let files = FileManager::scan(&self.storage_root)?;
        info!("Found {} images under {}", files.len(), self.storage_root.display());

        match workflow.connect().await {
            Ok(()) => {}
            Err(OptimizeError::Client(err)) => warn!("Compression service not reachable yet: {}", err),
            Err(fatal) => return Err(fatal),
        }

        let progress = ProgressManager::new(files.len() as u64, self.show_progress);
        let mut stats = BulkStats::new();

        for identifier in &files {
            match workflow.compress(&self.storage_root, identifier).await {
                Ok(outcome) => stats.add_compression(&outcome),
                Err(OptimizeError::Authentication(message)) => {
                    progress.finish("aborted");
                    return Err(OptimizeError::Authentication(message));
                }
                Err(err) => {
                    error!("Failed to process {}: {}", identifier, err);
                    stats.add_error();
                }
            }
            progress.update(identifier);
        }

        let summary = stats.format_compression_summary();
        progress.finish(&summary);
        info!("{} in {:.2}s", summary, start_time.elapsed().as_secs_f64());
        if let Some(count) = workflow.compression_count() {
            info!("Compressions used this month: {}", count);
        }

        Ok(BulkReport {
            status: BulkStatus::Success,
            stats,
        })
    }

    /// Refresh the catalog metadata of every eligible file.
    ///
    /// Reports `Failure` only when the tree holds no eligible file.
    pub async fn refresh_metadata(&self, sync: &MetadataSync) -> Result<BulkReport, OptimizeError> {
        let files = FileManager::scan(&self.storage_root)?;
        let mut stats = BulkStats::new();

        if files.is_empty() {
            warn!("No images found under {}", self.storage_root.display());
            return Ok(BulkReport {
                status: BulkStatus::Failure,
                stats,
            });
        }

        let progress = ProgressManager::new(files.len() as u64, self.show_progress);
        for identifier in &files {
            let outcome = sync.sync(&self.storage_root, identifier).await;
            stats.add_metadata(&outcome);
            progress.update(identifier);
        }

        let summary = stats.format_metadata_summary();
        progress.finish(&summary);
        info!("{}", summary);

        Ok(BulkReport {
            status: BulkStatus::Success,
            stats,
        })
    }
}
