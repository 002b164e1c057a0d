//! # Compression Workflow Module
//!
//! Worker per la compressione di un singolo file.
//!
//! ## Flusso:
//! 1. Validazione delle credenziali una sola volta per istanza (`OnceCell`)
//! 2. Esclusione per nome cartella (match per sottostringa sull'identifier così come ricevuto)
//! 3. Check di idempotenza sul ledger
//! 4. Upload, resize "scale" alla width configurata, sovrascrittura atomica
//! 5. Inserimento nel ledger e refresh dei metadata del catalogo
//!
//! Errori remoti e di I/O vengono loggati e il file viene saltato.
//! Errori del ledger e credenziali rifiutate vengono propagati al chiamante.

use crate::{
    config::Config,
    error::{ClientError, OptimizeError},
    file_manager::FileManager,
    optimizer::{metadata::MetadataSync, path_resolver::PathResolver},
    state::{LedgerEntry, LedgerStore},
    tinify::{CompressionClient, ResizeOptions},
};
use std::path::Path;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

/// What happened to a file handed to the workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressionOutcome {
    Compressed { original_size: u64, compressed_size: u64 },
    /// The identifier contains one of the ignored folder names
    IgnoredFolder,
    /// Empty identifier or already present in the ledger
    NotEligible,
    /// Remote or filesystem failure, already logged
    Failed(String),
}

/// Compresses single files through the remote service
pub struct CompressionWorkflow {
    config: Config,
    ledger: Box<dyn LedgerStore>,
    client: Box<dyn CompressionClient>,
    metadata: MetadataSync,
    validated: OnceCell<()>,
}

impl CompressionWorkflow {
    /// Build the workflow. Fails when no API key is configured.
    pub fn new(
        config: Config,
        ledger: Box<dyn LedgerStore>,
        client: Box<dyn CompressionClient>,
        metadata: MetadataSync,
    ) -> Result<Self, OptimizeError> {
        if !config.has_api_key() {
            return Err(OptimizeError::Config("Tinify API key is not set".to_string()));
        }

        Ok(Self {
            config,
            ledger,
            client,
            metadata,
            validated: OnceCell::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ledger(&self) -> &dyn LedgerStore {
        self.ledger.as_ref()
    }

    pub fn compression_count(&self) -> Option<u64> {
        self.client.compression_count()
    }

    /// Validate the credentials once for this instance.
    ///
    /// Rejected credentials map to `OptimizeError::Authentication`. Other
    /// failures leave the instance unvalidated so the next call retries.
    pub async fn connect(&self) -> Result<(), OptimizeError> {
        self.validated
            .get_or_try_init(|| async {
                self.client.validate().await.map_err(|err| match err {
                    ClientError::Account { .. } => OptimizeError::Authentication(err.to_string()),
                    other => OptimizeError::Client(other),
                })?;
                info!("Compression service credentials accepted");
                Ok::<(), OptimizeError>(())
            })
            .await?;
        Ok(())
    }

    /// Substring match against the configured folder names
    pub fn is_ignored(&self, identifier: &str) -> bool {
        self.config.is_ignored(identifier)
    }

    /// Compress the file `root/identifier` unless it is excluded or already ledgered
    pub async fn compress(&self, root: &Path, identifier: &str) -> Result<CompressionOutcome, OptimizeError> {
        match self.connect().await {
            Ok(()) => {}
            Err(OptimizeError::Client(err)) => {
                error!("Could not reach compression service for {}: {}", identifier, err);
                return Ok(CompressionOutcome::Failed(err.to_string()));
            }
            Err(fatal) => return Err(fatal),
        }

        // Folder names are matched against the identifier as received
        if self.is_ignored(identifier) {
            debug!("Skipping {} (ignored folder)", identifier);
            return Ok(CompressionOutcome::IgnoredFolder);
        }

        let identifier = PathResolver::normalize_identifier(identifier);

        if !self.ledger.is_eligible(identifier)? {
            debug!("Skipping {} (already compressed)", identifier);
            return Ok(CompressionOutcome::NotEligible);
        }

        match self.compress_file(root, identifier).await {
            Ok(outcome) => Ok(outcome),
            Err(OptimizeError::Store(err)) => Err(OptimizeError::Store(err)),
            Err(err) => {
                error!("Compression failed for {}: {}", identifier, err);
                Ok(CompressionOutcome::Failed(err.to_string()))
            }
        }
    }

    async fn compress_file(&self, root: &Path, identifier: &str) -> Result<CompressionOutcome, OptimizeError> {
        let path = PathResolver::resolve(root, identifier)?;
        let original = tokio::fs::read(&path).await?;
        let original_size = original.len() as u64;

        let source = self.client.upload(original).await?;
        if let (Some(input), Some(output)) = (source.input_size, source.output_size) {
            debug!(
                "Service compressed {}: {} -> {} before resize",
                identifier,
                FileManager::format_size(input),
                FileManager::format_size(output)
            );
        }
        let resized = self
            .client
            .resize(&source, &ResizeOptions::scale_to_width(self.config.width))
            .await?;
        let compressed_size = resized.len() as u64;

        FileManager::replace_with_bytes(&path, resized).await?;

        self.ledger.insert(&LedgerEntry::new(
            identifier,
            self.config.width,
            self.config.owner_ref,
        ))?;

        self.metadata.sync(root, identifier).await;

        info!(
            "✅ {}: {} -> {} ({:.1}% saved)",
            identifier,
            FileManager::format_size(original_size),
            FileManager::format_size(compressed_size),
            FileManager::calculate_reduction(original_size, compressed_size)
        );

        Ok(CompressionOutcome::Compressed {
            original_size,
            compressed_size,
        })
    }
}
