//! # Tinify Optimizer Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare della pipeline
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per l'hook di upload
//!
//! ## Architettura dei moduli:
//! - `config`: Impostazioni per namespace e validazione
//! - `error`: Tipi di errore custom (pipeline, store, client remoto)
//! - `state`: Ledger dei file già compressi
//! - `catalog`: Catalogo dei file e relativi metadata
//! - `tinify`: Client del servizio di compressione
//! - `file_manager`: Scansione della storage e operazioni sui file
//! - `optimizer`: Workflow di compressione, metadata sync e orchestratore bulk
//! - `upload`: Hook per i file appena caricati
//! - `progress`: Progress tracking e statistiche
//!
//! ## Utilizzo:
//! ```ignore
//! use tinify_optimizer::{BulkOptimizer, CompressionWorkflow, MetadataSync};
//!
//! let workflow = CompressionWorkflow::new(config, ledger, client, MetadataSync::new(catalog))?;
//! let report = BulkOptimizer::new(&root).compress_all(&workflow).await?;
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod optimizer;
pub mod progress;
pub mod state;
pub mod tinify;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{CatalogStore, SqliteCatalog};
pub use config::{Config, JsonSettingsProvider, SettingsProvider};
pub use error::{ClientError, OptimizeError, StoreError};
pub use file_manager::FileManager;
pub use optimizer::{
    BulkOptimizer, BulkReport, BulkStatus, CompressionOutcome, CompressionWorkflow, MetadataOutcome, MetadataSync,
};
pub use state::{LedgerEntry, LedgerStore, SqliteLedger};
pub use tinify::{CompressionClient, TinifyClient};
pub use upload::{FileCommandEvent, UploadHook};
