//! # Optimizer Module
//!
//! Pipeline di elaborazione separata in sottomoduli:
//! - `compression`: Workflow di compressione per singolo file
//! - `metadata`: Riallineamento dei metadata del catalogo
//! - `bulk`: Orchestratore sull'intero albero di storage
//! - `path_resolver`: Conversione identifier → path centralizzata

pub mod bulk;
pub mod compression;
pub mod metadata;
pub mod path_resolver;

pub use bulk::{BulkOptimizer, BulkReport, BulkStatus};
pub use compression::{CompressionOutcome, CompressionWorkflow};
pub use metadata::{MetadataOutcome, MetadataSync};
pub use path_resolver::PathResolver;
