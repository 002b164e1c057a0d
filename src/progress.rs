//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il progress tracking e le statistiche delle operazioni bulk.
//!
//! ## Responsabilità:
//! - Progress bar visual con `indicatif` per feedback real-time
//! - Tracking statistiche (compressi, esclusi, già processati, metadata aggiornati o invariati, errori)
//! - Calcolo percentuali di riduzione e byte risparmiati
//! - Report finale con statistiche aggregate
//!
//! ## Componenti principali:
//! - `ProgressManager`: Gestisce la progress bar principale (nascosta se disabilitata)
//! - `BulkStats`: Traccia statistiche cumulative
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:02:15] [=======================>----------------] 150/260 (57%) sub/photo.jpg
//! ```

use crate::file_manager::FileManager;
use crate::optimizer::{compression::CompressionOutcome, metadata::MetadataOutcome};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Manages progress reporting for bulk runs
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager; a hidden one draws nothing
    pub fn new(total_files: u64, visible: bool) -> Self {
        if !visible {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }

        let bar = ProgressBar::new(total_files);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Statistics tracker for bulk runs
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BulkStats {
    pub files_processed: usize,
    pub files_compressed: usize,
    pub files_ignored: usize,
    pub files_not_eligible: usize,
    pub files_metadata_updated: usize,
    pub files_without_record: usize,
    pub files_metadata_unchanged: usize,
    pub total_bytes_saved: u64,
    pub total_original_size: u64,
    pub errors: usize,
}

impl BulkStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_compression(&mut self, outcome: &CompressionOutcome) {
        self.files_processed += 1;
        match outcome {
            CompressionOutcome::Compressed { original_size, compressed_size } => {
                self.files_compressed += 1;
                self.total_original_size += original_size;
                self.total_bytes_saved += original_size.saturating_sub(*compressed_size);
            }
            CompressionOutcome::IgnoredFolder => self.files_ignored += 1,
            CompressionOutcome::NotEligible => self.files_not_eligible += 1,
            CompressionOutcome::Failed(_) => self.errors += 1,
        }
    }

    pub fn add_metadata(&mut self, outcome: &MetadataOutcome) {
        self.files_processed += 1;
        match outcome {
            MetadataOutcome::Updated { .. } => self.files_metadata_updated += 1,
            MetadataOutcome::NoRecord => self.files_without_record += 1,
            MetadataOutcome::Unchanged => self.files_metadata_unchanged += 1,
            MetadataOutcome::StoreUnavailable => self.errors += 1,
        }
    }

    pub fn add_error(&mut self) {
        self.files_processed += 1;
        self.errors += 1;
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        if self.total_original_size > 0 {
            (self.total_bytes_saved as f64 / self.total_original_size as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn format_compression_summary(&self) -> String {
        format!(
            "Processed: {} files | Compressed: {} | Ignored: {} | Already compressed: {} | Errors: {} | Total saved: {} ({:.2}%)",
            self.files_processed,
            self.files_compressed,
            self.files_ignored,
            self.files_not_eligible,
            self.errors,
            FileManager::format_size(self.total_bytes_saved),
            self.overall_reduction_percent()
        )
    }

    pub fn format_metadata_summary(&self) -> String {
        format!(
            "Processed: {} files | Updated: {} | Unchanged: {} | Not in catalog: {} | Errors: {}",
            self.files_processed,
            self.files_metadata_updated,
            self.files_metadata_unchanged,
            self.files_without_record,
            self.errors
        )
    }
}
