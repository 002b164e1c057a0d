//! # Upload Hook Module
//!
//! Adattatore per l'evento "comando su file completato" del sistema ospite.
//!
//! ## Responsabilità:
//! - Filtra gli eventi: solo comandi `upload` con un file come primo risultato
//! - Accetta solo estensioni `jpg`, `jpeg`, `png`
//! - Invoca il workflow di compressione per esattamente quel file
//! - Logga gli errori senza mai propagarli al chiamante
//!
//! ## Esempio evento:
//! ```json
//! {
//!   "commands": ["upload"],
//!   "result": [{ "type": "file", "identifier": "/user_upload/photo.jpg" }]
//! }
//! ```

use crate::{
    file_manager::FileManager,
    optimizer::compression::{CompressionOutcome, CompressionWorkflow},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

const UPLOAD_COMMAND: &str = "upload";

/// Object produced by a file command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandResult {
    File {
        identifier: String,
        /// Extension as recorded by the host; derived from the identifier when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extension: Option<String>,
    },
    Folder {
        identifier: String,
    },
    #[serde(other)]
    Other,
}

impl CommandResult {
    pub fn file(identifier: impl Into<String>) -> Self {
        Self::File {
            identifier: identifier.into(),
            extension: None,
        }
    }
}

/// Notification sent once a file command has been processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCommandEvent {
    /// Command kinds carried by the request (`upload`, `move`, ...)
    pub commands: Vec<String>,
    pub result: Vec<CommandResult>,
}

impl FileCommandEvent {
    pub fn upload(identifier: impl Into<String>) -> Self {
        Self {
            commands: vec![UPLOAD_COMMAND.to_string()],
            result: vec![CommandResult::file(identifier)],
        }
    }

    /// Identifier of the uploaded image this event refers to, if any
    pub fn uploaded_image(&self) -> Option<&str> {
        if !self.commands.iter().any(|command| command == UPLOAD_COMMAND) {
            return None;
        }

        match self.result.first()? {
            CommandResult::File { identifier, extension } => {
                let extension = extension
                    .clone()
                    .or_else(|| {
                        Path::new(identifier)
                            .extension()
                            .map(|ext| ext.to_string_lossy().into_owned())
                    })?
                    .to_lowercase();
                FileManager::is_supported_extension(&extension).then_some(identifier.as_str())
            }
            _ => None,
        }
    }
}

/// Compresses images right after they are uploaded
pub struct UploadHook<'a> {
    workflow: &'a CompressionWorkflow,
    storage_root: PathBuf,
}

impl<'a> UploadHook<'a> {
    pub fn new(workflow: &'a CompressionWorkflow, storage_root: &Path) -> Self {
        Self {
            workflow,
            storage_root: storage_root.to_path_buf(),
        }
    }

    /// Handle an event; returns `None` when the event is not an image upload or the workflow failed
    pub async fn handle(&self, event: &FileCommandEvent) -> Option<CompressionOutcome> {
        let Some(identifier) = event.uploaded_image() else {
            debug!("Ignoring file command {:?}", event.commands);
            return None;
        };

        match self.workflow.compress(&self.storage_root, identifier).await {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                error!("Upload compression failed for {}: {}", identifier, err);
                None
            }
        }
    }
}
