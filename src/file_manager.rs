//! # File Management Module
//!
//! Questo modulo gestisce le operazioni sui file e la discovery delle immagini.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva delle immagini sotto la root di storage
//! - Esclusione di file/directory nascosti e delle directory riservate
//! - Lettura di dimensione su disco e dimensioni in pixel
//! - Sovrascrittura atomica di un file con i byte compressi
//! - Formattazione human-readable delle dimensioni
//!
//! ## Regole di scansione:
//! - Nomi che iniziano con `.` vengono saltati insieme al loro sottoalbero
//! - I link simbolici vengono seguiti (un loop interrompe la scansione)
//! - `_processed_` e `_temp_` vengono saltate a qualsiasi profondità
//! - Sono inclusi solo file con estensione `jpg`, `jpeg`, `png` (case-sensitive)
//! - I path restituiti sono relativi alla root e separati da `/`
//!
//! ## Esempio:
//! ```ignore
//! let files = FileManager::scan(Path::new("/var/www/fileadmin"))?;
//! for identifier in files {
//!     // "sub/photo.jpg"
//! }
//! ```

use std::ffi::OsStr;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tokio::fs;
use walkdir::{DirEntry, WalkDir};

/// Directory holding processed variants, never scanned
pub const PROCESSED_DIR: &str = "_processed_";
/// Directory holding temporary files, never scanned
pub const TEMP_DIR: &str = "_temp_";
/// Extensions accepted by the scanner and the upload hook
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Recursively list the eligible images under `root`.
    ///
    /// Symlinked directories are entered. Any unreadable directory or link
    /// loop aborts the whole scan.
    pub fn scan(root: &Path) -> Result<Vec<String>, walkdir::Error> {
        let mut files = Vec::new();

        let walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !Self::is_excluded(entry.file_name()));

        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_dir() {
                continue;
            }
            if Self::is_supported_image(entry.path()) {
                if let Some(identifier) = Self::relative_identifier(root, &entry) {
                    files.push(identifier);
                }
            }
        }

        Ok(files)
    }

    /// Hidden entries and the reserved directories are pruned with their subtree
    fn is_excluded(name: &OsStr) -> bool {
        let name = name.to_string_lossy();
        name.starts_with('.') || name == PROCESSED_DIR || name == TEMP_DIR
    }

    fn relative_identifier(root: &Path, entry: &DirEntry) -> Option<String> {
        let relative = entry.path().strip_prefix(root).ok()?;
        let segments: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(segments.join("/"))
    }

    /// Check if a path carries one of the supported image extensions (case-sensitive)
    pub fn is_supported_image(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::is_supported_extension)
            .unwrap_or(false)
    }

    pub fn is_supported_extension(extension: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&extension)
    }

    /// Size in bytes of a file on disk
    pub async fn get_file_size(path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path).await?.len())
    }

    /// Pixel dimensions of an image, `None` when it cannot be decoded
    pub async fn get_image_dimensions(path: &Path) -> Option<(u32, u32)> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || image::image_dimensions(&path).ok())
            .await
            .ok()
            .flatten()
    }

    /// Atomically replace `target` with `bytes`.
    ///
    /// The bytes go to a hidden temp file in the same directory which is then
    /// renamed over the target, so readers never see a half-written image.
    /// The original permissions are carried over. A symlinked target is
    /// resolved first, so the link keeps pointing at the rewritten file.
    pub async fn replace_with_bytes(target: &Path, bytes: Vec<u8>) -> io::Result<()> {
        let target = target.to_path_buf();
        tokio::task::spawn_blocking(move || -> io::Result<()> {
            let target = std::fs::canonicalize(&target)?;
            let dir = target.parent().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, format!("No parent directory for {}", target.display()))
            })?;
            let permissions = std::fs::metadata(&target)?.permissions();

            let mut temp = NamedTempFile::new_in(dir)?;
            temp.write_all(&bytes)?;
            temp.as_file().sync_all()?;
            temp.as_file().set_permissions(permissions)?;
            temp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Calculate percentage reduction
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}
