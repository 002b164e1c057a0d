//! # Configuration Management Module
//!
//! Questo modulo gestisce la configurazione della pipeline di compressione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con i parametri del workflow
//! - Fornisce valori di default sensati (width 2560, owner_ref 1)
//! - Carica le impostazioni da un file JSON suddiviso per namespace
//! - Valida i parametri prima dell'uso
//!
//! ## Parametri di configurazione:
//! - `api_key`: chiave Tinify (obbligatoria per la compressione, mai stampata)
//! - `width`: larghezza target del resize "scale" (default: 2560)
//! - `owner_ref`: id di raggruppamento salvato nel ledger (default: 1)
//! - `ignored_folder_names`: lista separata da virgole di nomi da escludere
//! - `request_timeout_secs`: timeout delle chiamate remote (default: 120)
//!
//! ## Esempio file impostazioni:
//! ```json
//! {
//!   "tinify_optimizer": {
//!     "api_key": "xxxx",
//!     "width": 1920,
//!     "ignored_folder_names": "vault, private"
//!   }
//! }
//! ```

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Namespace used when none is given on the command line
pub const DEFAULT_NAMESPACE: &str = "tinify_optimizer";
pub const DEFAULT_WIDTH: u32 = 2560;
pub const DEFAULT_OWNER_REF: i64 = 1;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Settings for the compression and metadata workflows
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Tinify API key
    pub api_key: String,
    /// Target width for the "scale" resize
    pub width: u32,
    /// Grouping id stored with every ledger entry
    pub owner_ref: i64,
    /// Comma-separated names; identifiers containing one of them are skipped
    pub ignored_folder_names: String,
    /// Upper bound for a single request to the compression service
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            width: DEFAULT_WIDTH,
            owner_ref: DEFAULT_OWNER_REF,
            ignored_folder_names: String::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("width", &self.width)
            .field("owner_ref", &self.owner_ref)
            .field("ignored_folder_names", &self.ignored_folder_names)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 {
            return Err(anyhow::anyhow!("Width must be greater than 0"));
        }

        if self.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Request timeout must be greater than 0"));
        }

        Ok(())
    }

    /// Whether an API key has been provided
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Trimmed, non-empty entries of `ignored_folder_names`
    pub fn ignored_folders(&self) -> Vec<&str> {
        self.ignored_folder_names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect()
    }

    /// True when `identifier` contains one of the ignored folder names
    pub fn is_ignored(&self, identifier: &str) -> bool {
        self.ignored_folders().iter().any(|name| identifier.contains(name))
    }

    /// Load the settings of one namespace from a JSON file.
    ///
    /// A missing file or a missing namespace yields the defaults.
    pub async fn from_file(path: &Path, namespace: &str) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let mut namespaces: HashMap<String, Config> = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid settings file {}: {}", path.display(), e))?;
        let config = namespaces.remove(namespace).unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Save the settings under `namespace`, keeping the other namespaces intact
    pub async fn save_to_file(&self, path: &Path, namespace: &str) -> Result<()> {
        let mut namespaces: HashMap<String, Config> = if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            serde_json::from_str(&content)?
        } else {
            HashMap::new()
        };
        namespaces.insert(namespace.to_string(), self.clone());

        let content = serde_json::to_string_pretty(&namespaces)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

/// Source of workflow settings
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    async fn settings(&self, namespace: &str) -> Result<Config>;
}

/// Settings provider backed by a JSON file with one object per namespace
#[derive(Debug, Clone)]
pub struct JsonSettingsProvider {
    path: PathBuf,
}

impl JsonSettingsProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SettingsProvider for JsonSettingsProvider {
    async fn settings(&self, namespace: &str) -> Result<Config> {
        Config::from_file(&self.path, namespace).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.width, 2560);
        assert_eq!(config.owner_ref, 1);
        assert_eq!(config.request_timeout_secs, 120);
        assert!(!config.has_api_key());
        assert!(config.ignored_folders().is_empty());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.width = 0;
        assert!(config.validate().is_err());

        config.width = 1920;
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ignored_folders_are_trimmed() {
        let config = Config {
            ignored_folder_names: " vault ,private,, ".to_string(),
            ..Default::default()
        };
        assert_eq!(config.ignored_folders(), vec!["vault", "private"]);
        assert!(config.is_ignored("a/vault/b.jpg"));
        assert!(config.is_ignored("private_stuff.png"));
        assert!(!config.is_ignored("public/c.jpg"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = Config {
            api_key: "super-secret".to_string(),
            ..Default::default()
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::from_file(&temp_dir.path().join("none.json"), DEFAULT_NAMESPACE)
            .await
            .unwrap();
        assert_eq!(config, Config::default());
    }

    #[tokio::test]
    async fn test_partial_namespace_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        tokio::fs::write(
            &path,
            r#"{"tinify_optimizer": {"api_key": "abc", "ignored_folder_names": "vault"}, "other": {"width": 10}}"#,
        )
        .await
        .unwrap();

        let provider = JsonSettingsProvider::new(&path);
        let config = provider.settings(DEFAULT_NAMESPACE).await.unwrap();
        assert_eq!(config.api_key, "abc");
        assert_eq!(config.width, 2560);
        assert_eq!(config.owner_ref, 1);
        assert_eq!(config.ignored_folders(), vec!["vault"]);

        let other = provider.settings("other").await.unwrap();
        assert_eq!(other.width, 10);
        assert!(!other.has_api_key());
    }

    #[tokio::test]
    async fn test_invalid_namespace_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        tokio::fs::write(&path, r#"{"tinify_optimizer": {"width": 0}}"#).await.unwrap();

        assert!(Config::from_file(&path, DEFAULT_NAMESPACE).await.is_err());
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.json");

        let original_config = Config {
            api_key: "key".to_string(),
            width: 1280,
            owner_ref: 7,
            ignored_folder_names: "a,b".to_string(),
            request_timeout_secs: 30,
        };

        original_config.save_to_file(&config_path, "first").await.unwrap();
        Config::default().save_to_file(&config_path, "second").await.unwrap();

        let loaded_config = Config::from_file(&config_path, "first").await.unwrap();
        assert_eq!(loaded_config, original_config);
        let second = Config::from_file(&config_path, "second").await.unwrap();
        assert_eq!(second, Config::default());
    }
}
