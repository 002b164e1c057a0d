//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom della pipeline.
//!
//! ## Responsabilità:
//! - Definisce `OptimizeError` per gli errori del workflow di compressione
//! - Definisce `StoreError` per ledger e catalogo (categoria stretta, assorbita dal metadata sync)
//! - Definisce `ClientError` per gli errori del servizio di compressione remoto
//!
//! ## Categorie di errori:
//! - `Config`: API key mancante o parametri non validi
//! - `Authentication`: account Tinify rifiutato in fase di validazione
//! - `Io`: errori di I/O (scan, lettura, sovrascrittura)
//! - `Store`: errori SQLite di ledger o catalogo
//! - `Client`: errori remoti (rete, quota, risposta inattesa)
//!
//! ## Esempio:
//! ```ignore
//! if config.api_key.trim().is_empty() {
//!     return Err(OptimizeError::Config("API key is not set".to_string()));
//! }
//! ```

/// Errors raised by the compression pipeline
#[derive(thiserror::Error, Debug)]
pub enum OptimizeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory scan error: {0}")]
    Scan(#[from] walkdir::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Compression service error: {0}")]
    Client(#[from] ClientError),
}

/// Errors raised by the ledger and catalog stores
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store directory error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by the compression service
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// Credentials rejected (401) or monthly limit reached (429)
    #[error("Account error ({status}): {message}")]
    Account { status: u16, message: String },

    /// Request rejected by the service (other 4xx)
    #[error("Client error ({status}): {message}")]
    Client { status: u16, message: String },

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Unexpected response: {0}")]
    Response(String),
}

impl ClientError {
    /// HTTP status attached to the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Account { status, .. } | Self::Client { status, .. } | Self::Server { status, .. } => {
                Some(*status)
            }
            Self::Connection(_) | Self::Response(_) => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Response(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}
