//! # Tinify Optimizer - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento delle impostazioni e override da CLI / environment
//! - Costruzione di ledger, catalogo e client Tinify
//! - Dispatch dei sottocomandi e mapping dell'exit code
//!
//! ## Sottocomandi:
//! - `compress-all`: comprime tutte le immagini idonee
//! - `refresh-metadata`: riallinea size e dimensioni nel catalogo
//! - `compress <identifier>`: comprime un singolo file
//! - `hook <event.json|->`: gestisce un evento di upload
//! - `reprocess <identifier>`: rimuove un file dal ledger
//! - `scan`: elenca le immagini ancora da comprimere
//!
//! ## Esempio di utilizzo:
//! ```bash
//! tinify-optimizer --root /var/www/fileadmin --progress compress-all
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

use tinify_optimizer::{
    config::DEFAULT_NAMESPACE,
    optimizer::PathResolver,
    state::default_database_path,
    BulkOptimizer, CompressionOutcome, CompressionWorkflow, Config, FileCommandEvent, FileManager,
    JsonSettingsProvider, LedgerStore, MetadataSync, SettingsProvider, SqliteCatalog, SqliteLedger, TinifyClient,
    UploadHook,
};

#[derive(Parser)]
#[command(name = "tinify-optimizer")]
#[command(about = "Compress and resize stored images through the Tinify service")]
struct Args {
    /// Storage root containing the images
    #[arg(short, long)]
    root: PathBuf,

    /// JSON settings file
    #[arg(short, long, default_value = "tinify-optimizer.json")]
    config: PathBuf,

    /// Settings namespace inside the JSON file
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// SQLite database for ledger and catalog (default: derived from the storage root)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Tinify API key, overrides the settings file
    #[arg(long, env = "TINIFY_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Show a progress bar during bulk runs
    #[arg(short, long)]
    progress: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compress every eligible image under the storage root
    CompressAll,
    /// Refresh size and dimensions of every cataloged image
    RefreshMetadata,
    /// Compress a single image
    Compress {
        /// Identifier relative to the storage root
        identifier: String,
    },
    /// Handle a file command event (path to a JSON file, or `-` for stdin)
    Hook { event: String },
    /// Remove an image from the ledger so the next run compresses it again
    Reprocess { identifier: String },
    /// List the images the next compression run would process
    Scan,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if !args.root.is_dir() {
        return Err(anyhow::anyhow!("Storage root is not a directory: {}", args.root.display()));
    }

    let mut config = JsonSettingsProvider::new(&args.config).settings(&args.namespace).await?;
    if let Some(api_key) = &args.api_key {
        config.api_key = api_key.clone();
    }

    let database = match &args.database {
        Some(path) => path.clone(),
        None => default_database_path(&args.root)?,
    };
    info!("Using database {}", database.display());

    match &args.command {
        Command::CompressAll => {
            let workflow = build_workflow(config, &database)?;
            let report = BulkOptimizer::new(&args.root)
                .with_progress(args.progress)
                .compress_all(&workflow)
                .await?;
            Ok(report.status.exit_code())
        }
        Command::RefreshMetadata => {
            let sync = MetadataSync::new(Box::new(SqliteCatalog::open(&database)?));
            let report = BulkOptimizer::new(&args.root)
                .with_progress(args.progress)
                .refresh_metadata(&sync)
                .await?;
            Ok(report.status.exit_code())
        }
        Command::Compress { identifier } => {
            let workflow = build_workflow(config, &database)?;
            let outcome = workflow.compress(&args.root, identifier).await?;
            info!("{}: {:?}", identifier, outcome);
            Ok(outcome_exit_code(&outcome))
        }
        Command::Hook { event } => {
            let event = read_event(event).await?;
            let workflow = build_workflow(config, &database)?;
            let outcome = UploadHook::new(&workflow, &args.root).handle(&event).await;
            match outcome {
                Some(outcome) => Ok(outcome_exit_code(&outcome)),
                None => Ok(ExitCode::SUCCESS),
            }
        }
        Command::Reprocess { identifier } => {
            let ledger = SqliteLedger::open(&database)?;
            let identifier = PathResolver::normalize_identifier(identifier);
            let removed = ledger.invalidate(identifier)?;
            if removed == 0 {
                warn!("{} is not in the ledger", identifier);
            } else {
                info!("{} will be compressed again on the next run", identifier);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Scan => {
            let ledger = SqliteLedger::open(&database)?;
            let pending = pending_files(&args.root, &config, &ledger)?;
            for identifier in &pending {
                println!("{}", identifier);
            }
            info!("{} images waiting for compression", pending.len());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build_workflow(config: Config, database: &Path) -> Result<CompressionWorkflow> {
    if !config.has_api_key() {
        return Err(anyhow::anyhow!("Tinify API key is not set (use --api-key or TINIFY_API_KEY)"));
    }

    let client = TinifyClient::new(config.api_key.clone(), Duration::from_secs(config.request_timeout_secs))?;
    let ledger = SqliteLedger::open(database)?;
    let catalog = SqliteCatalog::open(database)?;

    Ok(CompressionWorkflow::new(
        config,
        Box::new(ledger),
        Box::new(client),
        MetadataSync::new(Box::new(catalog)),
    )?)
}

/// Scanned identifiers that are neither ignored nor already ledgered
fn pending_files(root: &Path, config: &Config, ledger: &dyn LedgerStore) -> Result<Vec<String>> {
    let mut pending = Vec::new();

    for identifier in FileManager::scan(root)? {
        if config.is_ignored(&identifier) {
            continue;
        }
        if ledger.is_eligible(&identifier)? {
            pending.push(identifier);
        }
    }

    Ok(pending)
}

async fn read_event(source: &str) -> Result<FileCommandEvent> {
    let content = if source == "-" {
        let mut buffer = String::new();
        tokio::io::stdin().read_to_string(&mut buffer).await?;
        buffer
    } else {
        tokio::fs::read_to_string(source).await?
    };

    serde_json::from_str(&content).map_err(|e| anyhow::anyhow!("Invalid event {}: {}", source, e))
}

fn outcome_exit_code(outcome: &CompressionOutcome) -> ExitCode {
    match outcome {
        CompressionOutcome::Failed(_) => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}
