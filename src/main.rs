use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use docstore::{DEFAULT_ROOT, DEFAULT_WRITER_ID, Document, DocumentService, StoreConfig};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Either --data or --file must be specified")]
    MissingBody,

    #[error(transparent)]
    Store(#[from] docstore::Error),
}

#[derive(Parser)]
#[command(name = "docstore")]
#[command(about = "Create, read, update, and delete JSON documents in a docstore root")]
struct Cli {
    /// Storage root directory
    #[arg(long, global = true, default_value = DEFAULT_ROOT, env = "DOCSTORE_ROOT")]
    root: PathBuf,

    /// Writer identity stamped on created and updated documents
    #[arg(long, global = true, default_value = "docstore-cli", env = "DOCSTORE_WRITER_ID")]
    writer_id: String,

    /// Maximum time to wait for a document lock, in milliseconds
    #[arg(long, global = true)]
    lock_timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

/// Document body given inline or read from a file.
#[derive(Args)]
#[group(multiple = false)]
struct Body {
    /// JSON value to store as the document's data
    #[arg(short, long)]
    data: Option<String>,

    /// File containing the JSON value to store as the document's data
    #[arg(short, long)]
    file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a new document and print it
    Create {
        #[command(flatten)]
        body: Body,
    },

    /// Print a document
    Get {
        /// Document id
        id: String,
    },

    /// Replace a document's data and print the result
    Update {
        /// Document id
        id: String,

        #[command(flatten)]
        body: Body,
    },

    /// Delete a document
    Delete {
        /// Document id
        id: String,
    },
}

impl Body {
    /// Wrap the given value as a `{"data": ...}` payload.
    fn into_payload(self) -> Result<Value, AppError> {
        let raw = match (self.data, self.file) {
            (Some(data), _) => data,
            (None, Some(file)) => std::fs::read_to_string(file)?,
            (None, None) => return Err(AppError::MissingBody),
        };
        let data: Value = serde_json::from_str(&raw)?;
        Ok(serde_json::json!({ "data": data }))
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("DOCSTORE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let mut config = StoreConfig::new(cli.root).with_writer_id(cli.writer_id);
    if let Some(ms) = cli.lock_timeout_ms {
        config = config.with_lock_timeout(std::time::Duration::from_millis(ms));
    }
    if config.writer_id.is_empty() {
        config.writer_id = DEFAULT_WRITER_ID.to_string();
    }
    let docs = DocumentService::open(&config)?;

    match cli.command {
        Commands::Create { body } => print_document(&docs.create(body.into_payload()?)?),
        Commands::Get { id } => print_document(&docs.get(&id)?),
        Commands::Update { id, body } => print_document(&docs.update(&id, body.into_payload()?)?),
        Commands::Delete { id } => {
            docs.delete(&id)?;
            println!("Deleted '{}'", id);
            Ok(())
        }
    }
}

fn print_document(document: &Document) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(document)?);
    Ok(())
}
