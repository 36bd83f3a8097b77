//! docstore HTTP API server.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::signal;
use tower_http::trace::TraceLayer;

use docstore::server::{AppState, Config, init_logging, router};

/// docstore HTTP API server.
#[derive(Parser, Debug)]
#[command(name = "docstore-server")]
#[command(about = "HTTP API server for the docstore JSON document store")]
struct Args {
    /// Path to the configuration file. Defaults apply if it does not exist.
    #[arg(short, long, default_value = "docstore-server.toml")]
    config: PathBuf,

    /// Storage root directory (overrides `store.root`).
    #[arg(long, env = "DOCSTORE_ROOT")]
    root: Option<PathBuf>,

    /// Writer identity stamped on documents (overrides `store.writer_id`).
    #[arg(long, env = "DOCSTORE_WRITER_ID")]
    writer_id: Option<String>,

    /// Port to listen on (overrides `server.port`).
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration first (needed for logging setup)
    let config_found = args.config.exists();
    let mut config = if config_found {
        Config::from_file(&args.config)?
    } else {
        Config::default()
    };
    if let Some(root) = args.root {
        config.store.root = root;
    }
    if let Some(writer_id) = args.writer_id {
        config.store.writer_id = writer_id;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    init_logging(&config.logging)?;

    if config_found {
        tracing::info!("Loaded configuration from {}", args.config.display());
    } else {
        tracing::info!(
            "No configuration file at {}, using defaults",
            args.config.display()
        );
    }
    tracing::info!(
        root = %config.store.root.display(),
        writer_id = %config.store.writer_id,
        lock_timeout_ms = config.store.lock_timeout_ms,
        "Opening storage root"
    );

    let state = AppState::from_config(&config)?;
    let app = router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.bind_addr().parse()?;
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
