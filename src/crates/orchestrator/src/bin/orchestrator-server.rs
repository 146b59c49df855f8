//! Orchestrator server binary: serves the `/invoke` and `/ws` endpoints, or
//! validates a config file and exits.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use kernel_checkpoint::{Checkpointer, LocalDurableCheckpointer, MemoryCheckpointer};

use orchestrator::agents::demonstration_registry;
use orchestrator::api::routes::create_router;
use orchestrator::config::{CheckpointStoreKind, EngineConfig};
use orchestrator::facade::Facade;

#[derive(Parser)]
#[command(name = "orchestrator-server", about = "Multi-agent orchestration engine server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// YAML config file; falls back to defaults plus environment overrides when omitted.
    #[arg(long, env = "CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Address to bind the HTTP/websocket server to.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:8080")]
    bind: String,

    /// SQLite connection string, used only when `checkpoint_store: local_durable`.
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://orchestrator.db")]
    database_url: String,
}

#[derive(Subcommand)]
enum Command {
    /// Load a config file, apply environment overrides, print the result, and exit.
    Config {
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    if let Some(Command::Config { path }) = &cli.command {
        let config = EngineConfig::load(path)?;
        println!("{}", serde_yaml::to_string(&config)?);
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => {
            let mut config = EngineConfig::default();
            config.apply_env_overrides();
            config
        }
    };

    tracing::info!(
        max_concurrent = config.max_concurrent,
        breaker_threshold = config.breaker_threshold,
        checkpoint_store = ?config.checkpoint_store,
        "engine configuration loaded"
    );

    let checkpointer: Arc<dyn Checkpointer> = match config.checkpoint_store {
        CheckpointStoreKind::Memory => Arc::new(MemoryCheckpointer::new()),
        CheckpointStoreKind::LocalDurable => {
            tracing::info!(database_url = %cli.database_url, "connecting to durable checkpoint store");
            Arc::new(LocalDurableCheckpointer::connect(&cli.database_url).await?)
        }
    };

    let facade = Arc::new(Facade::new(Arc::new(demonstration_registry()), checkpointer, config));
    let app = create_router(facade);

    let addr: SocketAddr = cli.bind.parse()?;
    tracing::info!(%addr, "starting orchestrator server");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("orchestrator server shut down gracefully");
    Ok(())
}

fn init_tracing() {
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(rust_log).init();
}

/// Signal for graceful shutdown (Ctrl-C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install CTRL-C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received CTRL-C signal, shutting down");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM signal, shutting down");
        }
    }
}
