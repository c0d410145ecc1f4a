//! Parley REST API entry point.
//!
//! Binary name: `parley`
//!
//! Parses CLI arguments, opens the database, wires the chat pipeline,
//! then serves the REST API until Ctrl+C or SIGTERM.

mod http;
mod state;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use secrecy::SecretString;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use parley_core::chat::pipeline::ComponentStatus;
use parley_infra::llm::openai_compat::{DEFAULT_BASE_URL, DEFAULT_MODEL};

use state::AppState;

/// LLM chat relay with persistent conversation history.
#[derive(Debug, Parser)]
#[command(name = "parley", version, about)]
struct Cli {
    /// Address to bind the HTTP server to.
    #[arg(long, default_value = "0.0.0.0", env = "PARLEY_HOST")]
    host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 8000, env = "PARLEY_PORT")]
    port: u16,

    /// Path to the SQLite database file (created if missing).
    #[arg(long, default_value = "parley.db", env = "PARLEY_DB")]
    database: PathBuf,

    /// API key for the completion provider.
    #[arg(long, env = "PARLEY_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Base URL of the OpenAI-compatible completion endpoint.
    #[arg(long, default_value = DEFAULT_BASE_URL, env = "PARLEY_BASE_URL")]
    base_url: String,

    /// Model identifier to request completions from.
    #[arg(long, default_value = DEFAULT_MODEL, env = "PARLEY_MODEL")]
    model: String,

    /// Per-request timeout for the completion provider, in seconds.
    #[arg(long, default_value_t = 60, env = "PARLEY_TIMEOUT_SECS")]
    timeout_secs: u64,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "info,parley=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let api_key = SecretString::from(cli.api_key);
    let state = AppState::init(
        &cli.database,
        api_key,
        &cli.base_url,
        &cli.model,
        Duration::from_secs(cli.timeout_secs),
    )
    .await?;

    info!(database = %cli.database.display(), model = %cli.model, "pipeline initialized");

    // Reachability probe. A failure is logged but never aborts startup;
    // the provider may come back before the first real request.
    match state.pipeline.health_check().await.completion_api {
        ComponentStatus::Ok => info!(base_url = %cli.base_url, "completion provider reachable"),
        ComponentStatus::Error => {
            warn!(base_url = %cli.base_url, "completion provider unreachable at startup")
        }
    }

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "listening");

    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
