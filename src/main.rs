//! SEREN - Seismic Emergency Response ENgine
//!
//! Case-based decision-support service for earthquake response.
//!
//! # Usage
//!
//! ```bash
//! # Run fully mocked (no external services required)
//! MOCK_MODE=true cargo run --release
//!
//! # Run against real providers
//! TEXT_LLM_PROVIDER=groq GROQ_API_KEY=... \
//! EMBEDDING_PROVIDER=huggingface HF_API_TOKEN=... \
//! VECTOR_STORE_HOST=localhost VECTOR_STORE_PORT=6333 \
//! cargo run --release
//! ```
//!
//! # Environment Variables
//!
//! - `TEXT_LLM_PROVIDER`: groq | openai | mock
//! - `EMBEDDING_PROVIDER`: huggingface | openai | mock
//! - `MOCK_MODE=true`: force mock clients end-to-end
//! - `VECTOR_STORE_URL` / `VECTOR_STORE_HOST` + `VECTOR_STORE_PORT`
//! - `LLM_MODEL`: text model identifier
//! - `RUST_LOG`: logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use seren::api::{build_service_state, create_app};
use seren::EngineConfig;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "seren")]
#[command(about = "SEREN Earthquake Decision Support Engine")]
#[command(version)]
struct CliArgs {
    /// Override the server address (default: "0.0.0.0:8080")
    #[arg(short, long)]
    addr: Option<String>,

    /// Force mock providers and the in-memory store (same as MOCK_MODE=true)
    #[arg(long)]
    mock: bool,
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // .env before anything reads the environment
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    if args.mock {
        std::env::set_var("MOCK_MODE", "true");
    }

    // Configuration errors are fatal: refuse to start half-wired.
    let config = EngineConfig::from_env().context("invalid configuration")?;
    let server_addr = args.addr.unwrap_or_else(|| config.server_addr.clone());

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  SEREN - Seismic Emergency Response ENgine");
    info!("  Case-Based Decision Support for Earthquake Response");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("");
    info!(
        "  Providers: text={:?}, embeddings={:?}, mock_mode={}",
        config.text_provider, config.embedding_provider, config.mock_mode
    );

    let state = build_service_state(&config)
        .await
        .context("failed to initialize services")?;
    let app = create_app(state);

    // Graceful shutdown on Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let listener = tokio::net::TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("failed to bind {server_addr}"))?;
    info!("🌐 API server listening on http://{server_addr}");
    info!("");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
        })
        .await
        .context("server error")?;

    info!("");
    info!("✓ SEREN shutdown complete");
    Ok(())
}
