//! Attributable-summary backend service.
//!
//! Segments documents, drives the summary conversation protocol, and keeps
//! conversation state in a volatile TTL store. Routes:
//!
//! - `POST /summaries/generate` — single-document turn
//! - `POST /summaries/generate-multi` — multi-document turn
//! - `POST /rewrite/email` — email-style rewrite turn
//! - `POST /charts/explain` — chart-explanation turn
//! - `GET /health`
//!
//! # Usage
//!
//! ```bash
//! OPENAI_API_KEY=sk-... cargo run -p sumcite-web
//! OPENAI_API_KEY=sk-... cargo run -p sumcite-web -- --port 8080 --model gpt-4o
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sumcite_web::{AppState, api};

use sumcite_rs::document::FileDocumentSource;
use sumcite_rs::engine::{EngineConfig, FileArtifactSource, MemoryConversationStore};
use sumcite_rs::{OpenAiClient, api::RetryConfig};

/// Attributable-summary backend service.
#[derive(Parser)]
#[command(about = "HTTP backend for attributable document summaries")]
struct Args {
    /// Port to listen on.
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Directory holding `{documentId}.json` paragraph files.
    #[arg(long, default_value = "documents")]
    documents_dir: String,

    /// Directory holding pregenerated `{documentId}.json` summary artifacts.
    #[arg(long, default_value = "artifacts")]
    artifacts_dir: String,

    /// Model to use for completions.
    #[arg(long, default_value = sumcite_rs::DEFAULT_MODEL)]
    model: String,

    /// OpenAI-compatible chat completions endpoint.
    #[arg(long)]
    endpoint: Option<String>,

    /// Conversation idle-expiry TTL in seconds.
    #[arg(long, default_value_t = 3600)]
    ttl_secs: u64,

    /// Completion attempt budget per turn.
    #[arg(long, default_value_t = 2)]
    max_attempts: u32,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sumcite=info,sumcite_web=info")),
        )
        .init();

    let args = Args::parse();

    let api_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| "Set OPENAI_API_KEY env var to your API key".to_string())?;
    let client = {
        let client = OpenAiClient::new(api_key)
            .map_err(|e| e.to_string())?
            .with_model(&args.model);
        match &args.endpoint {
            Some(endpoint) => client.with_endpoint(endpoint),
            None => client,
        }
    };

    let state = AppState {
        client: Arc::new(client),
        store: Arc::new(MemoryConversationStore::new()),
        documents: Arc::new(FileDocumentSource::new(&args.documents_dir)),
        artifacts: Arc::new(FileArtifactSource::new(&args.artifacts_dir)),
        config: EngineConfig {
            ttl: Duration::from_secs(args.ttl_secs),
            retry: RetryConfig::with_attempts(args.max_attempts),
        },
    };

    let bind_addr: SocketAddr = ([127, 0, 0, 1], args.port).into();
    api::serve(state, bind_addr).await
}
