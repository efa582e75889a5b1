//! Run one summarization turn from the command line and print the response.
//!
//! Reads the API key from the `OPENAI_API_KEY` environment variable (not
//! needed with `--canned`).
//!
//! # Examples
//!
//! ```sh
//! # First turn over a single document
//! sumcite --document-id report --prompt "Summarize the article"
//!
//! # Source-scoped follow-up in an existing conversation
//! sumcite --document-id report --conversation-id 5a8d... \
//!   --prompt-type source --source-target "Revenue grew." --prompt "Expand"
//!
//! # Combine pregenerated per-document summaries
//! sumcite --document-ids d1,d2 --artifacts-dir artifacts --prompt "Combine"
//!
//! # Dry-run against a canned response instead of a live model
//! sumcite --document-id report --prompt "Summarize" --canned fake/summary.json
//! ```
//!
//! Conversations live in an in-memory store, so follow-up turns across
//! separate CLI invocations need the long-running `sumcite-web` service;
//! the CLI is for one-shot runs and canned-response dry-runs.

use clap::Parser;
use std::process;
use sumcite_rs::document::FileDocumentSource;
use sumcite_rs::engine::{
    EngineConfig, FileArtifactSource, MemoryConversationStore, MultiSummaryRequest, PromptType,
    SummaryEngine, SummaryRequest,
};
use sumcite_rs::{CompletionClient, OpenAiClient, ScriptedClient, SumciteResult};

/// Run one attributable-summary turn and print the JSON response.
#[derive(Parser)]
#[command(name = "sumcite")]
struct Cli {
    // ── Document selection ─────────────────────────────────────
    /// Directory holding `{documentId}.json` paragraph files
    #[arg(long, default_value = "documents")]
    documents_dir: String,

    /// Directory holding pregenerated `{documentId}.json` summary artifacts
    #[arg(long, default_value = "artifacts")]
    artifacts_dir: String,

    /// Single document to summarize
    #[arg(long, conflicts_with = "document_ids")]
    document_id: Option<String>,

    /// Comma-separated documents for a combined summary
    #[arg(long, value_delimiter = ',')]
    document_ids: Vec<String>,

    // ── Turn content ───────────────────────────────────────────
    /// Existing conversation to continue
    #[arg(long)]
    conversation_id: Option<String>,

    /// Prompt scope: general, source, or summary
    #[arg(long, default_value = "general")]
    prompt_type: String,

    /// Target sentence for a source-scoped prompt
    #[arg(long)]
    source_target: Option<String>,

    /// Target sentence for a summary-scoped prompt
    #[arg(long)]
    summary_target: Option<String>,

    /// The prompt to send
    #[arg(long)]
    prompt: String,

    // ── Model selection ────────────────────────────────────────
    /// Model to use
    #[arg(long, default_value = sumcite_rs::DEFAULT_MODEL)]
    model: String,

    /// OpenAI-compatible chat completions endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Serve this canned response file instead of calling the model
    #[arg(long)]
    canned: Option<String>,
}

fn parse_prompt_type(raw: &str) -> Result<PromptType, String> {
    match raw {
        "general" => Ok(PromptType::General),
        "source" => Ok(PromptType::Source),
        "summary" => Ok(PromptType::Summary),
        other => Err(format!(
            "unknown prompt type {other:?} (expected general, source, or summary)"
        )),
    }
}

async fn run_turn<C: CompletionClient>(cli: &Cli, client: &C) -> SumciteResult<serde_json::Value> {
    let store = MemoryConversationStore::new();
    let engine = SummaryEngine::new(client, &store, EngineConfig::default());
    let prompt_type = parse_prompt_type(&cli.prompt_type)
        .map_err(sumcite_rs::SumciteError::Validation)?;

    if !cli.document_ids.is_empty() {
        let artifacts = FileArtifactSource::new(&cli.artifacts_dir);
        let response = engine
            .generate_multi(
                &artifacts,
                &MultiSummaryRequest {
                    conversation_id: cli.conversation_id.clone(),
                    document_ids: cli.document_ids.clone(),
                    prompt_type,
                    source_target_text: cli.source_target.clone(),
                    summary_target_text: cli.summary_target.clone(),
                    prompt: cli.prompt.clone(),
                },
            )
            .await?;
        Ok(serde_json::to_value(response)?)
    } else {
        let document_id = cli.document_id.clone().ok_or_else(|| {
            sumcite_rs::SumciteError::Validation(
                "either --document-id or --document-ids is required".to_string(),
            )
        })?;
        let documents = FileDocumentSource::new(&cli.documents_dir);
        let response = engine
            .generate(
                &documents,
                &SummaryRequest {
                    conversation_id: cli.conversation_id.clone(),
                    document_id,
                    prompt_type,
                    source_target_text: cli.source_target.clone(),
                    summary_target_text: cli.summary_target.clone(),
                    prompt: cli.prompt.clone(),
                },
            )
            .await?;
        Ok(serde_json::to_value(response)?)
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sumcite=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match &cli.canned {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(canned) => run_turn(&cli, &ScriptedClient::new(vec![canned])).await,
            Err(e) => {
                eprintln!("Error: failed to read canned response {path}: {e}");
                process::exit(1);
            }
        },
        None => {
            let api_key = match std::env::var("OPENAI_API_KEY") {
                Ok(key) => key,
                Err(_) => {
                    eprintln!("Error: set OPENAI_API_KEY (or use --canned)");
                    process::exit(1);
                }
            };
            let client = match OpenAiClient::new(api_key) {
                Ok(client) => {
                    let client = client.with_model(&cli.model);
                    match &cli.endpoint {
                        Some(endpoint) => client.with_endpoint(endpoint),
                        None => client,
                    }
                }
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
            run_turn(&cli, &client).await
        }
    };

    match result {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(pretty) => println!("{pretty}"),
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_type_parsing() {
        assert_eq!(parse_prompt_type("general").unwrap(), PromptType::General);
        assert_eq!(parse_prompt_type("source").unwrap(), PromptType::Source);
        assert_eq!(parse_prompt_type("summary").unwrap(), PromptType::Summary);
        assert!(parse_prompt_type("other").is_err());
    }
}
