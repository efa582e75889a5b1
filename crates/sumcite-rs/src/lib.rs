//! Attributable document summarization engine.
//!
//! `sumcite-rs` turns a styled source document into a sentence-addressable
//! block sequence, then drives a multi-turn conversation with an LLM to
//! produce summaries in which every summary block cites the source blocks it
//! was derived from. The core abstraction is the
//! [`SummaryEngine`](engine::SummaryEngine) — a conversation protocol engine
//! that builds the first system+context message pair from a segmented
//! document, appends follow-up prompts, sends the full history to the
//! completion capability, validates and re-indexes the structured response,
//! and persists the conversation record with an idle-expiry TTL.
//!
//! # Getting started
//!
//! ```ignore
//! use sumcite_rs::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> SumciteResult<()> {
//!     let api_key = std::env::var("OPENAI_API_KEY").unwrap();
//!     let client = OpenAiClient::new(api_key)?;
//!     let store = MemoryConversationStore::new();
//!     let documents = FileDocumentSource::new("documents");
//!
//!     let engine = SummaryEngine::new(&client, &store, EngineConfig::default());
//!     let response = engine
//!         .generate(&documents, &SummaryRequest {
//!             conversation_id: None,
//!             document_id: "report.docx".into(),
//!             prompt_type: PromptType::General,
//!             source_target_text: None,
//!             summary_target_text: None,
//!             prompt: "Summarize the article.".into(),
//!         })
//!         .await?;
//!
//!     for block in &response.summary {
//!         println!("[{}] {} <- {:?}", block.id, block.text, block.sources);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`document`] | Block segmentation, markdown rendering, source index, document sources |
//! | [`engine`] | Conversation protocol engine, multi-document aggregator, conversation store, records |
//! | [`api`] | Retry policy for the completion+parse step |
//! | [`error`] | Typed error taxonomy ([`SumciteError`]) |
//!
//! # Design principles
//!
//! 1. **Every claim cites its sources.** The system prompt fixes a JSON
//!    envelope in which each summary block lists the `S<n>` IDs of the
//!    source blocks it came from, and the engine re-indexes every response.
//! 2. **Collaborators are traits.** The completion capability
//!    ([`CompletionClient`]), the conversation store
//!    ([`ConversationStore`](engine::ConversationStore)), the document
//!    source, and the pregenerated-artifact source are all seams — the
//!    engine never knows whether it is talking to OpenAI or a scripted fake.
//! 3. **No partial turns.** A conversation record is only written back after
//!    the completion call succeeded *and* its output parsed. A failed turn
//!    leaves the stored history exactly as it was.

pub mod api;
pub mod document;
pub mod engine;
pub mod error;
pub mod prelude;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

pub use error::{SumciteError, SumciteResult};

// ── Constants ──────────────────────────────────────────────────────

/// Default chat-completions endpoint (OpenAI-compatible).
pub const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default model for summarization calls.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

// ── Schema generation ──────────────────────────────────────────────

/// Generate a JSON Schema `serde_json::Value` from a type that implements
/// `schemars::JsonSchema`. Used to validate the model's summary envelope
/// before deserializing it into typed records.
pub fn json_schema_for<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
}

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// One typed part of a multimodal message (chart-explanation turns send an
/// image next to the prompt text).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageRef },
}

/// Reference to an image by URL (or data URI).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ImageRef {
    pub url: String,
}

/// Message content: plain text for ordinary turns, typed parts for
/// multimodal turns. Serializes to the chat-completions wire shape (a bare
/// string or an array of parts).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// The plain text of this content, if it is text-only.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(t) => Some(t),
            MessageContent::Parts(_) => None,
        }
    }
}

/// A message in the conversation. Append-only position in the message list
/// is the turn index.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    pub content: MessageContent,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Text(content.into()),
        }
    }

    /// A multimodal user message (text + image parts).
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Parts(parts),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: MessageContent::Text(content.into()),
        }
    }

    /// The message's text content, if text-only.
    pub fn text(&self) -> Option<&str> {
        self.content.as_text()
    }
}

// ── Completion capability ──────────────────────────────────────────

/// The opaque completion capability: the full ordered message history goes
/// in, one assistant content string comes out.
///
/// The engine is generic over this trait; production code uses
/// [`OpenAiClient`], tests and canned-response mode use [`ScriptedClient`].
pub trait CompletionClient: Send + Sync {
    fn complete(
        &self,
        messages: &[Message],
    ) -> impl std::future::Future<Output = SumciteResult<String>> + Send;
}

// ── Request / response wire types ──────────────────────────────────

/// Chat completion request body (OpenAI-compatible subset).
#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Raw API response (internal deserialization target).
#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Token usage statistics.
#[derive(Deserialize, Debug, Clone)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

// ── OpenAI client ──────────────────────────────────────────────────

/// Async HTTP client for an OpenAI-compatible chat completions API.
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl OpenAiClient {
    /// Create a client with the given API key and default endpoint/model.
    pub fn new(api_key: impl Into<String>) -> SumciteResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent("sumcite/0.1")
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| SumciteError::Upstream(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: OPENAI_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
        })
    }

    /// Point the client at a different OpenAI-compatible endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Select the model used for completions.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Cap the response length.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl CompletionClient for OpenAiClient {
    async fn complete(&self, messages: &[Message]) -> SumciteResult<String> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(
            "LLM request: model={}, messages={}, temp={}",
            self.model,
            messages.len(),
            self.temperature,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(&body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| SumciteError::Upstream(format!("request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| SumciteError::Upstream(format!("failed to read response: {e}")))?;

        let elapsed = start.elapsed();
        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            elapsed.as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(SumciteError::Upstream(format!(
                "chat API HTTP {status}: {text}"
            )));
        }

        let parsed: RawChatResponse = serde_json::from_str(&text)
            .map_err(|e| SumciteError::Upstream(format!("failed to parse response: {e}")))?;

        if let Some(err) = parsed.error {
            return Err(SumciteError::Upstream(format!(
                "chat API error: {}",
                err.message
            )));
        }

        if let Some(ref usage) = parsed.usage {
            debug!(
                "Token usage: prompt={}, completion={}, total={}",
                usage.prompt_tokens.unwrap_or(0),
                usage.completion_tokens.unwrap_or(0),
                usage.total_tokens.unwrap_or(0),
            );
        }

        parsed
            .choices
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| SumciteError::Upstream("empty completion".to_string()))
    }
}

// ── Scripted client ────────────────────────────────────────────────

/// A [`CompletionClient`] that pops canned responses in order.
///
/// Backs the CLI's canned-response mode and the protocol tests: the
/// conversation engine exercises its full turn logic against a script
/// instead of a live model.
pub struct ScriptedClient {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedClient {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }

    /// How many scripted responses are still unconsumed.
    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

impl CompletionClient for ScriptedClient {
    async fn complete(&self, _messages: &[Message]) -> SumciteResult<String> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| SumciteError::Upstream("scripted responses exhausted".to_string()))
    }
}
