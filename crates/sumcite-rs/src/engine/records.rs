//! Typed records for conversations, turns, and the summary envelope.
//!
//! The original contract moved loosely-shaped maps between the store and
//! the protocol engine; here every record crossing a boundary is a tagged
//! struct validated at deserialization, not at use-sites. Wire field names
//! are camelCase so these types double as the request/response DTOs.

use crate::document::{Block, SourceEntry, render_markdown, source_entries};
use crate::error::{SumciteError, SumciteResult};
use crate::{Message, json_schema_for};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

// ── Document context ───────────────────────────────────────────────

/// A document's segmented form plus metadata. Created once per document per
/// conversation; immutable afterwards.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentContext {
    /// Caller-supplied external identifier.
    pub document_id: String,
    /// Structured block list — the attribution universe.
    pub source: Vec<SourceEntry>,
    /// Rendered markdown sent to the model as "Original Article".
    pub markdown: String,
}

impl DocumentContext {
    /// Build a context from freshly segmented blocks.
    pub fn from_blocks(document_id: impl Into<String>, blocks: &[Block]) -> Self {
        Self {
            document_id: document_id.into(),
            source: source_entries(blocks),
            markdown: render_markdown(blocks),
        }
    }
}

// ── Conversation ───────────────────────────────────────────────────

/// What a conversation is about.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversationContext {
    /// A single source document.
    Document(DocumentContext),
    /// A meta-conversation over per-document child conversations.
    MultiDocument {
        #[serde(rename = "documentIds")]
        document_ids: Vec<String>,
        #[serde(rename = "childIds")]
        child_ids: Vec<String>,
    },
    /// No document context (email rewrite, chart explanation).
    Transient,
}

/// The unit of persisted state: message history plus document context,
/// keyed by conversation ID in the store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub context: ConversationContext,
    /// Append-only; `messages[0]` is always the system prompt.
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: impl Into<String>, context: ConversationContext, messages: Vec<Message>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            context,
            messages,
            created_at: now,
            updated_at: now,
        }
    }

    /// The most recent assistant message's text, if any.
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == crate::MessageRole::Assistant)
            .and_then(|m| m.text())
    }

    /// Mark the record as touched now (called before writing back).
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ── Summary envelope ───────────────────────────────────────────────

/// One summary block as the model emits it (no ID — any the model invents
/// is discarded by re-indexing).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
pub struct RawSummaryBlock {
    /// Markdown content of the summary sentence.
    pub text: String,
    /// Source-block IDs this sentence was derived from.
    #[serde(default)]
    pub sources: Vec<String>,
}

/// The JSON envelope the system prompt requires the model to emit.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
pub struct SummaryEnvelope {
    pub summary: Vec<RawSummaryBlock>,
}

/// One attributed unit of a turn response, with its per-turn index.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SummaryBlock {
    /// 1-based position in this turn's response. Not stable across turns —
    /// every response is re-indexed from 1.
    pub id: String,
    pub text: String,
    pub sources: Vec<String>,
}

fn envelope_schema() -> &'static serde_json::Value {
    static SCHEMA: OnceLock<serde_json::Value> = OnceLock::new();
    SCHEMA.get_or_init(json_schema_for::<SummaryEnvelope>)
}

/// Parse and schema-validate an assistant message as a summary envelope.
///
/// Any failure — non-JSON content, schema mismatch — is a
/// [`ModelOutput`](SumciteError::ModelOutput) error; no partial result is
/// ever produced from unparseable content.
pub fn parse_summary_envelope(raw: &str) -> SumciteResult<SummaryEnvelope> {
    let value: serde_json::Value = serde_json::from_str(raw.trim())
        .map_err(|e| SumciteError::ModelOutput(format!("not valid JSON: {e}")))?;

    if let Ok(validator) = jsonschema::validator_for(envelope_schema()) {
        let errors: Vec<String> = validator
            .iter_errors(&value)
            .map(|e| format!("{}: {e}", e.instance_path()))
            .collect();
        if !errors.is_empty() {
            return Err(SumciteError::ModelOutput(format!(
                "summary envelope schema violation: {}",
                errors.join("; ")
            )));
        }
    }

    serde_json::from_value(value)
        .map_err(|e| SumciteError::ModelOutput(format!("envelope deserialization failed: {e}")))
}

/// Assign fresh 1-based IDs to a parsed envelope's blocks — per-turn local
/// numbering, overwriting anything the model may have emitted.
pub fn index_summary(envelope: SummaryEnvelope) -> Vec<SummaryBlock> {
    envelope
        .summary
        .into_iter()
        .enumerate()
        .map(|(i, block)| SummaryBlock {
            id: (i + 1).to_string(),
            text: block.text,
            sources: block.sources,
        })
        .collect()
}

// ── Turn requests ──────────────────────────────────────────────────

/// How the caller's prompt should be scoped.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PromptType {
    /// Pass the prompt through unmodified.
    General,
    /// Update the summary with respect to a cited source sentence.
    Source,
    /// Update the summary with respect to a prior summary sentence.
    Summary,
}

/// A single-document turn request.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    /// Absent on the first turn; the engine generates one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub document_id: String,
    pub prompt_type: PromptType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_target_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_target_text: Option<String>,
    pub prompt: String,
}

/// A multi-document turn request.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MultiSummaryRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub document_ids: Vec<String>,
    pub prompt_type: PromptType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_target_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_target_text: Option<String>,
    pub prompt: String,
}

/// An email-style rewrite turn (no document context).
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RewriteRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub prompt: String,
}

/// A chart-explanation turn. The first turn must carry the chart image.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChartRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub prompt: String,
}

/// Shared validation of the prompt-scoping fields.
pub(crate) fn validate_prompt_scope(
    prompt_type: PromptType,
    source_target_text: Option<&str>,
    summary_target_text: Option<&str>,
) -> SumciteResult<()> {
    match prompt_type {
        PromptType::Source if source_target_text.is_none_or(|t| t.trim().is_empty()) => {
            Err(SumciteError::Validation(
                "promptType \"source\" requires sourceTargetText".to_string(),
            ))
        }
        PromptType::Summary if summary_target_text.is_none_or(|t| t.trim().is_empty()) => {
            Err(SumciteError::Validation(
                "promptType \"summary\" requires summaryTargetText".to_string(),
            ))
        }
        _ => Ok(()),
    }
}

impl SummaryRequest {
    pub fn validate(&self) -> SumciteResult<()> {
        if self.document_id.trim().is_empty() {
            return Err(SumciteError::Validation("documentId is required".to_string()));
        }
        validate_prompt_scope(
            self.prompt_type,
            self.source_target_text.as_deref(),
            self.summary_target_text.as_deref(),
        )
    }
}

impl MultiSummaryRequest {
    pub fn validate(&self) -> SumciteResult<()> {
        if self.document_ids.is_empty() {
            return Err(SumciteError::Validation(
                "documentIds must not be empty".to_string(),
            ));
        }
        validate_prompt_scope(
            self.prompt_type,
            self.source_target_text.as_deref(),
            self.summary_target_text.as_deref(),
        )
    }
}

// ── Turn responses ─────────────────────────────────────────────────

/// Response to a single-document turn.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub conversation_id: String,
    pub summary: Vec<SummaryBlock>,
    /// The attribution universe for this document.
    pub source: Vec<SourceEntry>,
}

/// Per-document slice of a multi-document response.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct IndividualDocument {
    pub conversation_id: String,
    pub summary: Vec<SummaryBlock>,
    pub source: Vec<SourceEntry>,
}

/// Response to a multi-document turn.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MultiSummaryResponse {
    pub conversation_id: String,
    pub summary: Vec<SummaryBlock>,
    pub individual_documents: Vec<IndividualDocument>,
}

/// Response to a transient (email/chart) turn: the assistant's raw text.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TransientResponse {
    pub conversation_id: String,
    pub content: String,
}
