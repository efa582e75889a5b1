//! The single-conversation turn protocol.
//!
//! A conversation is either NEW (no `conversationId` in the request — the
//! engine generates one, segments the document, and builds the initial
//! system+context message pair) or ACTIVE (the record is loaded from the
//! store; a missing record is an invalid-reference error, never silently
//! treated as NEW). Every turn appends exactly one user message, sends the
//! full ordered history to the completion capability, validates the JSON
//! envelope, re-indexes the summary blocks from 1, and only then appends
//! the assistant message and writes the record back with the idle TTL — a
//! failed turn mutates nothing.

use super::prompts::{
    CHART_EXPLANATION_SYSTEM_PROMPT, EMAIL_REWRITE_SYSTEM_PROMPT, SUMMARY_SYSTEM_PROMPT,
    original_article_message, wrap_user_prompt,
};
use super::records::{
    ChartRequest, Conversation, ConversationContext, DocumentContext, RewriteRequest,
    SummaryEnvelope, SummaryRequest, SummaryResponse, TransientResponse, index_summary,
    parse_summary_envelope,
};
use super::store::{ConversationStore, DEFAULT_TTL};
use crate::api::retry::{RetryConfig, retry_completion};
use crate::document::{DocumentSource, segment, unknown_source_refs};
use crate::error::{SumciteError, SumciteResult};
use crate::{CompletionClient, ContentPart, ImageRef, Message};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ── Config ─────────────────────────────────────────────────────────

/// Engine-level knobs: the record TTL and the completion retry policy.
/// Explicitly constructed and passed in — no process-wide defaults.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Idle-expiry TTL applied on every write-back.
    pub ttl: Duration,
    /// Retry budget for the completion+parse step.
    pub retry: RetryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            retry: RetryConfig::default(),
        }
    }
}

// ── Engine ─────────────────────────────────────────────────────────

/// The conversation protocol engine.
///
/// Borrows its collaborators — the completion capability and the
/// conversation store — by reference; both must outlive the engine. The
/// document and artifact sources are per-call seams (only NEW turns need
/// them).
pub struct SummaryEngine<'a, C, S> {
    pub(crate) client: &'a C,
    pub(crate) store: &'a S,
    pub(crate) config: EngineConfig,
}

impl<'a, C: CompletionClient, S: ConversationStore> SummaryEngine<'a, C, S> {
    pub fn new(client: &'a C, store: &'a S, config: EngineConfig) -> Self {
        Self {
            client,
            store,
            config,
        }
    }

    /// Run one single-document summary turn.
    pub async fn generate<D: DocumentSource>(
        &self,
        documents: &D,
        request: &SummaryRequest,
    ) -> SumciteResult<SummaryResponse> {
        request.validate()?;

        let mut conversation = match &request.conversation_id {
            None => {
                let paragraphs = documents.paragraphs(&request.document_id)?;
                let blocks = segment(&paragraphs);
                let context = DocumentContext::from_blocks(&request.document_id, &blocks);
                let messages = vec![
                    Message::system(SUMMARY_SYSTEM_PROMPT),
                    Message::user(original_article_message(&context.markdown)),
                ];
                let conversation = Conversation::new(
                    Uuid::new_v4().to_string(),
                    ConversationContext::Document(context),
                    messages,
                );
                info!(
                    "new conversation {} for document {} ({} blocks)",
                    conversation.id,
                    request.document_id,
                    blocks.len()
                );
                conversation
            }
            Some(id) => self
                .store
                .get(id)?
                .ok_or_else(|| SumciteError::UnknownConversation(id.clone()))?,
        };

        let source = match &conversation.context {
            ConversationContext::Document(context) => context.source.clone(),
            _ => {
                return Err(SumciteError::Validation(format!(
                    "conversation {} is not a single-document conversation",
                    conversation.id
                )));
            }
        };

        let user_text = wrap_user_prompt(
            request.prompt_type,
            &request.prompt,
            request.source_target_text.as_deref(),
            request.summary_target_text.as_deref(),
        );

        // Trial message list — the stored record stays untouched until the
        // completion+parse step fully succeeds.
        let mut messages = conversation.messages.clone();
        messages.push(Message::user(user_text));

        let (raw, envelope) = self.complete_summary_turn(&messages).await?;
        let summary = index_summary(envelope);

        let cited = summary
            .iter()
            .flat_map(|block| block.sources.iter().map(String::as_str));
        let unknown = unknown_source_refs(cited, &source);
        if !unknown.is_empty() {
            warn!(
                "conversation {}: summary cites unknown source blocks {:?}",
                conversation.id, unknown
            );
        }

        messages.push(Message::assistant(raw));
        conversation.messages = messages;
        conversation.touch();
        self.store
            .set(&conversation.id, &conversation, self.config.ttl)?;

        debug!(
            "conversation {}: turn complete, {} summary blocks, {} messages",
            conversation.id,
            summary.len(),
            conversation.messages.len()
        );

        Ok(SummaryResponse {
            conversation_id: conversation.id,
            summary,
            source,
        })
    }

    /// Run one email-style rewrite turn (no document context, free-text
    /// assistant output).
    pub async fn rewrite_email(&self, request: &RewriteRequest) -> SumciteResult<TransientResponse> {
        if request.prompt.trim().is_empty() {
            return Err(SumciteError::Validation("prompt is required".to_string()));
        }
        let conversation =
            self.load_or_new_transient(request.conversation_id.as_deref(), EMAIL_REWRITE_SYSTEM_PROMPT)?;
        self.run_transient_turn(conversation, Message::user(&request.prompt))
            .await
    }

    /// Run one chart-explanation turn. The first turn carries the chart as
    /// a multimodal image part; follow-ups rely on the history.
    pub async fn explain_chart(&self, request: &ChartRequest) -> SumciteResult<TransientResponse> {
        if request.prompt.trim().is_empty() {
            return Err(SumciteError::Validation("prompt is required".to_string()));
        }

        let is_new = request.conversation_id.is_none();
        let conversation = self.load_or_new_transient(
            request.conversation_id.as_deref(),
            CHART_EXPLANATION_SYSTEM_PROMPT,
        )?;

        let image_url = request
            .image_url
            .as_deref()
            .filter(|url| !url.trim().is_empty());
        if is_new && image_url.is_none() {
            return Err(SumciteError::Validation(
                "imageUrl is required on the first chart turn".to_string(),
            ));
        }

        let user = match image_url {
            Some(url) => Message::user_parts(vec![
                ContentPart::Text {
                    text: request.prompt.clone(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageRef { url: url.into() },
                },
            ]),
            None => Message::user(&request.prompt),
        };

        self.run_transient_turn(conversation, user).await
    }

    // ── Shared mechanics ───────────────────────────────────────────

    /// Completion + envelope parse as one retryable unit.
    pub(crate) async fn complete_summary_turn(
        &self,
        messages: &[Message],
    ) -> SumciteResult<(String, SummaryEnvelope)> {
        retry_completion(&self.config.retry, || async move {
            let raw = self.client.complete(messages).await?;
            let envelope = parse_summary_envelope(&raw)?;
            Ok((raw, envelope))
        })
        .await
    }

    fn load_or_new_transient(
        &self,
        conversation_id: Option<&str>,
        system_prompt: &str,
    ) -> SumciteResult<Conversation> {
        match conversation_id {
            None => Ok(Conversation::new(
                Uuid::new_v4().to_string(),
                ConversationContext::Transient,
                vec![Message::system(system_prompt)],
            )),
            Some(id) => {
                let conversation = self
                    .store
                    .get(id)?
                    .ok_or_else(|| SumciteError::UnknownConversation(id.to_string()))?;
                if conversation.context != ConversationContext::Transient {
                    return Err(SumciteError::Validation(format!(
                        "conversation {id} is not a transient conversation"
                    )));
                }
                Ok(conversation)
            }
        }
    }

    async fn run_transient_turn(
        &self,
        mut conversation: Conversation,
        user: Message,
    ) -> SumciteResult<TransientResponse> {
        let mut messages = conversation.messages.clone();
        messages.push(user);

        let content = {
            let history: &[Message] = &messages;
            retry_completion(&self.config.retry, || async move {
                self.client.complete(history).await
            })
            .await?
        };

        messages.push(Message::assistant(content.clone()));
        conversation.messages = messages;
        conversation.touch();
        self.store
            .set(&conversation.id, &conversation, self.config.ttl)?;

        Ok(TransientResponse {
            conversation_id: conversation.id,
            content,
        })
    }
}
