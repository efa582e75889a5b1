//! The multi-document aggregator.
//!
//! A meta-conversation summarizes several per-document conversations at
//! once. On NEW, each input document's pregenerated summary artifact is
//! loaded (no fresh model call per document), a synthetic child
//! conversation is built from it — system prompt, rendered source context,
//! and an assistant turn pre-seeded with the artifact's summary JSON — and
//! persisted immediately under a fresh child ID, so later per-document
//! follow-ups can target it directly. The meta record keeps only the
//! document IDs and child IDs, not the documents.
//!
//! On ACTIVE, the meta history is truncated back to the system prompt and
//! rebuilt from each child's *latest* assistant message before the turn is
//! appended. The rebuild makes meta-summary generation idempotent with
//! respect to how many times the children were edited — at the cost of
//! discarding the meta-conversation's own earlier turns.
//!
//! Documents are iterated strictly in the order `documentIds` was supplied;
//! that order determines the 1-based index each document is tagged with in
//! the meta context, on NEW and on every rebuild.

use super::artifact::ArtifactSource;
use super::prompts::{
    GLOBAL_SUMMARY_SYSTEM_PROMPT, SUMMARY_SYSTEM_PROMPT, original_article_message,
    tagged_document_summary, wrap_user_prompt,
};
use super::records::{
    Conversation, ConversationContext, DocumentContext, IndividualDocument, MultiSummaryRequest,
    MultiSummaryResponse, SummaryBlock, SummaryEnvelope, index_summary, parse_summary_envelope,
};
use super::store::ConversationStore;
use super::turn::SummaryEngine;
use crate::error::{SumciteError, SumciteResult};
use crate::{CompletionClient, Message};
use tracing::{debug, info};
use uuid::Uuid;

impl<'a, C: CompletionClient, S: ConversationStore> SummaryEngine<'a, C, S> {
    /// Run one multi-document summary turn.
    pub async fn generate_multi<A: ArtifactSource>(
        &self,
        artifacts: &A,
        request: &MultiSummaryRequest,
    ) -> SumciteResult<MultiSummaryResponse> {
        request.validate()?;

        let (mut meta, individual) = match &request.conversation_id {
            None => self.seed_meta_conversation(artifacts, &request.document_ids)?,
            Some(id) => {
                let meta = self
                    .store
                    .get(id)?
                    .ok_or_else(|| SumciteError::UnknownConversation(id.clone()))?;
                self.rebuild_meta_context(meta)?
            }
        };

        let user_text = wrap_user_prompt(
            request.prompt_type,
            &request.prompt,
            request.source_target_text.as_deref(),
            request.summary_target_text.as_deref(),
        );

        let mut messages = meta.messages.clone();
        messages.push(Message::user(user_text));

        let (raw, envelope) = self.complete_summary_turn(&messages).await?;
        let summary = index_summary(envelope);

        messages.push(Message::assistant(raw));
        meta.messages = messages;
        meta.touch();
        self.store.set(&meta.id, &meta, self.config.ttl)?;

        debug!(
            "meta conversation {}: turn complete, {} summary blocks over {} documents",
            meta.id,
            summary.len(),
            individual.len()
        );

        Ok(MultiSummaryResponse {
            conversation_id: meta.id,
            summary,
            individual_documents: individual,
        })
    }

    /// NEW path: persist one child conversation per document (in input
    /// order) and build the meta record over them.
    fn seed_meta_conversation<A: ArtifactSource>(
        &self,
        artifacts: &A,
        document_ids: &[String],
    ) -> SumciteResult<(Conversation, Vec<IndividualDocument>)> {
        let mut child_ids = Vec::with_capacity(document_ids.len());
        let mut individual = Vec::with_capacity(document_ids.len());
        let mut tagged_summaries = Vec::with_capacity(document_ids.len());

        for (position, document_id) in document_ids.iter().enumerate() {
            let artifact = artifacts.load(document_id)?;
            let markdown = crate::document::render_entries(&artifact.source);
            let envelope = SummaryEnvelope {
                summary: artifact.summary.clone(),
            };
            let seeded_json = serde_json::to_string(&envelope)?;

            let child = Conversation::new(
                Uuid::new_v4().to_string(),
                ConversationContext::Document(DocumentContext {
                    document_id: document_id.clone(),
                    source: artifact.source.clone(),
                    markdown: markdown.clone(),
                }),
                vec![
                    Message::system(SUMMARY_SYSTEM_PROMPT),
                    Message::user(original_article_message(&markdown)),
                    Message::assistant(seeded_json),
                ],
            );
            self.store.set(&child.id, &child, self.config.ttl)?;

            let summary = index_summary(envelope);
            tagged_summaries.push(tagged_document_summary(
                position + 1,
                &summary_text(&summary),
            ));
            individual.push(IndividualDocument {
                conversation_id: child.id.clone(),
                summary,
                source: artifact.source,
            });
            child_ids.push(child.id);
        }

        let meta = Conversation::new(
            Uuid::new_v4().to_string(),
            ConversationContext::MultiDocument {
                document_ids: document_ids.to_vec(),
                child_ids,
            },
            vec![
                Message::system(GLOBAL_SUMMARY_SYSTEM_PROMPT),
                Message::user(tagged_summaries.join("\n\n")),
            ],
        );
        info!(
            "new meta conversation {} over {} documents",
            meta.id,
            document_ids.len()
        );

        Ok((meta, individual))
    }

    /// ACTIVE path: discard everything after the system prompt and rebuild
    /// the source context from each child's latest assistant message.
    fn rebuild_meta_context(
        &self,
        mut meta: Conversation,
    ) -> SumciteResult<(Conversation, Vec<IndividualDocument>)> {
        let child_ids = match &meta.context {
            ConversationContext::MultiDocument { child_ids, .. } => child_ids.clone(),
            _ => {
                return Err(SumciteError::Validation(format!(
                    "conversation {} is not a multi-document conversation",
                    meta.id
                )));
            }
        };

        let mut individual = Vec::with_capacity(child_ids.len());
        let mut tagged_summaries = Vec::with_capacity(child_ids.len());

        for (position, child_id) in child_ids.iter().enumerate() {
            let child = self
                .store
                .get(child_id)?
                .ok_or_else(|| SumciteError::UnknownConversation(child_id.clone()))?;

            let latest = child.last_assistant_text().ok_or_else(|| {
                SumciteError::Store(format!(
                    "child conversation {child_id} has no assistant message"
                ))
            })?;
            let summary = index_summary(parse_summary_envelope(latest)?);
            tagged_summaries.push(tagged_document_summary(
                position + 1,
                &summary_text(&summary),
            ));

            let source = match child.context {
                ConversationContext::Document(context) => context.source,
                _ => {
                    return Err(SumciteError::Store(format!(
                        "child conversation {child_id} has no document context"
                    )));
                }
            };
            individual.push(IndividualDocument {
                conversation_id: child_id.clone(),
                summary,
                source,
            });
        }

        meta.messages.truncate(1);
        meta.messages.push(Message::user(tagged_summaries.join("\n\n")));

        Ok((meta, individual))
    }
}

/// Flatten a summary's block texts into the per-document context line(s).
fn summary_text(summary: &[SummaryBlock]) -> String {
    summary
        .iter()
        .map(|block| block.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::retry::RetryConfig;
    use crate::document::SourceEntry;
    use crate::engine::artifact::{MemoryArtifactSource, SummaryArtifact};
    use crate::engine::records::{PromptType, RawSummaryBlock, SummaryRequest};
    use crate::engine::store::{DEFAULT_TTL, MemoryConversationStore};
    use crate::engine::turn::EngineConfig;
    use crate::{MessageRole, ScriptedClient};
    use std::time::Duration;

    fn fast_config() -> EngineConfig {
        EngineConfig {
            ttl: DEFAULT_TTL,
            retry: RetryConfig {
                max_attempts: 2,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
                multiplier: 1.0,
            },
        }
    }

    fn artifact(text: &str, source_id: &str, source_text: &str) -> SummaryArtifact {
        SummaryArtifact {
            summary: vec![RawSummaryBlock {
                text: text.into(),
                sources: vec![source_id.into()],
            }],
            source: vec![SourceEntry {
                id: source_id.into(),
                text: source_text.into(),
            }],
        }
    }

    fn sample_artifacts() -> MemoryArtifactSource {
        MemoryArtifactSource::new()
            .insert("d1", artifact("Doc one covers revenue.", "S2", "Revenue grew."))
            .insert("d2", artifact("Doc two covers costs.", "S3", "Costs fell."))
    }

    fn envelope_json(text: &str) -> String {
        serde_json::json!({ "summary": [{"text": text, "sources": ["S2", "S3"]}] }).to_string()
    }

    fn multi_request(conversation_id: Option<&str>) -> MultiSummaryRequest {
        MultiSummaryRequest {
            conversation_id: conversation_id.map(String::from),
            document_ids: vec!["d1".into(), "d2".into()],
            prompt_type: PromptType::General,
            source_target_text: None,
            summary_target_text: None,
            prompt: "Combine".into(),
        }
    }

    #[tokio::test]
    async fn new_meta_turn_seeds_children_in_order() {
        let client = ScriptedClient::new(vec![envelope_json("Both documents agree.")]);
        let store = MemoryConversationStore::new();
        let engine = SummaryEngine::new(&client, &store, fast_config());

        let response = engine
            .generate_multi(&sample_artifacts(), &multi_request(None))
            .await
            .unwrap();

        assert!(Uuid::parse_str(&response.conversation_id).is_ok());
        assert_eq!(response.individual_documents.len(), 2);

        // Two distinct children plus the meta record.
        let c1 = &response.individual_documents[0].conversation_id;
        let c2 = &response.individual_documents[1].conversation_id;
        assert_ne!(c1, c2);
        assert_eq!(store.len(), 3);

        // Children are pre-seeded: [system, article, assistant].
        let child = store.get(c1).unwrap().unwrap();
        assert_eq!(child.messages.len(), 3);
        assert_eq!(child.messages[2].role, MessageRole::Assistant);

        // Meta context references documents and children in input order.
        let meta = store.get(&response.conversation_id).unwrap().unwrap();
        match &meta.context {
            ConversationContext::MultiDocument {
                document_ids,
                child_ids,
            } => {
                assert_eq!(document_ids, &vec!["d1".to_string(), "d2".to_string()]);
                assert_eq!(child_ids, &vec![c1.clone(), c2.clone()]);
            }
            _ => panic!("meta conversation should have multi-document context"),
        }

        // The meta user message tags both summaries 1 and 2 in input order.
        let context_text = meta.messages[1].text().unwrap();
        let first = context_text.find("Document 1:").unwrap();
        let second = context_text.find("Document 2:").unwrap();
        assert!(first < second);
        assert!(context_text.contains("Doc one covers revenue."));
        assert!(context_text.contains("Doc two covers costs."));
    }

    #[tokio::test]
    async fn active_meta_turn_rebuilds_from_latest_child_state() {
        let client = ScriptedClient::new(vec![
            envelope_json("Both documents agree."),
            // Single-document follow-up against child 1.
            serde_json::json!({ "summary": [{"text": "Doc one, revised.", "sources": ["S2"]}] })
                .to_string(),
            envelope_json("Combined, after revision."),
        ]);
        let store = MemoryConversationStore::new();
        let engine = SummaryEngine::new(&client, &store, fast_config());
        let artifacts = sample_artifacts();

        let first = engine
            .generate_multi(&artifacts, &multi_request(None))
            .await
            .unwrap();
        let child_id = first.individual_documents[0].conversation_id.clone();

        // Edit child 1 through the single-document path.
        let documents = crate::document::MemoryDocumentSource::new();
        engine
            .generate(
                &documents,
                &SummaryRequest {
                    conversation_id: Some(child_id.clone()),
                    document_id: "d1".into(),
                    prompt_type: PromptType::General,
                    source_target_text: None,
                    summary_target_text: None,
                    prompt: "Revise".into(),
                },
            )
            .await
            .unwrap();

        // ACTIVE meta turn sees the revised child summary.
        let second = engine
            .generate_multi(&artifacts, &multi_request(Some(&first.conversation_id)))
            .await
            .unwrap();
        assert_eq!(second.conversation_id, first.conversation_id);
        assert_eq!(
            second.individual_documents[0].summary[0].text,
            "Doc one, revised."
        );

        let meta = store.get(&first.conversation_id).unwrap().unwrap();
        let context_text = meta.messages[1].text().unwrap();
        assert!(context_text.contains("Doc one, revised."));
        assert!(!context_text.contains("Doc one covers revenue."));

        // Rebuild-then-append: earlier meta turns were discarded, so the
        // history is [system, context, prompt, assistant] again.
        assert_eq!(meta.messages.len(), 4);
    }

    #[tokio::test]
    async fn missing_artifact_aborts_before_any_model_call() {
        let client = ScriptedClient::new(vec![envelope_json("unused")]);
        let store = MemoryConversationStore::new();
        let engine = SummaryEngine::new(&client, &store, fast_config());

        let artifacts = MemoryArtifactSource::new().insert(
            "d1",
            artifact("Doc one covers revenue.", "S2", "Revenue grew."),
        );
        let result = engine
            .generate_multi(&artifacts, &multi_request(None))
            .await;
        assert!(matches!(result, Err(SumciteError::Artifact(_))));
        assert_eq!(client.remaining(), 1);
    }

    #[tokio::test]
    async fn retry_recovers_from_one_bad_completion() {
        let client = ScriptedClient::new(vec![
            "no json here".to_string(),
            envelope_json("Recovered combination."),
        ]);
        let store = MemoryConversationStore::new();
        let engine = SummaryEngine::new(&client, &store, fast_config());

        let response = engine
            .generate_multi(&sample_artifacts(), &multi_request(None))
            .await
            .unwrap();
        assert_eq!(response.summary[0].text, "Recovered combination.");
    }

    #[tokio::test]
    async fn exhausted_retries_surface_error_and_skip_meta_write() {
        let client = ScriptedClient::new(vec!["bad".to_string(), "worse".to_string()]);
        let store = MemoryConversationStore::new();
        let engine = SummaryEngine::new(&client, &store, fast_config());

        let result = engine
            .generate_multi(&sample_artifacts(), &multi_request(None))
            .await;
        assert!(matches!(result, Err(SumciteError::ModelOutput(_))));

        // Children were persisted before the turn (the documented NEW-path
        // behavior), but no meta record exists.
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn unknown_meta_conversation_errors() {
        let client = ScriptedClient::new(vec![envelope_json("unused")]);
        let store = MemoryConversationStore::new();
        let engine = SummaryEngine::new(&client, &store, fast_config());

        let result = engine
            .generate_multi(&sample_artifacts(), &multi_request(Some("missing")))
            .await;
        assert!(matches!(result, Err(SumciteError::UnknownConversation(_))));
    }

    #[test]
    fn summary_text_joins_block_texts() {
        let blocks = vec![
            SummaryBlock {
                id: "1".into(),
                text: "First.".into(),
                sources: vec![],
            },
            SummaryBlock {
                id: "2".into(),
                text: "Second.".into(),
                sources: vec![],
            },
        ];
        assert_eq!(summary_text(&blocks), "First.\nSecond.");
    }
}
