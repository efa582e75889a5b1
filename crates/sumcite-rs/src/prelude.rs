//! Convenience re-exports for common `sumcite-rs` types.
//!
//! Meant to be glob-imported when embedding the engine:
//!
//! ```ignore
//! use sumcite_rs::prelude::*;
//! ```

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{
    CompletionClient, ContentPart, ImageRef, Message, MessageContent, MessageRole, OpenAiClient,
    ScriptedClient, SumciteError, SumciteResult,
};

// ── Engine ──────────────────────────────────────────────────────────
pub use crate::engine::{
    ArtifactSource, ChartRequest, Conversation, ConversationContext, ConversationStore,
    EngineConfig, FileArtifactSource, IndividualDocument, MemoryArtifactSource,
    MemoryConversationStore, MultiSummaryRequest, MultiSummaryResponse, PromptType,
    RewriteRequest, SummaryArtifact, SummaryBlock, SummaryEngine, SummaryRequest, SummaryResponse,
    TransientResponse,
};

// ── Documents ───────────────────────────────────────────────────────
pub use crate::document::{
    Block, BlockKind, DocumentSource, FileDocumentSource, MemoryDocumentSource, Paragraph,
    SourceEntry, segment,
};

// ── Retry ───────────────────────────────────────────────────────────
pub use crate::api::RetryConfig;
