//! The conversation protocol engine.
//!
//! Everything between a caller's turn request and the persisted
//! conversation record lives here:
//!
//! - [`records`] — the typed records crossing the store boundary
//!   ([`Conversation`], [`DocumentContext`]) and the summary envelope the
//!   model must emit, with schema validation and per-turn re-indexing.
//! - [`store`] — the [`ConversationStore`] seam (opaque KV with TTL) and an
//!   in-memory last-write-wins implementation.
//! - [`prompts`] — the system prompts and per-turn user-message wrapping.
//! - [`turn`] — [`SummaryEngine`]: the single-document NEW/ACTIVE turn
//!   protocol, plus the transient email-rewrite and chart-explanation
//!   flows.
//! - [`aggregate`] — the multi-document aggregator: child conversations
//!   seeded from pregenerated artifacts and the rebuild-then-append
//!   meta-conversation protocol.
//! - [`artifact`] — the read-only pregenerated-summary collaborator.

pub mod aggregate;
pub mod artifact;
pub mod prompts;
pub mod records;
pub mod store;
pub mod turn;

pub use artifact::{ArtifactSource, FileArtifactSource, MemoryArtifactSource, SummaryArtifact};
pub use records::{
    ChartRequest, Conversation, ConversationContext, DocumentContext, IndividualDocument,
    MultiSummaryRequest, MultiSummaryResponse, PromptType, RawSummaryBlock, RewriteRequest,
    SummaryBlock, SummaryEnvelope, SummaryRequest, SummaryResponse, TransientResponse,
    index_summary, parse_summary_envelope,
};
pub use store::{ConversationStore, MemoryConversationStore};
pub use turn::{EngineConfig, SummaryEngine};
