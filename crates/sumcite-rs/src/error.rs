//! Error taxonomy for the summarization engine.
//!
//! Every failure a turn can hit maps to one variant, so callers (the CLI,
//! the web adapter) can distinguish caller mistakes from upstream trouble:
//!
//! - [`Validation`](SumciteError::Validation) — malformed request fields.
//!   No state is mutated and no completion call is made.
//! - [`UnknownConversation`](SumciteError::UnknownConversation) — a turn
//!   referenced a conversation that is absent from the store (never created,
//!   or expired). Never silently treated as a new conversation.
//! - [`ModelOutput`](SumciteError::ModelOutput) — the assistant's content
//!   did not parse as the required summary JSON envelope. Fatal for the
//!   turn after the retry budget is exhausted.
//! - [`Upstream`](SumciteError::Upstream) — transport/HTTP failure talking
//!   to the completion capability. Retried like malformed output.

use thiserror::Error;

/// Errors surfaced by the summarization engine and its collaborators.
#[derive(Error, Debug)]
pub enum SumciteError {
    /// A request field is missing or inconsistent (e.g. a source-scoped
    /// prompt without `sourceTargetText`).
    #[error("invalid request: {0}")]
    Validation(String),

    /// A follow-up turn referenced a conversation the store doesn't hold.
    #[error("unknown or expired conversation: {0}")]
    UnknownConversation(String),

    /// The assistant's content was not a valid summary JSON envelope.
    #[error("model output invalid: {0}")]
    ModelOutput(String),

    /// The completion request itself failed (network, HTTP status, empty
    /// response body).
    #[error("completion request failed: {0}")]
    Upstream(String),

    /// The conversation store misbehaved or holds a corrupted record.
    #[error("conversation store error: {0}")]
    Store(String),

    /// The document source could not produce the requested document.
    #[error("document source error: {0}")]
    DocumentSource(String),

    /// A pregenerated summary artifact was missing or unreadable.
    #[error("summary artifact error: {0}")]
    Artifact(String),

    /// Serialization of an internal record failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SumciteError {
    /// Whether a retry of the completion+parse step can plausibly fix this.
    ///
    /// Only upstream transport failures and malformed model output are
    /// retryable — everything else is deterministic and would fail again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SumciteError::Upstream(_) | SumciteError::ModelOutput(_)
        )
    }
}

/// Result alias used throughout the crate.
pub type SumciteResult<T> = Result<T, SumciteError>;
