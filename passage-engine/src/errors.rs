//! Error types for the passage engine.
//!
//! [`StructuralError`] is returned synchronously by every operation that
//! changes passage coverage. [`SuggestionError`] never leaves the suggestion
//! pipeline: it drives retries and is logged before degrading to an empty result.

use ai_llm_service::AiLlmError;
use thiserror::Error;

use crate::model::{CodeId, PassageId};

/// Unified result alias for the crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level error for `passage-engine`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Suggestion(#[from] SuggestionError),

    /// Invalid engine configuration.
    #[error("[Passage Engine] invalid configuration: {0}")]
    Config(String),
}

/// Rejected mutation of the passage list.
///
/// The session is left untouched whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    /// The span is not inside a single unhighlighted, code-less passage.
    #[error("[Passage Engine] span is not inside unhighlighted passage {0}")]
    Overlap(PassageId),

    /// The span is empty after trimming whitespace.
    #[error("[Passage Engine] span is empty after trimming")]
    EmptySpan,

    #[error("[Passage Engine] unknown passage {0}")]
    UnknownPassage(PassageId),

    #[error("[Passage Engine] unknown code {0}")]
    UnknownCode(CodeId),

    /// Offsets are reversed or not on a UTF-8 character boundary.
    #[error("[Passage Engine] invalid offsets {start}..{end} for text of {len} bytes")]
    InvalidOffsets { start: usize, end: usize, len: usize },

    /// The session no longer satisfies its coverage invariants.
    #[error("[Passage Engine] invariant violated: {0}")]
    Corrupted(String),
}

/// Failure inside a suggestion fetch.
#[derive(Debug, Error)]
pub enum SuggestionError {
    /// The model answer broke the response contract. The message is sent back
    /// to the model as the amendment of the next attempt.
    #[error("InvalidResponseFormatError: {0}")]
    ResponseFormat(String),

    /// Upstream refused the call because another one is still in flight.
    #[error("[Passage Engine] conflicting request in flight: {0}")]
    TransportConflict(#[source] AiLlmError),

    /// Any other transport or provider failure; not retried.
    #[error("[Passage Engine] completion failed: {0}")]
    Transport(#[source] AiLlmError),
}

impl SuggestionError {
    pub fn format(msg: impl Into<String>) -> Self {
        SuggestionError::ResponseFormat(msg.into())
    }
}

impl From<AiLlmError> for SuggestionError {
    fn from(err: AiLlmError) -> Self {
        if err.is_conflict() {
            SuggestionError::TransportConflict(err)
        } else {
            SuggestionError::Transport(err)
        }
    }
}
