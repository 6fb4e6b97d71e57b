//! The completion contract consumed by callers.
//!
//! A completion is stateless: one prompt in, one text out. Conversation
//! continuity is not part of the contract.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error_handler::AiLlmError;

/// Raw model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
}

impl Completion {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Anything that can answer a prompt with a given model.
///
/// Implemented by [`crate::LlmService`]; tests provide scripted implementations.
pub trait LlmClient: Send + Sync {
    /// Sends `prompt` to `model` and returns the answer text.
    fn complete(
        &self,
        prompt: &str,
        model: &str,
    ) -> impl Future<Output = Result<Completion, AiLlmError>> + Send;
}

impl<T: LlmClient> LlmClient for Arc<T> {
    fn complete(
        &self,
        prompt: &str,
        model: &str,
    ) -> impl Future<Output = Result<Completion, AiLlmError>> + Send {
        (**self).complete(prompt, model)
    }
}
