//! Stateless LLM completion collaborator.
//!
//! One call, one answer: [`LlmClient::complete`] sends a prompt to a model
//! and returns its text. [`LlmService`] implements it over OpenAI or Ollama,
//! configured from the environment (see [`config::default_config`]).

pub mod completion;
pub mod config;
pub mod error_handler;
pub mod llm_service;
pub mod services;
pub mod telemetry;

pub use completion::{Completion, LlmClient};
pub use error_handler::{AiLlmError, Result};
pub use llm_service::LlmService;
