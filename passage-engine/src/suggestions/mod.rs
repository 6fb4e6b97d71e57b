//! AI suggestions: what to highlight next and how to code it.
//!
//! [`SuggestionOrchestrator`] is the entry point. The submodules hold the
//! prompt builders, answer validation and the concurrency primitives it uses.

mod codes;
pub mod generation;
mod highlight;
pub mod matching;
pub mod orchestrator;
pub mod prompts;
pub mod queue;
mod transport;
pub mod validate;

pub use orchestrator::{InputOutcome, SuggestionOrchestrator};
pub use prompts::{DefaultPrompts, PromptSettings, PromptTemplates};
