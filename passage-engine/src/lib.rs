//! Passage segmentation and suggestion orchestration for qualitative coding.
//!
//! A [`CodingSession`] owns the passages covering a source text and the codes
//! attached to them. Highlighting splits a passage ([`CodingSession::create_span`]);
//! removing the last code merges it back ([`CodingSession::delete_code`]).
//! [`SuggestionOrchestrator`] wraps a session and keeps model suggestions for
//! the next highlight, for codes and for autocompletion up to date.
//!
//! # Example
//! ```
//! use passage_engine::CodingSession;
//!
//! let mut session = CodingSession::from_text("Alice said the process was slow. Bob agreed.");
//! let first = session.passages()[0].id();
//! let id = session.create_span(first, 11, 31, vec![]).unwrap();
//! assert_eq!(session.passage(id).unwrap().text(), "the process was slow");
//! assert_eq!(session.passages().len(), 3);
//! ```

mod code_manager;
pub mod config;
pub mod context;
pub mod errors;
pub mod model;
pub mod report;
pub mod segmenter;
pub mod suggestions;
pub mod telemetry;
pub mod text_window;

pub use config::EngineConfig;
pub use context::{ContextBuilder, HighlightSearchContext, SurroundingContext};
pub use errors::{EngineError, Result, StructuralError, SuggestionError};
pub use model::{
    Code, CodeId, CodingSession, HighlightSuggestion, Passage, PassageId, PassageState,
    ROW_SEPARATOR, SourceKind,
};
pub use segmenter::CodeRemoval;
pub use suggestions::{
    DefaultPrompts, InputOutcome, PromptSettings, PromptTemplates, SuggestionOrchestrator,
};
