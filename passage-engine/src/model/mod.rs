//! Passages, codes and the session that owns them.

pub mod code;
pub mod codebook;
pub mod ids;
pub mod passage;
pub mod session;

pub use code::{Code, LABEL_DELIMITER, split_labels};
pub use codebook::Codebook;
pub use ids::{CodeId, IdAllocator, PassageId};
pub use passage::{HighlightSuggestion, Passage, PassageState, ROW_SEPARATOR};
pub use session::{CodingSession, SourceKind};
