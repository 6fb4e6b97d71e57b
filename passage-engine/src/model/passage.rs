use serde::{Deserialize, Serialize};

use crate::model::ids::{CodeId, PassageId};

/// Row-separator sentinel terminating every logical row of row-structured sources.
pub const ROW_SEPARATOR: char = '\u{1E}';

/// Proposed sub-span of an unhighlighted passage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightSuggestion {
    /// Exact text of the proposed span.
    pub passage: String,
    /// Byte offset of `passage` inside the owning passage's text.
    pub start_index: usize,
    /// Candidate codes, most relevant first.
    pub codes: Vec<String>,
}

impl HighlightSuggestion {
    /// Byte offset just past the suggested span.
    pub fn end_index(&self) -> usize {
        self.start_index + self.passage.len()
    }
}

/// Variant-specific payload of a passage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PassageState {
    Unhighlighted {
        next_highlight_suggestion: Option<HighlightSuggestion>,
    },
    Highlighted {
        code_ids: Vec<CodeId>,
        code_suggestions: Vec<String>,
        autocomplete_suggestion: String,
    },
}

/// Contiguous span of the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub(crate) id: PassageId,
    pub(crate) order: usize,
    pub(crate) text: String,
    #[serde(flatten)]
    pub(crate) state: PassageState,
}

impl Passage {
    pub(crate) fn unhighlighted(id: PassageId, order: usize, text: impl Into<String>) -> Self {
        Self {
            id,
            order,
            text: text.into(),
            state: PassageState::Unhighlighted {
                next_highlight_suggestion: None,
            },
        }
    }

    pub(crate) fn highlighted(
        id: PassageId,
        order: usize,
        text: impl Into<String>,
        code_id: CodeId,
        code_suggestions: Vec<String>,
    ) -> Self {
        Self {
            id,
            order,
            text: text.into(),
            state: PassageState::Highlighted {
                code_ids: vec![code_id],
                code_suggestions,
                autocomplete_suggestion: String::new(),
            },
        }
    }

    pub fn id(&self) -> PassageId {
        self.id
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn state(&self) -> &PassageState {
        &self.state
    }

    pub fn is_highlighted(&self) -> bool {
        matches!(self.state, PassageState::Highlighted { .. })
    }

    /// Codes attached to the passage; empty for unhighlighted passages.
    pub fn code_ids(&self) -> &[CodeId] {
        match &self.state {
            PassageState::Highlighted { code_ids, .. } => code_ids,
            PassageState::Unhighlighted { .. } => &[],
        }
    }

    pub fn code_suggestions(&self) -> &[String] {
        match &self.state {
            PassageState::Highlighted {
                code_suggestions, ..
            } => code_suggestions,
            PassageState::Unhighlighted { .. } => &[],
        }
    }

    /// `None` for unhighlighted passages.
    pub fn autocomplete_suggestion(&self) -> Option<&str> {
        match &self.state {
            PassageState::Highlighted {
                autocomplete_suggestion,
                ..
            } => Some(autocomplete_suggestion),
            PassageState::Unhighlighted { .. } => None,
        }
    }

    pub fn next_highlight_suggestion(&self) -> Option<&HighlightSuggestion> {
        match &self.state {
            PassageState::Unhighlighted {
                next_highlight_suggestion,
            } => next_highlight_suggestion.as_ref(),
            PassageState::Highlighted { .. } => None,
        }
    }

    /// True when the text, ignoring trailing whitespace, closes a row.
    pub fn ends_row(&self) -> bool {
        self.text.trim_end().ends_with(ROW_SEPARATOR)
    }

    pub(crate) fn demote(&mut self) {
        self.state = PassageState::Unhighlighted {
            next_highlight_suggestion: None,
        };
    }

    /// Replaces the stored highlight suggestion. No-op on highlighted passages.
    pub(crate) fn set_next_highlight_suggestion(&mut self, value: Option<HighlightSuggestion>) {
        if let PassageState::Unhighlighted {
            next_highlight_suggestion,
        } = &mut self.state
        {
            *next_highlight_suggestion = value;
        }
    }

    /// Replaces code suggestions. No-op on unhighlighted passages.
    pub(crate) fn set_code_suggestions(&mut self, value: Vec<String>) {
        if let PassageState::Highlighted {
            code_suggestions, ..
        } = &mut self.state
        {
            *code_suggestions = value;
        }
    }

    /// Replaces the autocomplete suggestion. No-op on unhighlighted passages.
    pub(crate) fn set_autocomplete_suggestion(&mut self, value: String) {
        if let PassageState::Highlighted {
            autocomplete_suggestion,
            ..
        } = &mut self.state
        {
            *autocomplete_suggestion = value;
        }
    }

    pub(crate) fn code_ids_mut(&mut self) -> Option<&mut Vec<CodeId>> {
        match &mut self.state {
            PassageState::Highlighted { code_ids, .. } => Some(code_ids),
            PassageState::Unhighlighted { .. } => None,
        }
    }
}
