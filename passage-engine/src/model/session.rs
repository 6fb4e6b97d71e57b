//! The coding session: owner of passages, codes, ids and the codebook.
//!
//! Passages are stored sorted by `order`, and `order` always equals the
//! position in the list once an operation returns.

use std::collections::HashSet;

use serde::Serialize;

use crate::errors::StructuralError;
use crate::model::code::Code;
use crate::model::codebook::Codebook;
use crate::model::ids::{CodeId, IdAllocator, PassageId};
use crate::model::passage::{Passage, ROW_SEPARATOR};

/// Shape of the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceKind {
    /// Free text; context may flow across the whole document.
    PlainText,
    /// One row per cell, each terminated by [`ROW_SEPARATOR`]; rows are hard boundaries.
    RowStructured,
}

#[derive(Debug, Clone)]
pub struct CodingSession {
    pub(crate) passages: Vec<Passage>,
    pub(crate) codes: Vec<Code>,
    pub(crate) ids: IdAllocator,
    pub(crate) source: SourceKind,
    pub(crate) codebook: Codebook,
    pub(crate) active_code: Option<CodeId>,
}

impl CodingSession {
    /// One unhighlighted passage covering the whole text.
    pub fn from_text(text: impl Into<String>) -> Self {
        let mut ids = IdAllocator::new();
        let passages = vec![Passage::unhighlighted(ids.passage(), 0, text)];
        Self::with_passages(passages, ids, SourceKind::PlainText)
    }

    /// One passage per non-empty cell, trimmed and terminated by the row separator.
    pub fn from_rows<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ids = IdAllocator::new();
        let passages = cells
            .into_iter()
            .filter_map(|cell| {
                let cell = cell.as_ref().trim();
                (!cell.is_empty()).then(|| format!("{cell}{ROW_SEPARATOR}"))
            })
            .enumerate()
            .map(|(order, text)| Passage::unhighlighted(ids.passage(), order, text))
            .collect();
        Self::with_passages(passages, ids, SourceKind::RowStructured)
    }

    fn with_passages(passages: Vec<Passage>, ids: IdAllocator, source: SourceKind) -> Self {
        Self {
            passages,
            codes: Vec::new(),
            ids,
            source,
            codebook: Codebook::default(),
            active_code: None,
        }
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source
    }

    pub fn is_row_structured(&self) -> bool {
        self.source == SourceKind::RowStructured
    }

    /// Passages sorted by order.
    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    pub fn passage(&self, id: PassageId) -> Option<&Passage> {
        self.passages.iter().find(|p| p.id == id)
    }

    pub(crate) fn passage_mut(&mut self, id: PassageId) -> Option<&mut Passage> {
        self.passages.iter_mut().find(|p| p.id == id)
    }

    pub(crate) fn position(&self, id: PassageId) -> Option<usize> {
        self.passages.iter().position(|p| p.id == id)
    }

    pub fn codes(&self) -> &[Code] {
        &self.codes
    }

    pub fn code(&self, id: CodeId) -> Option<&Code> {
        self.codes.iter().find(|c| c.id == id)
    }

    /// Non-empty labels of a passage, in attachment order.
    pub fn codes_of(&self, passage_id: PassageId) -> Vec<&str> {
        let Some(passage) = self.passage(passage_id) else {
            return Vec::new();
        };
        passage
            .code_ids()
            .iter()
            .filter_map(|id| self.code(*id))
            .map(|c| c.code.as_str())
            .filter(|c| !c.trim().is_empty())
            .collect()
    }

    pub fn codebook(&self) -> &Codebook {
        &self.codebook
    }

    /// Adds externally supplied labels to the codebook's imported set.
    pub fn import_codes<I, S>(&mut self, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.codebook.import(labels);
    }

    /// Codebook plus imported labels, sorted.
    pub fn prompt_codebook(&self) -> Vec<String> {
        self.codebook.prompt_entries()
    }

    pub(crate) fn refresh_codebook(&mut self) {
        self.codebook.refresh(&self.codes);
    }

    pub fn active_code(&self) -> Option<CodeId> {
        self.active_code
    }

    /// Selects the code being edited.
    pub fn activate_code(&mut self, id: CodeId) -> Result<PassageId, StructuralError> {
        let code = self.code(id).ok_or(StructuralError::UnknownCode(id))?;
        let passage_id = code.passage_id;
        self.active_code = Some(id);
        Ok(passage_id)
    }

    pub fn clear_active_code(&mut self) {
        self.active_code = None;
    }

    /// Concatenation of all passages in order.
    pub fn document_text(&self) -> String {
        self.passages.iter().map(|p| p.text.as_str()).collect()
    }

    /// Sorts by order and renumbers to `0..N-1`.
    pub(crate) fn redensify(&mut self) {
        self.passages.sort_by_key(|p| p.order);
        for (i, p) in self.passages.iter_mut().enumerate() {
            p.order = i;
        }
    }

    /// Verifies dense order, variant/field agreement and code back-references.
    pub fn check_invariants(&self) -> Result<(), StructuralError> {
        let corrupted = |msg: String| Err(StructuralError::Corrupted(msg));

        let mut seen_passages = HashSet::new();
        for (i, p) in self.passages.iter().enumerate() {
            if p.order != i {
                return corrupted(format!("{} has order {} at position {i}", p.id, p.order));
            }
            if !seen_passages.insert(p.id) {
                return corrupted(format!("{} appears twice", p.id));
            }
            for code_id in p.code_ids() {
                match self.code(*code_id) {
                    Some(c) if c.passage_id == p.id => {}
                    Some(c) => {
                        return corrupted(format!("{code_id} points to {} not {}", c.passage_id, p.id));
                    }
                    None => return corrupted(format!("{} lists missing {code_id}", p.id)),
                }
            }
        }

        let mut seen_codes = HashSet::new();
        for c in &self.codes {
            if !seen_codes.insert(c.id) {
                return corrupted(format!("{} appears twice", c.id));
            }
            match self.passage(c.passage_id) {
                Some(p) if p.code_ids().contains(&c.id) => {}
                Some(p) => return corrupted(format!("{} is not listed on {}", c.id, p.id)),
                None => return corrupted(format!("{} owned by missing {}", c.id, c.passage_id)),
            }
        }

        if let Some(active) = self.active_code {
            if self.code(active).is_none() {
                return corrupted(format!("active {active} does not exist"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_text_is_a_single_passage() {
        let s = CodingSession::from_text("Alice said hi.");
        assert_eq!(s.passages().len(), 1);
        assert_eq!(s.document_text(), "Alice said hi.");
        assert_eq!(s.source_kind(), SourceKind::PlainText);
        s.check_invariants().unwrap();
    }

    #[test]
    fn from_rows_trims_terminates_and_skips_empty_cells() {
        let s = CodingSession::from_rows(["  a,b ", "", "   ", "c,d"]);
        let texts: Vec<_> = s.passages().iter().map(|p| p.text()).collect();
        assert_eq!(texts, vec!["a,b\u{1E}", "c,d\u{1E}"]);
        assert!(s.is_row_structured());
        assert!(s.passages().iter().all(Passage::ends_row));
        s.check_invariants().unwrap();
    }

    #[test]
    fn activate_unknown_code_fails() {
        let mut s = CodingSession::from_text("x");
        let mut other = IdAllocator::new();
        let missing = other.code();
        assert_eq!(
            s.activate_code(missing),
            Err(StructuralError::UnknownCode(missing))
        );
        assert_eq!(s.active_code(), None);
    }
}
