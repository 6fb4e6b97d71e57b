//! Splitting passages on highlight and merging them back on code deletion.
//!
//! Both operations validate everything before touching the session, so a
//! returned [`StructuralError`] always leaves the passage list as it was.

use serde::Serialize;
use tracing::debug;

use crate::errors::StructuralError;
use crate::model::{Code, CodeId, CodingSession, Passage, PassageId};

/// Outcome of removing a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CodeRemoval {
    /// Passage now covering the region of the removed code.
    pub passage_id: PassageId,
    /// True when the passage lost its last code and became unhighlighted.
    pub demoted: bool,
}

impl CodingSession {
    /// Highlights `start..end` (byte offsets) of an unhighlighted passage.
    ///
    /// The span becomes its own highlighted passage with one new, empty code,
    /// which also becomes the active code. Text before and after the span stays
    /// unhighlighted in separate passages.
    ///
    /// # Errors
    /// - [`StructuralError::UnknownPassage`] if `source_id` does not exist
    /// - [`StructuralError::Overlap`] if the passage is highlighted or `end` is past its text
    /// - [`StructuralError::InvalidOffsets`] if `start > end` or an offset splits a character
    /// - [`StructuralError::EmptySpan`] if the span is blank
    pub fn create_span(
        &mut self,
        source_id: PassageId,
        start: usize,
        end: usize,
        initial_code_suggestions: Vec<String>,
    ) -> Result<PassageId, StructuralError> {
        let pos = self
            .position(source_id)
            .ok_or(StructuralError::UnknownPassage(source_id))?;
        let source = &self.passages[pos];
        if source.is_highlighted() || !source.code_ids().is_empty() {
            return Err(StructuralError::Overlap(source_id));
        }

        let text = source.text.as_str();
        let len = text.len();
        if start > end {
            return Err(StructuralError::InvalidOffsets { start, end, len });
        }
        if end > len {
            return Err(StructuralError::Overlap(source_id));
        }
        if !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            return Err(StructuralError::InvalidOffsets { start, end, len });
        }
        if text[start..end].trim().is_empty() {
            return Err(StructuralError::EmptySpan);
        }

        let before = text[..start].to_string();
        let span = text[start..end].to_string();
        let after = text[end..].to_string();
        let order = source.order;
        let code_id = self.ids.code();

        let highlighted_id = if before.is_empty() && after.is_empty() {
            let id = source_id;
            self.passages[pos] = Passage::highlighted(id, order, span, code_id, initial_code_suggestions);
            id
        } else {
            self.passages.remove(pos);

            let mut emitted = Vec::with_capacity(3);
            if !before.is_empty() {
                emitted.push(Passage::unhighlighted(self.ids.passage(), order, before));
            }
            let id = self.ids.passage();
            emitted.push(Passage::highlighted(
                id,
                order + emitted.len(),
                span,
                code_id,
                initial_code_suggestions,
            ));
            if !after.is_empty() {
                emitted.push(Passage::unhighlighted(self.ids.passage(), order + emitted.len(), after));
            }

            let shift = emitted.len() - 1;
            for p in self.passages.iter_mut().filter(|p| p.order > order) {
                p.order += shift;
            }
            self.passages.extend(emitted);
            self.redensify();
            id
        };

        self.codes.push(Code {
            id: code_id,
            passage_id: highlighted_id,
            code: String::new(),
        });
        self.active_code = Some(code_id);
        self.refresh_codebook();
        debug_assert!(self.check_invariants().is_ok());

        debug!(
            source = %source_id,
            passage_id = %highlighted_id,
            code_id = %code_id,
            passages = self.passages.len(),
            "span created"
        );
        Ok(highlighted_id)
    }

    /// Removes a code, demoting and merging its passage when it was the last one.
    ///
    /// An unhighlighted neighbour is merged unless a row separator lies between
    /// it and the passage. Without a merge the demoted passage keeps its id;
    /// a merge allocates a new id for the combined passage.
    ///
    /// # Errors
    /// [`StructuralError::UnknownCode`] if `code_id` does not exist.
    pub fn delete_code(&mut self, code_id: CodeId) -> Result<CodeRemoval, StructuralError> {
        let code_pos = self
            .codes
            .iter()
            .position(|c| c.id == code_id)
            .ok_or(StructuralError::UnknownCode(code_id))?;
        let passage_id = self.codes[code_pos].passage_id;
        let pos = self.position(passage_id).ok_or_else(|| {
            StructuralError::Corrupted(format!("{code_id} owned by missing {passage_id}"))
        })?;

        self.codes.remove(code_pos);
        self.active_code = None;

        let passage = &mut self.passages[pos];
        if let Some(ids) = passage.code_ids_mut() {
            ids.retain(|id| *id != code_id);
        }
        if !passage.code_ids().is_empty() {
            passage.set_autocomplete_suggestion(String::new());
            self.refresh_codebook();
            debug!(%code_id, %passage_id, "code removed; passage keeps other codes");
            return Ok(CodeRemoval {
                passage_id,
                demoted: false,
            });
        }

        let merge_prev = pos > 0 && {
            let prev = &self.passages[pos - 1];
            !prev.is_highlighted() && !prev.ends_row()
        };
        let merge_next = pos + 1 < self.passages.len() && {
            let next = &self.passages[pos + 1];
            !next.is_highlighted() && !self.passages[pos].ends_row()
        };

        let result_id = if !merge_prev && !merge_next {
            self.passages[pos].demote();
            passage_id
        } else {
            let first = if merge_prev { pos - 1 } else { pos };
            let last = if merge_next { pos + 1 } else { pos };
            let order = self.passages[first].order;
            let text: String = self
                .passages
                .drain(first..=last)
                .map(|p| p.text)
                .collect();
            let id = self.ids.passage();
            self.passages.push(Passage::unhighlighted(id, order, text));
            self.redensify();
            id
        };

        self.refresh_codebook();
        debug_assert!(self.check_invariants().is_ok());
        debug!(
            %code_id,
            passage_id = %result_id,
            merged_prev = merge_prev,
            merged_next = merge_next,
            "last code removed; passage demoted"
        );
        Ok(CodeRemoval {
            passage_id: result_id,
            demoted: true,
        })
    }
}
