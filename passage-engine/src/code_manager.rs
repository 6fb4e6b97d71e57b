//! Editing code labels after a passage has been highlighted.

use tracing::debug;

use crate::errors::StructuralError;
use crate::model::{Code, CodeId, CodingSession, PassageId, split_labels};

impl CodingSession {
    /// Commits raw label input for a code.
    ///
    /// The input is split on `;`. No labels deletes the code like
    /// [`CodingSession::delete_code`]. Otherwise the first label replaces the
    /// code's text and every further label becomes a new code on the same
    /// passage. Returns the affected passage, or `None` when the input holds a
    /// single label equal to the current one.
    ///
    /// # Errors
    /// [`StructuralError::UnknownCode`] if `code_id` does not exist.
    pub fn update_code(
        &mut self,
        code_id: CodeId,
        raw: &str,
    ) -> Result<Option<PassageId>, StructuralError> {
        let code = self.code(code_id).ok_or(StructuralError::UnknownCode(code_id))?;
        let passage_id = code.passage_id;
        let current = code.code.clone();
        let labels = split_labels(raw);

        match labels.as_slice() {
            [] => return self.delete_code(code_id).map(|r| Some(r.passage_id)),
            [only] if *only == current => return Ok(None),
            _ => {}
        }

        let passage = self
            .passage_mut(passage_id)
            .ok_or(StructuralError::UnknownPassage(passage_id))?;
        passage.set_autocomplete_suggestion(String::new());

        let mut labels = labels.into_iter();
        if let Some(first) = labels.next() {
            if let Some(code) = self.codes.iter_mut().find(|c| c.id == code_id) {
                code.code = first;
            }
        }

        let mut added = 0usize;
        for label in labels {
            let id = self.ids.code();
            self.codes.push(Code {
                id,
                passage_id,
                code: label,
            });
            if let Some(ids) = self.passage_mut(passage_id).and_then(|p| p.code_ids_mut()) {
                ids.push(id);
            }
            added += 1;
        }

        self.active_code = None;
        self.refresh_codebook();
        debug!(%code_id, %passage_id, added, "code updated");
        Ok(Some(passage_id))
    }

    /// Replaces `old` with `new` on every code carrying exactly that label.
    ///
    /// Returns the number of codes changed. A blank `new` changes nothing.
    pub fn rename_code_everywhere(&mut self, old: &str, new: &str) -> usize {
        let new = new.trim();
        if new.is_empty() || old == new {
            return 0;
        }
        let mut changed = 0;
        for code in self.codes.iter_mut().filter(|c| c.code == old) {
            code.code = new.to_string();
            changed += 1;
        }
        if changed > 0 {
            self.refresh_codebook();
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn highlighted(text: &str, start: usize, end: usize) -> (CodingSession, PassageId, CodeId) {
        let mut s = CodingSession::from_text(text);
        let first = s.passages()[0].id();
        let id = s.create_span(first, start, end, vec![]).unwrap();
        let code = s.passage(id).unwrap().code_ids()[0];
        (s, id, code)
    }

    #[test]
    fn first_label_replaces_and_the_rest_are_added() {
        let (mut s, id, code) = highlighted("it was slow", 7, 11);
        assert_eq!(s.update_code(code, " slow ;delay; ;bottleneck"), Ok(Some(id)));

        assert_eq!(s.codes_of(id), vec!["slow", "delay", "bottleneck"]);
        assert_eq!(s.code(code).unwrap().code, "slow");
        assert_eq!(s.active_code(), None);
        let entries: Vec<_> = s.codebook().entries().collect();
        assert_eq!(entries, vec!["bottleneck", "delay", "slow"]);
        s.check_invariants().unwrap();
    }

    #[test]
    fn unchanged_label_is_a_no_op() {
        let (mut s, _, code) = highlighted("it was slow", 7, 11);
        s.update_code(code, "slow").unwrap();
        assert_eq!(s.update_code(code, "  slow ; "), Ok(None));
        assert_eq!(s.codes().len(), 1);
    }

    #[test]
    fn empty_input_deletes_the_code() {
        let (mut s, _, code) = highlighted("it was slow", 7, 11);
        let merged = s.update_code(code, " ; ").unwrap().unwrap();
        assert!(s.codes().is_empty());
        assert_eq!(s.passages().len(), 1);
        assert_eq!(s.passages()[0].id(), merged);
        s.check_invariants().unwrap();
    }

    #[test]
    fn edit_resets_the_autocomplete_suggestion() {
        let (mut s, id, code) = highlighted("it was slow", 7, 11);
        s.passage_mut(id)
            .unwrap()
            .set_autocomplete_suggestion("slowness".into());
        s.update_code(code, "slow").unwrap();
        assert_eq!(s.passage(id).unwrap().autocomplete_suggestion(), Some(""));
    }

    #[test]
    fn rename_touches_every_matching_code() {
        let mut s = CodingSession::from_text("slow here and slow there");
        let first = s.passages()[0].id();
        let a = s.create_span(first, 0, 9, vec![]).unwrap();
        let code_a = s.passage(a).unwrap().code_ids()[0];
        s.update_code(code_a, "slow").unwrap();
        let rest = s.passages()[1].id();
        let b = s.create_span(rest, 5, 15, vec![]).unwrap();
        let code_b = s.passage(b).unwrap().code_ids()[0];
        s.update_code(code_b, "slow; other").unwrap();

        assert_eq!(s.rename_code_everywhere("slow", "delay"), 2);
        assert_eq!(s.codes_of(a), vec!["delay"]);
        assert_eq!(s.codes_of(b), vec!["delay", "other"]);
        assert_eq!(s.rename_code_everywhere("delay", "  "), 0);
        assert!(!s.codebook().contains("slow"));
    }

    #[test]
    fn unknown_code_is_rejected() {
        let mut s = CodingSession::from_text("x");
        let mut other = crate::model::IdAllocator::new();
        let missing = other.code();
        assert_eq!(
            s.update_code(missing, "a"),
            Err(StructuralError::UnknownCode(missing))
        );
    }
}
