//! Context around passages for prompts and exports.
//!
//! Plain text flows across the whole document. Row-structured text is cut at
//! the nearest row separator on each side; the text-window cut is only used
//! when no separator bounds that side.

use serde::Serialize;

use crate::errors::StructuralError;
use crate::model::{Passage, ROW_SEPARATOR, SourceKind};
use crate::text_window::{head, tail};

/// Share of the search-area word count used as preceding text.
const PRECEDING_SHARE: f64 = 0.2;

/// A passage with the text before and after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurroundingContext {
    pub preceding: String,
    pub passage_text: String,
    pub trailing: String,
}

impl SurroundingContext {
    /// `preceding + passage + trailing`.
    pub fn joined(&self) -> String {
        format!("{}{}{}", self.preceding, self.passage_text, self.trailing)
    }
}

/// Input of a highlight-suggestion request.
///
/// `preceding_text` is for orientation only; suggestions must come from `search_area`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSearchContext {
    pub preceding_text: String,
    pub search_area: String,
}

/// Builds prompt context for one source kind.
#[derive(Debug, Clone, Copy)]
pub struct ContextBuilder {
    source: SourceKind,
    window_chars: usize,
}

impl ContextBuilder {
    pub fn new(source: SourceKind, window_chars: usize) -> Self {
        Self {
            source,
            window_chars,
        }
    }

    fn row_structured(&self) -> bool {
        self.source == SourceKind::RowStructured
    }

    /// Text before and after `passage`.
    ///
    /// `all` must be sorted by order.
    pub fn surrounding(
        &self,
        passage: &Passage,
        all: &[Passage],
        min_preceding: usize,
        min_trailing: usize,
    ) -> SurroundingContext {
        let before = concat(all.iter().filter(|p| p.order < passage.order));
        let after = concat(all.iter().filter(|p| p.order > passage.order));

        let (preceding, trailing) = if self.row_structured() {
            let trailing = if passage.ends_row() {
                String::new()
            } else {
                self.row_trailing(&after, min_trailing)
            };
            (self.row_preceding(&before, min_preceding), trailing)
        } else {
            (
                tail(&before, min_preceding, self.window_chars),
                head(&after, min_trailing, self.window_chars),
            )
        };

        SurroundingContext {
            preceding,
            passage_text: passage.text.clone(),
            trailing,
        }
    }

    /// Search area for the next highlight suggestion.
    ///
    /// Starts at `search_start` (byte offset) inside `start` and runs through the
    /// following passages up to, not including, the first highlighted one.
    ///
    /// # Errors
    /// [`StructuralError::InvalidOffsets`] when `search_start` is past the end
    /// or not on a character boundary.
    pub fn highlight_search(
        &self,
        start: &Passage,
        all: &[Passage],
        search_start: usize,
        min_search_words: usize,
    ) -> Result<HighlightSearchContext, StructuralError> {
        let text = start.text.as_str();
        if !text.is_char_boundary(search_start) {
            return Err(StructuralError::InvalidOffsets {
                start: search_start,
                end: search_start,
                len: text.len(),
            });
        }
        let (start_before, start_after) = text.split_at(search_start);

        let min_preceding = (min_search_words as f64 * PRECEDING_SHARE).floor() as usize;

        let following = all
            .iter()
            .filter(|p| p.order > start.order)
            .take_while(|p| !p.is_highlighted());
        let search_area = format!("{start_after}{}", concat(following));

        let before = concat(all.iter().filter(|p| p.order < start.order));
        let preceding_text = if self.row_structured() {
            format!("{}{start_before}", self.row_preceding(&before, min_preceding))
        } else {
            tail(&format!("{before}{start_before}"), min_preceding, self.window_chars)
        };

        Ok(HighlightSearchContext {
            preceding_text,
            search_area: head(&search_area, min_search_words, self.window_chars),
        })
    }

    /// Rest of the current row before a passage.
    fn row_preceding(&self, before: &str, min_words: usize) -> String {
        match before.rfind(ROW_SEPARATOR) {
            Some(idx) => before[idx + ROW_SEPARATOR.len_utf8()..].to_string(),
            None => tail(before, min_words, self.window_chars),
        }
    }

    /// Rest of the current row after a passage, without the separator.
    fn row_trailing(&self, after: &str, min_words: usize) -> String {
        match after.find(ROW_SEPARATOR) {
            Some(idx) => after[..idx].to_string(),
            None => head(after, min_words, self.window_chars),
        }
    }
}

fn concat<'a>(passages: impl Iterator<Item = &'a Passage>) -> String {
    passages.map(|p| p.text.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CodingSession;

    fn plain() -> ContextBuilder {
        ContextBuilder::new(SourceKind::PlainText, 200)
    }

    fn rows() -> ContextBuilder {
        ContextBuilder::new(SourceKind::RowStructured, 200)
    }

    #[test]
    fn plain_context_spans_neighbours() {
        let mut s = CodingSession::from_text("Alice said the process was slow. Bob agreed.");
        let first = s.passages()[0].id();
        let id = s.create_span(first, 11, 31, vec![]).unwrap();
        let p = s.passage(id).unwrap();

        let ctx = plain().surrounding(p, s.passages(), 30, 15);
        assert_eq!(ctx.preceding, "Alice said ");
        assert_eq!(ctx.passage_text, "the process was slow");
        assert_eq!(ctx.trailing, ". Bob agreed.");
        assert_eq!(ctx.joined(), s.document_text());
    }

    #[test]
    fn row_context_never_crosses_the_separator() {
        let mut s = CodingSession::from_rows(["a,b", "c,d", "e,f"]);
        let second = s.passages()[1].id();
        // "c,d\u{1E}" -> "c" | ",d\u{1E}"
        let c = s.create_span(second, 0, 1, vec![]).unwrap();
        let p = s.passage(c).unwrap();

        let ctx = rows().surrounding(p, s.passages(), 30, 15);
        assert_eq!(ctx.preceding, "");
        assert_eq!(ctx.passage_text, "c");
        assert_eq!(ctx.trailing, ",d");
    }

    #[test]
    fn row_context_is_empty_after_a_row_end() {
        let mut s = CodingSession::from_rows(["a,b", "c,d"]);
        let first = s.passages()[0].id();
        // highlight ",b\u{1E}"
        let id = s.create_span(first, 1, 4, vec![]).unwrap();
        let p = s.passage(id).unwrap();

        let ctx = rows().surrounding(p, s.passages(), 30, 15);
        assert_eq!(ctx.preceding, "a");
        assert_eq!(ctx.trailing, "");
    }

    #[test]
    fn search_area_stops_before_next_highlight() {
        let mut s = CodingSession::from_text("one two three four five six seven");
        let first = s.passages()[0].id();
        s.create_span(first, 14, 18, vec![]).unwrap(); // "four"
        let start = &s.passages()[0];

        let ctx = plain()
            .highlight_search(start, s.passages(), 4, 350)
            .unwrap();
        assert_eq!(ctx.preceding_text, "one ");
        assert_eq!(ctx.search_area, "two three ");
    }

    #[test]
    fn search_area_runs_through_unhighlighted_rows() {
        let s = CodingSession::from_rows(["a,b", "c,d"]);
        let ctx = rows()
            .highlight_search(&s.passages()[0], s.passages(), 2, 350)
            .unwrap();
        assert_eq!(ctx.preceding_text, "a,");
        assert_eq!(ctx.search_area, "b\u{1E}c,d\u{1E}");
    }

    #[test]
    fn search_start_must_be_a_char_boundary() {
        let s = CodingSession::from_text("äb");
        let err = plain()
            .highlight_search(&s.passages()[0], s.passages(), 1, 10)
            .unwrap_err();
        assert!(matches!(err, StructuralError::InvalidOffsets { .. }));
    }

    #[test]
    fn preceding_text_is_capped_to_a_fifth_of_the_search_words() {
        let words: Vec<String> = (0..100).map(|i| format!("w{i}")).collect();
        let text = words.join(" ");
        let s = CodingSession::from_text(text.clone());
        let start = text.find("w90").unwrap();

        let ctx = ContextBuilder::new(SourceKind::PlainText, 0)
            .highlight_search(&s.passages()[0], s.passages(), start, 10)
            .unwrap();
        // 10 * 0.2 = 2 words plus the truncation marker
        assert_eq!(ctx.preceding_text, "...w88 w89 ");
        assert_eq!(ctx.search_area, "w90 w91 w92 w93 w94 w95 w96 w97 w98 w99");
    }
}
