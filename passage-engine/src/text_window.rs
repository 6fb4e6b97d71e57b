//! Boundary-respecting text windows.
//!
//! [`tail`] keeps the end of a text and [`head`] its beginning. Both keep at
//! least `min_words` words and then look for a natural cut point (line break,
//! then sentence end) within `window_chars` characters past the word cut.
//! When no boundary is found the text is cut at the word boundary and marked
//! with [`TRUNCATION_MARKER`].
//!
//! Words are maximal runs of non-whitespace characters, for counting and for cutting.

/// Marker placed where text was cut without a natural boundary.
pub const TRUNCATION_MARKER: &str = "...";

const SENTENCE_ENDS: [&str; 3] = [". ", "! ", "? "];

/// Number of whitespace-separated words.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Byte ranges of every word in `text`.
fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                spans.push((s, i));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len()));
    }
    spans
}

/// Suffix of `text` holding at least `min_words` words.
///
/// Extends backwards to the nearest line break, else the nearest sentence end,
/// inside the `window_chars` characters before the word cut.
pub fn tail(text: &str, min_words: usize, window_chars: usize) -> String {
    let spans = word_spans(text);
    if spans.len() <= min_words {
        return text.to_string();
    }

    let cut = match min_words {
        0 => text.len(),
        n => spans[spans.len() - n].0,
    };
    let (before, included) = text.split_at(cut);

    // Start of data reached inside the window: everything fits.
    let before_chars = before.chars().count();
    if before_chars < window_chars {
        return text.to_string();
    }
    let window_start = before
        .char_indices()
        .nth(before_chars - window_chars)
        .map_or(before.len(), |(i, _)| i);
    let cut_window = &before[window_start..];

    if let Some(lb) = cut_window.rfind('\n') {
        return format!("{}{included}", &cut_window[lb + 1..]);
    }

    let sentence_end = SENTENCE_ENDS
        .iter()
        .filter_map(|pat| cut_window.rfind(pat))
        .max();
    if let Some(idx) = sentence_end {
        return format!("{}{included}", &cut_window[idx + 1..]);
    }

    format!("{TRUNCATION_MARKER}{included}")
}

/// Prefix of `text` holding at least `min_words` words.
///
/// Extends forward to the nearest line break (kept), else the nearest sentence
/// end, inside the `window_chars` characters after the word cut.
pub fn head(text: &str, min_words: usize, window_chars: usize) -> String {
    let spans = word_spans(text);
    if spans.len() <= min_words {
        return text.to_string();
    }

    let cut = match min_words {
        0 => 0,
        n => spans[n - 1].1,
    };
    let (included, rest) = text.split_at(cut);

    // End of data reached inside the window: everything fits.
    let rest_chars = rest.chars().count();
    if rest_chars < window_chars {
        return text.to_string();
    }
    let window_end = rest
        .char_indices()
        .nth(window_chars)
        .map_or(rest.len(), |(i, _)| i);
    let cut_window = &rest[..window_end];

    if let Some(lb) = cut_window.find('\n') {
        return format!("{included}{}", &cut_window[..=lb]);
    }

    // The earliest end wins; an ellipsis ends after its last dot.
    let sentence_end = SENTENCE_ENDS
        .iter()
        .filter_map(|pat| cut_window.find(pat))
        .min();
    if let Some(idx) = sentence_end {
        return format!("{included}{}", &cut_window[..idx + 1]);
    }

    format!("{included}{TRUNCATION_MARKER}")
}
