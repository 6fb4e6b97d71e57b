//! Helpers deciding whether typed input still needs an autocomplete fetch.

use crate::model::{CodeId, CodingSession, LABEL_DELIMITER, split_labels};

/// Text after the last `;`, or the whole input. Not trimmed.
pub fn fragment_after_last_semicolon(input: &str) -> &str {
    match input.rfind(LABEL_DELIMITER) {
        Some(idx) => &input[idx + LABEL_DELIMITER.len_utf8()..],
        None => input,
    }
}

pub fn semicolon_count(input: &str) -> usize {
    input.matches(LABEL_DELIMITER).count()
}

/// Codes the passage already has from the point of view of `code_id`'s input:
/// the passage's other codes plus labels typed before the last `;`.
pub fn existing_codes_for_input(
    session: &CodingSession,
    code_id: CodeId,
    input: &str,
) -> Vec<String> {
    let Some(code) = session.code(code_id) else {
        return Vec::new();
    };
    let mut out: Vec<String> = Vec::new();
    let mut push = |label: &str| {
        if !label.is_empty() && !out.iter().any(|c| c == label) {
            out.push(label.to_string());
        }
    };

    for other in session.codes().iter().filter(|c| c.passage_id == code.passage_id && c.id != code_id) {
        push(other.code.trim());
    }
    if let Some(idx) = input.rfind(LABEL_DELIMITER) {
        for label in split_labels(&input[..idx]) {
            push(&label);
        }
    }
    out
}

/// True when one of `candidates` completes `fragment` (case-insensitive prefix)
/// and is not already part of the input.
pub fn has_completion<'a>(
    fragment: &str,
    input: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> bool {
    let fragment = fragment.trim_start().to_lowercase();
    let input = input.to_lowercase();
    candidates.into_iter().any(|c| {
        let c = c.to_lowercase();
        !c.trim().is_empty() && c.starts_with(&fragment) && !input.contains(c.trim())
    })
}
