//! Parsing and validation of model answers.
//!
//! Every rejection is a [`SuggestionError::ResponseFormat`] whose message is
//! sent back to the model on the next attempt.

use serde_json::Value;

use crate::errors::SuggestionError;
use crate::model::{LABEL_DELIMITER, ROW_SEPARATOR};

/// Highlight answer that passed validation. `passage` may be empty, meaning
/// the model found nothing to code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightAnswer {
    pub passage: String,
    pub codes: Vec<String>,
}

impl HighlightAnswer {
    pub fn is_empty(&self) -> bool {
        self.passage.trim().is_empty()
    }
}

/// Removes markdown fences and a BOM around a model answer.
pub fn strip_code_fence(raw: &str) -> &str {
    let s = raw.trim().trim_start_matches('\u{feff}').trim();
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // drop the info string ("json") up to the first line break
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest.trim_start_matches("json"),
    };
    body.trim_end().trim_end_matches("```").trim()
}

/// Parses and validates a highlight answer against the search area it was
/// generated from.
///
/// Raw row separators inside the JSON text are escaped before parsing, so the
/// model may echo them unescaped.
pub fn parse_highlight_response(
    raw: &str,
    search_area: &str,
    row_structured: bool,
) -> Result<HighlightAnswer, SuggestionError> {
    let body = strip_code_fence(raw);
    let escaped = body.replace(ROW_SEPARATOR, "\\u001E");

    let value: Value = serde_json::from_str(&escaped).map_err(|e| {
        SuggestionError::format(format!(
            "Response could not be parsed as JSON ({e}). Received response: {body}"
        ))
    })?;

    let shape_error = || {
        SuggestionError::format(format!(
            "Response does not match the required format. Received response: {body}"
        ))
    };
    let obj = value.as_object().ok_or_else(shape_error)?;
    if obj.len() != 2 {
        return Err(shape_error());
    }
    let passage = obj
        .get("passage")
        .and_then(Value::as_str)
        .ok_or_else(shape_error)?
        .to_string();
    let codes = obj
        .get("codes")
        .and_then(Value::as_array)
        .ok_or_else(shape_error)?
        .iter()
        .map(|c| c.as_str().map(|s| s.trim().to_string()))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(shape_error)?
        .into_iter()
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>();

    if !search_area.contains(passage.as_str()) {
        return Err(SuggestionError::format(
            "Suggested passage is not a substring of the search area.",
        ));
    }
    if codes.iter().any(|c| c.contains(LABEL_DELIMITER)) {
        return Err(SuggestionError::format(
            "One or more suggested codes contain a semicolon ';', which is forbidden.",
        ));
    }
    if !passage.trim().is_empty() && codes.is_empty() {
        return Err(SuggestionError::format(
            "Non-empty suggested passage must have at least one suggested code. Never leave the codes array empty when the passage field is non-empty.",
        ));
    }
    if row_structured {
        if let Some(idx) = passage.find(ROW_SEPARATOR) {
            if idx + ROW_SEPARATOR.len_utf8() != passage.len() {
                return Err(SuggestionError::format(
                    "Suggested passage spans multiple rows.",
                ));
            }
        }
        if passage.len() == ROW_SEPARATOR.len_utf8() && passage.starts_with(ROW_SEPARATOR) {
            return Err(SuggestionError::format(
                "Empty content (only the end-of-row marker).",
            ));
        }
    }

    Ok(HighlightAnswer { passage, codes })
}

/// Parses a JSON array of code strings. Blank entries and entries carrying the
/// label delimiter are dropped; duplicates keep their first position.
pub fn parse_code_suggestions(raw: &str) -> Result<Vec<String>, SuggestionError> {
    let body = strip_code_fence(raw);
    let values: Vec<Value> = serde_json::from_str(body).map_err(|_| {
        SuggestionError::format(format!("Expected a JSON array of strings. Received: {body}"))
    })?;

    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for v in values {
        let Some(code) = v.as_str().map(str::trim) else {
            return Err(SuggestionError::format("Array items must be strings."));
        };
        if code.is_empty() || code.contains(LABEL_DELIMITER) || out.iter().any(|c| c == code) {
            continue;
        }
        out.push(code.to_string());
    }
    Ok(out)
}

/// A completion must be a single non-empty label.
pub fn validate_autocomplete(raw: &str) -> Result<String, SuggestionError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(SuggestionError::format("Autocomplete answer is empty."));
    }
    if text.contains(LABEL_DELIMITER) {
        return Err(SuggestionError::format(
            "Autocomplete answer contains a semicolon ';'.",
        ));
    }
    Ok(text.to_string())
}
