use serde::{Deserialize, Serialize};

use crate::model::ids::{CodeId, PassageId};

/// Label delimiter used when several codes are typed into one input.
pub const LABEL_DELIMITER: char = ';';

/// One label attached to exactly one passage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    pub id: CodeId,
    pub passage_id: PassageId,
    /// May be empty while the code is being typed.
    pub code: String,
}

/// Splits raw input on the label delimiter, trimming and dropping empty labels.
pub fn split_labels(raw: &str) -> Vec<String> {
    raw.split(LABEL_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_drops_blank_labels() {
        assert_eq!(split_labels(" slow ; ;delay;"), vec!["slow", "delay"]);
        assert!(split_labels(" ; ").is_empty());
    }
}
