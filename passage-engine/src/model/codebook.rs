use std::collections::BTreeSet;

use crate::model::code::Code;

/// Distinct labels currently in use, plus imported labels that are not.
///
/// The in-use set is derived from the code list and never edited directly.
#[derive(Debug, Clone, Default)]
pub struct Codebook {
    in_use: BTreeSet<String>,
    imported: BTreeSet<String>,
}

impl Codebook {
    /// Recomputes the in-use set from `codes`. Imports that became in use are dropped.
    pub(crate) fn refresh(&mut self, codes: &[Code]) {
        self.in_use = codes
            .iter()
            .map(|c| c.code.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        let in_use = &self.in_use;
        self.imported.retain(|c| !in_use.contains(c));
    }

    /// Tracks external labels; labels already in use are ignored.
    pub(crate) fn import<I, S>(&mut self, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for label in labels {
            let label = label.as_ref().trim();
            if !label.is_empty() && !self.in_use.contains(label) {
                self.imported.insert(label.to_string());
            }
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.in_use.iter().map(String::as_str)
    }

    pub fn imported(&self) -> impl Iterator<Item = &str> {
        self.imported.iter().map(String::as_str)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.in_use.contains(label)
    }

    pub fn len(&self) -> usize {
        self.in_use.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_use.is_empty()
    }

    /// In-use and imported labels, sorted, for prompts.
    pub fn prompt_entries(&self) -> Vec<String> {
        self.in_use.union(&self.imported).cloned().collect()
    }
}
