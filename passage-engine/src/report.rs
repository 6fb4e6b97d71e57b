//! Export of coding results.

use std::collections::HashMap;

use serde::Serialize;

use crate::context::ContextBuilder;
use crate::model::{CodingSession, ROW_SEPARATOR};

/// One highlighted passage with its context and labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodedPassage {
    /// Passage inside its surrounding text, row separators removed.
    pub context: String,
    pub passage: String,
    /// Distinct labels joined with `"; "`.
    pub codes: String,
}

/// Every highlighted passage in document order.
pub fn coded_passages(
    session: &CodingSession,
    cut_window_chars: usize,
    preceding_words: usize,
    trailing_words: usize,
) -> Vec<CodedPassage> {
    let builder = ContextBuilder::new(session.source_kind(), cut_window_chars);
    session
        .passages()
        .iter()
        .filter(|p| p.is_highlighted())
        .map(|p| {
            let ctx = builder.surrounding(p, session.passages(), preceding_words, trailing_words);
            let mut labels: Vec<&str> = Vec::new();
            for label in session.codes_of(p.id()) {
                let label = label.trim();
                if !labels.contains(&label) {
                    labels.push(label);
                }
            }
            CodedPassage {
                context: strip_separator(&ctx.joined()),
                passage: strip_separator(p.text()),
                codes: labels.join("; "),
            }
        })
        .collect()
}

/// `(label, uses)` sorted by uses, then label.
pub fn code_frequencies(session: &CodingSession) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for code in session.codes() {
        let label = code.code.trim();
        if !label.is_empty() {
            *counts.entry(label).or_default() += 1;
        }
    }
    let mut out: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(label, n)| (label.to_string(), n))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

/// `Context,Passage,Codes` with every field quoted.
pub fn to_csv(rows: &[CodedPassage]) -> String {
    let mut out = String::from("Context,Passage,Codes\n");
    for r in rows {
        out.push_str(&format!(
            "{},{},{}\n",
            quote(&r.context),
            quote(&r.passage),
            quote(&r.codes)
        ));
    }
    out
}

/// `Code,Count` from [`code_frequencies`].
pub fn codebook_csv(frequencies: &[(String, usize)]) -> String {
    let mut out = String::from("Code,Count\n");
    for (label, n) in frequencies {
        out.push_str(&format!("{},{n}\n", quote(label)));
    }
    out
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn strip_separator(s: &str) -> String {
    s.replace(ROW_SEPARATOR, "")
}
