//! Prompt builders for the three suggestion kinds.
//!
//! Wording is not part of any contract; only the response formats asked for
//! here are relied upon by [`crate::suggestions::validate`].

use crate::model::ROW_SEPARATOR;

/// Research framing shared by every prompt.
#[derive(Debug, Clone, Default)]
pub struct PromptSettings {
    pub research_questions: String,
    pub context_info: String,
    pub coding_guidelines: String,
    pub highlight_guidelines: String,
}

/// Input of a highlight-suggestion prompt.
#[derive(Debug, Clone, Copy)]
pub struct HighlightPrompt<'a> {
    pub row_structured: bool,
    pub preceding_text: &'a str,
    pub search_area: &'a str,
    pub codebook: &'a [String],
}

/// Input of a code-suggestion prompt.
#[derive(Debug, Clone, Copy)]
pub struct CodePrompt<'a> {
    pub row_structured: bool,
    pub preceding_text: &'a str,
    pub passage_text: &'a str,
    pub existing_codes: &'a [String],
    pub codebook: &'a [String],
}

/// Input of an autocomplete prompt.
#[derive(Debug, Clone, Copy)]
pub struct AutocompletePrompt<'a> {
    pub code: CodePrompt<'a>,
    pub current_input: &'a str,
}

/// Builds the text sent to the completion backend.
pub trait PromptTemplates: Send + Sync {
    fn highlight(&self, req: &HighlightPrompt<'_>) -> String;
    fn code_suggestions(&self, req: &CodePrompt<'_>) -> String;
    fn autocomplete(&self, req: &AutocompletePrompt<'_>) -> String;
}

/// Appended to a highlight prompt after a rejected answer.
pub fn highlight_amendment(error: &str) -> String {
    format!(
        "\n\n## IMPORTANT NOTE\nThe previous answer was rejected with this error; do not repeat it.\nERROR MESSAGE: {error}\n"
    )
}

/// Appended to a code-suggestion prompt after an unparsable answer.
pub const CODES_AMENDMENT: &str = "\n\n## ADDITIONAL NOTE\nRespond ONLY with a JSON array of code strings. Nothing else. No explanations.";

/// Appended to an autocomplete prompt after an invalid answer.
pub const AUTOCOMPLETE_AMENDMENT: &str = "\n\n## ADDITIONAL NOTE\nThe previous answer failed validation. Respond ONLY with a single code string. Nothing else. No explanations.";

/// Compact prompts built from [`PromptSettings`].
#[derive(Debug, Clone, Default)]
pub struct DefaultPrompts {
    pub settings: PromptSettings,
}

impl DefaultPrompts {
    pub fn new(settings: PromptSettings) -> Self {
        Self { settings }
    }

    fn research_block(&self, row_structured: bool) -> String {
        let s = &self.settings;
        let mut out = format!(
            "## RESEARCH CONTEXT\nResearch questions: {}\nAdditional context: {}\n",
            or_dash(&s.research_questions),
            or_dash(&s.context_info)
        );
        if row_structured {
            out.push_str(&format!(
                "NOTE: the data comes from a table; every row ends with the token {}.\n",
                escaped_separator()
            ));
        }
        out
    }

    fn codebook_block(codebook: &[String]) -> String {
        if codebook.is_empty() {
            return "## CURRENT CODEBOOK\nNo codes in the codebook yet.\n".to_string();
        }
        let list = codebook
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        format!("## CURRENT CODEBOOK\n[{list}]\n")
    }

    fn target_block(req: &CodePrompt<'_>) -> String {
        let existing = if req.existing_codes.is_empty() {
            "No existing codes.".to_string()
        } else {
            format!("[{}]", req.existing_codes.join("; "))
        };
        format!(
            "## PRECEDING CONTEXT (never code this)\n\"{}\"\n\n## TARGET PASSAGE\n\"{}\"\n\n## EXISTING CODES OF THE TARGET PASSAGE\n{existing}\n",
            req.preceding_text, req.passage_text
        )
    }
}

impl PromptTemplates for DefaultPrompts {
    fn highlight(&self, req: &HighlightPrompt<'_>) -> String {
        let s = &self.settings;
        let mut out = String::new();
        out.push_str("## ROLE\nYou are a qualitative coding assistant. Find and code the FIRST passage of the SEARCH AREA that is relevant to the research context.\n\n");
        out.push_str(&format!(
            "## USER GUIDELINES\nCoding style: {}\nPassage selection: {}\n\n",
            or_dash(&s.coding_guidelines),
            or_dash(&s.highlight_guidelines)
        ));
        out.push_str(&self.research_block(req.row_structured));
        out.push_str("\n## TASK\n1. Pick the first sub-passage of the SEARCH AREA that helps answer a research question.\n2. Assign 1-5 codes, most relevant first.\n3. If nothing is codeable, return an empty passage and empty codes.\n");
        if req.row_structured {
            out.push_str(&format!(
                "4. The passage must stay inside one row: {} may only appear as its last character.\n",
                escaped_separator()
            ));
        }
        out.push_str("\n## RESPONSE FORMAT\nRespond ONLY with a JSON object:\n{\"passage\": \"exact, case-sensitive substring of the SEARCH AREA\", \"codes\": [\"code1\", \"code2\"]}\n- No markdown, no explanations, no truncation markers.\n- Codes must NOT contain semicolons (;).\n\n");
        out.push_str(&Self::codebook_block(req.codebook));
        out.push_str(&format!(
            "\n## PRECEDING TEXT (for understanding only)\n\"{}\"\n\n## SEARCH AREA (choose from here)\n\"{}\"\n",
            req.preceding_text, req.search_area
        ));
        out
    }

    fn code_suggestions(&self, req: &CodePrompt<'_>) -> String {
        let mut out = String::new();
        out.push_str("## ROLE\nYou are a qualitative coding assistant. Suggest codes for the TARGET PASSAGE.\n\n");
        out.push_str(&format!(
            "## USER GUIDELINES\n{}\n\n",
            or_none(&self.settings.coding_guidelines)
        ));
        out.push_str(&self.research_block(req.row_structured));
        out.push_str("\n## TASK\n- Without existing codes: suggest up to 5 distinct codes.\n- With existing codes: suggest at most 2 codes that add a materially new meaning, or none.\n- Never repeat an existing code. Order by relevance.\n\n## RESPONSE FORMAT\nRespond ONLY with a JSON array of code strings, e.g. [\"code1\", \"code2\"]. Codes must never contain semicolons (;).\n\n");
        out.push_str(&Self::codebook_block(req.codebook));
        out.push('\n');
        out.push_str(&Self::target_block(req));
        out
    }

    fn autocomplete(&self, req: &AutocompletePrompt<'_>) -> String {
        let mut out = String::new();
        out.push_str("## ROLE\nYou are a qualitative coding assistant completing a code the user is typing.\n\n");
        out.push_str(&format!(
            "## USER GUIDELINES\n{}\n\n",
            or_none(&self.settings.coding_guidelines)
        ));
        out.push_str(&self.research_block(req.code.row_structured));
        out.push_str("\n## TASK\nMinimally extend the CURRENT USER INPUT into a complete code for the TARGET PASSAGE. If it is already complete, return it unchanged.\n\n## OUTPUT FORMAT\nExactly one code string that starts with the CURRENT USER INPUT. No quotes, no markdown, no semicolons.\n\n");
        out.push_str(&Self::codebook_block(req.code.codebook));
        out.push('\n');
        out.push_str(&Self::target_block(&req.code));
        out.push_str(&format!(
            "\n## CURRENT USER INPUT\n\"{}\"\n",
            req.current_input
        ));
        out
    }
}

fn or_dash(s: &str) -> &str {
    if s.trim().is_empty() { "-" } else { s }
}

fn or_none(s: &str) -> &str {
    if s.trim().is_empty() { "None." } else { s }
}

fn escaped_separator() -> String {
    format!("\\u{:04X}", ROW_SEPARATOR as u32)
}
