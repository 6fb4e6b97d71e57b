//! Code-suggestion and autocomplete fetches.
//!
//! Both get one stricter retry on a malformed answer and then degrade to an
//! empty result.

use ai_llm_service::LlmClient;
use tracing::warn;

use crate::config::EngineConfig;
use crate::suggestions::prompts::{
    AUTOCOMPLETE_AMENDMENT, AutocompletePrompt, CODES_AMENDMENT, CodePrompt, PromptTemplates,
};
use crate::suggestions::transport::complete_text;
use crate::suggestions::validate::{parse_code_suggestions, validate_autocomplete};

const ATTEMPTS: usize = 2;

/// Prompt input for a highlighted passage, copied out of the session.
#[derive(Debug, Clone)]
pub(crate) struct CodeJob {
    pub row_structured: bool,
    pub preceding_text: String,
    pub passage_text: String,
    pub existing_codes: Vec<String>,
    pub codebook: Vec<String>,
}

impl CodeJob {
    fn prompt(&self) -> CodePrompt<'_> {
        CodePrompt {
            row_structured: self.row_structured,
            preceding_text: &self.preceding_text,
            passage_text: &self.passage_text,
            existing_codes: &self.existing_codes,
            codebook: &self.codebook,
        }
    }
}

/// `None` on a transport failure, so the caller keeps what it has.
pub(crate) async fn fetch_code_suggestions<L, P>(
    llm: &L,
    prompts: &P,
    cfg: &EngineConfig,
    job: &CodeJob,
) -> Option<Vec<String>>
where
    L: LlmClient,
    P: PromptTemplates,
{
    let base = prompts.code_suggestions(&job.prompt());
    let mut prompt = base.clone();
    for attempt in 1..=ATTEMPTS {
        let raw = match complete_text(llm, &prompt, &cfg.code_model, cfg).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(attempt, error = %e, "code suggestion fetch failed");
                return None;
            }
        };
        match parse_code_suggestions(&raw) {
            Ok(codes) => return Some(codes),
            Err(e) => {
                warn!(attempt, error = %e, "code suggestion answer rejected");
                prompt = format!("{base}{CODES_AMENDMENT}");
            }
        }
    }
    Some(Vec::new())
}

/// Empty string when nothing valid came back.
pub(crate) async fn fetch_autocomplete<L, P>(
    llm: &L,
    prompts: &P,
    cfg: &EngineConfig,
    job: &CodeJob,
    current_input: &str,
) -> String
where
    L: LlmClient,
    P: PromptTemplates,
{
    let base = prompts.autocomplete(&AutocompletePrompt {
        code: job.prompt(),
        current_input,
    });
    let mut prompt = base.clone();
    for attempt in 1..=ATTEMPTS {
        let raw = match complete_text(llm, &prompt, &cfg.code_model, cfg).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(attempt, error = %e, "autocomplete fetch failed");
                return String::new();
            }
        };
        match validate_autocomplete(&raw) {
            Ok(text) => return text,
            Err(e) => {
                warn!(attempt, error = %e, answer = %raw, "autocomplete answer rejected");
                prompt = format!("{base}{AUTOCOMPLETE_AMENDMENT}");
            }
        }
    }
    String::new()
}
