//! Highlight-suggestion fetch: prompt, validate, retry, locate.

use ai_llm_service::LlmClient;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::context::HighlightSearchContext;
use crate::errors::SuggestionError;
use crate::model::{HighlightSuggestion, PassageId};
use crate::suggestions::prompts::{HighlightPrompt, PromptTemplates, highlight_amendment};
use crate::suggestions::transport::complete_text;
use crate::suggestions::validate::{HighlightAnswer, parse_highlight_response};

/// Everything a highlight fetch needs, copied out of the session.
#[derive(Debug, Clone)]
pub(crate) struct HighlightJob {
    pub row_structured: bool,
    pub context: HighlightSearchContext,
    /// The start passage and its unhighlighted successors, in order.
    pub tail: Vec<(PassageId, String)>,
    /// Byte offset in the first tail passage where the search begins.
    pub search_start: usize,
    pub codebook: Vec<String>,
}

/// A validated suggestion and the passage it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LocatedSuggestion {
    pub passage_id: PassageId,
    pub suggestion: HighlightSuggestion,
}

/// Runs up to `highlight_max_attempts` attempts, amending the prompt with the
/// previous rejection. Returns `None` when the model found nothing, when every
/// attempt was rejected, or on a transport failure.
pub(crate) async fn fetch_highlight<L, P>(
    llm: &L,
    prompts: &P,
    cfg: &EngineConfig,
    job: &HighlightJob,
) -> Option<LocatedSuggestion>
where
    L: LlmClient,
    P: PromptTemplates,
{
    let base = prompts.highlight(&HighlightPrompt {
        row_structured: job.row_structured,
        preceding_text: &job.context.preceding_text,
        search_area: &job.context.search_area,
        codebook: &job.codebook,
    });

    let mut amendment = String::new();
    for attempt in 1..=cfg.highlight_max_attempts {
        let prompt = format!("{base}{amendment}");
        let raw = match complete_text(llm, &prompt, &cfg.highlight_model, cfg).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(attempt, error = %e, "highlight fetch failed; not retrying");
                return None;
            }
        };

        let outcome = parse_highlight_response(&raw, &job.context.search_area, job.row_structured)
            .and_then(|answer| locate(job, answer));
        match outcome {
            Ok(found) => {
                debug!(attempt, found = found.is_some(), "highlight answer accepted");
                return found;
            }
            Err(e) => {
                warn!(attempt, error = %e, "highlight answer rejected");
                amendment = highlight_amendment(&e.to_string());
            }
        }
    }

    warn!(
        attempts = cfg.highlight_max_attempts,
        "no valid highlight suggestion; giving up"
    );
    None
}

/// Finds the first tail passage containing the answer, by order.
fn locate(
    job: &HighlightJob,
    answer: HighlightAnswer,
) -> Result<Option<LocatedSuggestion>, SuggestionError> {
    if answer.is_empty() {
        return Ok(None);
    }
    for (i, (id, text)) in job.tail.iter().enumerate() {
        let from = if i == 0 { job.search_start } else { 0 };
        let Some(haystack) = text.get(from..) else {
            continue;
        };
        if let Some(idx) = haystack.find(&answer.passage) {
            return Ok(Some(LocatedSuggestion {
                passage_id: *id,
                suggestion: HighlightSuggestion {
                    passage: answer.passage,
                    start_index: from + idx,
                    codes: answer.codes,
                },
            }));
        }
    }
    Err(SuggestionError::format(
        "Suggested passage is not a substring of the search area.",
    ))
}
