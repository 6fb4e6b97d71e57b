//! One completion call with the conflict retry class applied.

use ai_llm_service::LlmClient;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::errors::SuggestionError;

/// Calls the backend, retrying after `conflict_retry_delay` while it reports a
/// conflicting request in flight. Conflicts have their own budget and never
/// count as a failed attempt of the caller.
pub(crate) async fn complete_text<L: LlmClient>(
    llm: &L,
    prompt: &str,
    model: &str,
    cfg: &EngineConfig,
) -> Result<String, SuggestionError> {
    let mut conflicts = 0usize;
    loop {
        match llm.complete(prompt, model).await {
            Ok(completion) => {
                debug!(model, output_len = completion.text.len(), "completion ok");
                return Ok(completion.text);
            }
            Err(e) => match SuggestionError::from(e) {
                SuggestionError::TransportConflict(e) if conflicts < cfg.conflict_max_retries => {
                    conflicts += 1;
                    warn!(model, conflicts, error = %e, "conflicting request in flight; retrying");
                    tokio::time::sleep(cfg.conflict_retry_delay).await;
                }
                other => return Err(other),
            },
        }
    }
}
