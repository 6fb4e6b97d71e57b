//! Runtime configuration loaded from environment variables.

use std::time::Duration;

use crate::errors::EngineError;

/// Knobs of the suggestion pipeline. All fields have defaults via `from_env`.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// When false every suggestion fetch is a no-op.
    pub enabled: bool,

    pub highlight_model: String,
    pub code_model: String,

    // Context sizes, in words
    pub highlight_context_words: usize,
    pub code_context_words: usize,
    pub export_preceding_words: usize,
    pub export_trailing_words: usize,

    /// Characters searched past a word cut for a line break or sentence end.
    pub cut_window_chars: usize,

    // Retry budgets
    pub highlight_max_attempts: usize,
    pub conflict_max_retries: usize,
    pub conflict_retry_delay: Duration,

    /// Typing pause before an autocomplete fetch.
    pub autocomplete_quiet: Duration,
    /// Passages whose trimmed text is not longer than this are skipped when
    /// walking forward for a highlight suggestion.
    pub min_candidate_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            highlight_model: "gpt-5.1".into(),
            code_model: "gpt-4.1-mini".into(),
            highlight_context_words: 350,
            code_context_words: 30,
            export_preceding_words: 30,
            export_trailing_words: 15,
            cut_window_chars: 200,
            highlight_max_attempts: 2,
            conflict_max_retries: 3,
            conflict_retry_delay: Duration::from_millis(500),
            autocomplete_quiet: Duration::from_millis(1500),
            min_candidate_chars: 4,
        }
    }
}

impl EngineConfig {
    /// Build from environment variables, falling back to [`EngineConfig::default`]
    /// for anything unset or unparsable.
    ///
    /// # Example
    /// ```
    /// # use passage_engine::config::EngineConfig;
    /// let cfg = EngineConfig::from_env();
    /// assert!(cfg.highlight_max_attempts >= 1);
    /// ```
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            enabled: env("AI_SUGGESTIONS_ENABLED", "true") == "true",
            highlight_model: env("HIGHLIGHT_MODEL", &d.highlight_model),
            code_model: env("CODE_MODEL", &d.code_model),
            highlight_context_words: parse("HIGHLIGHT_CONTEXT_WORDS", d.highlight_context_words),
            code_context_words: parse("CODE_CONTEXT_WORDS", d.code_context_words),
            export_preceding_words: parse("EXPORT_PRECEDING_WORDS", d.export_preceding_words),
            export_trailing_words: parse("EXPORT_TRAILING_WORDS", d.export_trailing_words),
            cut_window_chars: parse("CUT_WINDOW_CHARS", d.cut_window_chars),
            highlight_max_attempts: parse("HIGHLIGHT_MAX_ATTEMPTS", d.highlight_max_attempts),
            conflict_max_retries: parse("CONFLICT_MAX_RETRIES", d.conflict_max_retries),
            conflict_retry_delay: Duration::from_millis(parse("CONFLICT_RETRY_DELAY_MS", 500u64)),
            autocomplete_quiet: Duration::from_millis(parse("AUTOCOMPLETE_QUIET_MS", 1500u64)),
            min_candidate_chars: parse("MIN_CANDIDATE_CHARS", d.min_candidate_chars),
        }
    }

    /// Rejects settings the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |msg: &str| Err(EngineError::Config(msg.to_string()));

        if self.highlight_model.trim().is_empty() || self.code_model.trim().is_empty() {
            return invalid("model names must not be empty");
        }
        if self.highlight_context_words == 0 || self.code_context_words == 0 {
            return invalid("context word counts must be at least 1");
        }
        if self.highlight_max_attempts == 0 {
            return invalid("HIGHLIGHT_MAX_ATTEMPTS must be at least 1");
        }
        Ok(())
    }
}

fn env(k: &str, dflt: &str) -> String {
    std::env::var(k).unwrap_or_else(|_| dflt.to_string())
}

fn parse<T: std::str::FromStr>(k: &str, dflt: T) -> T {
    std::env::var(k)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(dflt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = EngineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.highlight_context_words, 350);
        assert_eq!(cfg.conflict_retry_delay, Duration::from_millis(500));
    }

    #[test]
    fn zero_attempts_are_rejected() {
        let cfg = EngineConfig {
            highlight_max_attempts: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn empty_model_is_rejected() {
        let cfg = EngineConfig {
            code_model: " ".into(),
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
