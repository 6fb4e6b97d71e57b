use tracing::warn;

use crate::config::llm_provider::LlmProvider;
use crate::error_handler::ConfigError;

/// OpenAI models accepted by the workbench.
pub const ACCEPTED_OPENAI_MODELS: &[&str] = &[
    "gpt-5.1",
    "gpt-5",
    "gpt-5-mini",
    "gpt-5-nano",
    "gpt-4.1",
    "gpt-4.1-mini",
    "gpt-4.1-nano",
];

/// Model used when a requested OpenAI model is not accepted.
pub const FALLBACK_OPENAI_MODEL: &str = "gpt-4.1-mini";

/// Connection and sampling settings for one LLM backend.
///
/// The model is chosen per call; `model` here is only the default used when a
/// caller passes an empty model name.
///
/// # Fields
///
/// - `provider`: which backend to use (Ollama or OpenAI).
/// - `model`: default model identifier.
/// - `endpoint`: base URL of the backend (no path).
/// - `api_key`: required by OpenAI, ignored by Ollama.
/// - `max_tokens`: maximum number of tokens to generate (if supported).
/// - `temperature` / `top_p`: optional sampling knobs.
/// - `timeout_secs`: per-request timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub timeout_secs: Option<u64>,
}

impl LlmModelConfig {
    /// Returns a copy of this config bound to the model that will actually be called.
    ///
    /// For OpenAI, names outside [`ACCEPTED_OPENAI_MODELS`] are replaced by
    /// [`FALLBACK_OPENAI_MODEL`] with a warning. Ollama accepts any local tag.
    ///
    /// # Errors
    /// [`ConfigError::EmptyModel`] when neither `requested` nor the default is set.
    pub fn for_model(&self, requested: &str) -> Result<LlmModelConfig, ConfigError> {
        let requested = requested.trim();
        let model = if requested.is_empty() {
            self.model.trim().to_string()
        } else {
            requested.to_string()
        };
        if model.is_empty() {
            return Err(ConfigError::EmptyModel);
        }

        let model = match self.provider {
            LlmProvider::OpenAI if !ACCEPTED_OPENAI_MODELS.contains(&model.as_str()) => {
                warn!(
                    requested = %model,
                    fallback = FALLBACK_OPENAI_MODEL,
                    "model is not in the accepted list, falling back"
                );
                FALLBACK_OPENAI_MODEL.to_string()
            }
            _ => model,
        };

        Ok(LlmModelConfig {
            model,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn openai() -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::OpenAI,
            model: "gpt-4.1-mini".into(),
            endpoint: "https://api.openai.com".into(),
            api_key: Some("sk-test".into()),
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: Some(60),
        }
    }

    #[test]
    fn unknown_openai_model_falls_back() {
        assert_eq!(openai().for_model("gpt-3.5-turbo").unwrap().model, FALLBACK_OPENAI_MODEL);
        assert_eq!(openai().for_model("gpt-5.1").unwrap().model, "gpt-5.1");
    }

    #[test]
    fn empty_request_uses_default_model() {
        assert_eq!(openai().for_model("  ").unwrap().model, "gpt-4.1-mini");
    }

    #[test]
    fn ollama_keeps_any_tag() {
        let cfg = LlmModelConfig {
            provider: LlmProvider::Ollama,
            api_key: None,
            endpoint: "http://localhost:11434".into(),
            ..openai()
        };
        assert_eq!(cfg.for_model("qwen3:14b").unwrap().model, "qwen3:14b");
    }

    #[test]
    fn missing_model_is_a_config_error() {
        let cfg = LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: String::new(),
            api_key: None,
            endpoint: "http://localhost:11434".into(),
            ..openai()
        };
        assert!(matches!(cfg.for_model(" "), Err(ConfigError::EmptyModel)));
        assert_eq!(cfg.for_model("llama3").unwrap().model, "llama3");
    }
}
