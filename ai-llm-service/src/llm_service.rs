//! Shared completion service.
//!
//! - Lives in the same Tokio runtime as the application.
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Caches underlying HTTP clients per config (endpoint+model+key+timeout).
//! - The model is chosen per call; OpenAI names are checked against the accepted list.
//!
//! # Example
//! ```no_run
//! use ai_llm_service::{LlmClient, LlmService, config::default_config::config_from_env};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let svc = LlmService::new(config_from_env()?);
//!     let out = svc.complete("Say hello", "gpt-4.1-mini").await?;
//!     println!("{}", out.text);
//!     Ok(())
//! }
//! ```

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::{
    completion::{Completion, LlmClient},
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::AiLlmError,
    services::{ollama_service::OllamaService, open_ai_service::OpenAiService},
};

/// Completion service over one configured backend.
///
/// Internally, it caches Ollama/OpenAI clients keyed by their configuration to
/// avoid recreating HTTP clients on each call.
pub struct LlmService {
    base: LlmModelConfig,

    ollama: RwLock<HashMap<ClientKey, Arc<OllamaService>>>,
    openai: RwLock<HashMap<ClientKey, Arc<OpenAiService>>>,
}

impl LlmService {
    pub fn new(base: LlmModelConfig) -> Self {
        Self {
            base,
            ollama: RwLock::new(HashMap::new()),
            openai: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the backend config this service was built from.
    pub fn config(&self) -> &LlmModelConfig {
        &self.base
    }

    /* --------------------- Internals --------------------- */

    async fn generate_with(&self, cfg: &LlmModelConfig, prompt: &str) -> Result<String, AiLlmError> {
        match cfg.provider {
            LlmProvider::Ollama => {
                let cli = self.get_or_init_ollama(cfg).await?;
                cli.generate(prompt).await
            }
            LlmProvider::OpenAI => {
                let cli = self.get_or_init_openai(cfg).await?;
                cli.generate(prompt).await
            }
        }
    }

    async fn get_or_init_ollama(
        &self,
        cfg: &LlmModelConfig,
    ) -> Result<Arc<OllamaService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.ollama.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let mut w = self.ollama.write().await;
        if let Some(cli) = w.get(&key) {
            return Ok(cli.clone());
        }
        let cli = Arc::new(OllamaService::new(cfg.clone())?);
        w.insert(key, cli.clone());
        Ok(cli)
    }

    async fn get_or_init_openai(
        &self,
        cfg: &LlmModelConfig,
    ) -> Result<Arc<OpenAiService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.openai.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let mut w = self.openai.write().await;
        if let Some(cli) = w.get(&key) {
            return Ok(cli.clone());
        }
        let cli = Arc::new(OpenAiService::new(cfg.clone())?);
        w.insert(key, cli.clone());
        Ok(cli)
    }
}

impl LlmClient for LlmService {
    /// Runs one stateless completion.
    ///
    /// # Errors
    /// - [`AiLlmError::Config`] when no model is requested and none is configured
    /// - [`AiLlmError::Timeout`] if the call outlives the configured timeout
    /// - provider/transport errors from the underlying client
    #[instrument(skip_all, fields(provider = %self.base.provider, model = %model))]
    async fn complete(&self, prompt: &str, model: &str) -> Result<Completion, AiLlmError> {
        let cfg = self.base.for_model(model)?;
        let limit = Duration::from_secs(cfg.timeout_secs.unwrap_or(60));

        let text = tokio::time::timeout(limit, self.generate_with(&cfg, prompt))
            .await
            .map_err(|_| AiLlmError::Timeout(limit))??;

        // Blank text is still an answer; callers validate its content.
        if text.trim().is_empty() {
            warn!("completion text is blank");
        } else {
            debug!(output_len = text.len(), "completion received");
        }
        Ok(Completion { text })
    }
}

/// Internal cache key to identify unique client configs.
#[derive(Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    provider: LlmProvider,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Option<u64>,
}

impl From<&LlmModelConfig> for ClientKey {
    fn from(cfg: &LlmModelConfig) -> Self {
        Self {
            provider: cfg.provider,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            timeout: cfg.timeout_secs,
        }
    }
}
