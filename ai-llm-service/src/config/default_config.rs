//! LLM configs loaded from environment variables.
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND`         = provider kind (`openai` | `ollama`, default `openai`)
//! - `LLM_MAX_TOKENS`   = optional max tokens (u32)
//! - `LLM_TIMEOUT_SECS` = optional request timeout (u64, default 60)
//!
//! OpenAI-specific:
//! - `OPENAI_API_KEY` = API key (mandatory)
//! - `OPENAI_URL`     = base URL (default `https://api.openai.com`)
//!
//! Ollama-specific:
//! - `OLLAMA_URL` or `OLLAMA_PORT` = endpoint (mandatory)
//! - `OLLAMA_TEMPERATURE`           = sampling temperature (f32 in `0.0..=2.0`, default 0.2)

use crate::{
    config::{
        llm_model_config::{FALLBACK_OPENAI_MODEL, LlmModelConfig},
        llm_provider::LlmProvider,
    },
    error_handler::{
        AiLlmError, ConfigError, env_opt_u32, env_opt_u64, must_env, opt_env,
        validate_http_endpoint, validate_range_f32,
    },
};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_OLLAMA_TEMPERATURE: f32 = 0.2;

/// Builds the config for the provider named by `LLM_KIND`.
///
/// # Errors
/// Propagates the errors of [`config_openai`] / [`config_ollama`] and
/// [`ConfigError::UnsupportedProvider`] for unknown kinds.
pub fn config_from_env() -> Result<LlmModelConfig, AiLlmError> {
    let kind = opt_env("LLM_KIND")
        .map(|k| k.parse::<LlmProvider>())
        .transpose()?
        .unwrap_or(LlmProvider::OpenAI);

    match kind {
        LlmProvider::OpenAI => config_openai(),
        LlmProvider::Ollama => config_ollama(),
    }
}

/// Constructs an OpenAI config.
///
/// # Env
/// - `OPENAI_API_KEY` (required)
/// - `OPENAI_URL`, `LLM_MAX_TOKENS`, `LLM_TIMEOUT_SECS` (optional)
///
/// # Defaults
/// - `model = gpt-4.1-mini` (callers pick the model per request)
/// - `temperature = None` (newer models reject non-default sampling)
pub fn config_openai() -> Result<LlmModelConfig, AiLlmError> {
    let api_key = must_env("OPENAI_API_KEY")?;
    let endpoint = opt_env("OPENAI_URL").unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string());
    validate_http_endpoint("OPENAI_URL", &endpoint)?;

    Ok(LlmModelConfig {
        provider: LlmProvider::OpenAI,
        model: FALLBACK_OPENAI_MODEL.to_string(),
        endpoint,
        api_key: Some(api_key),
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: None,
        top_p: None,
        timeout_secs: Some(env_opt_u64("LLM_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS)),
    })
}

/// Constructs an Ollama config.
///
/// # Env
/// - `OLLAMA_URL` or `OLLAMA_PORT` (required)
/// - `OLLAMA_MODEL` (optional default model)
/// - `OLLAMA_TEMPERATURE`, `LLM_MAX_TOKENS`, `LLM_TIMEOUT_SECS` (optional)
pub fn config_ollama() -> Result<LlmModelConfig, AiLlmError> {
    let endpoint = ollama_endpoint()?;
    validate_http_endpoint("OLLAMA_URL", &endpoint)?;

    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model: opt_env("OLLAMA_MODEL").unwrap_or_default(),
        endpoint,
        api_key: None,
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(ollama_temperature()?),
        top_p: None,
        timeout_secs: Some(env_opt_u64("LLM_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS)),
    })
}

/// Resolves the Ollama endpoint strictly from environment.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Some(url) = opt_env("OLLAMA_URL") {
        return Ok(url);
    }
    if let Some(port) = opt_env("OLLAMA_PORT") {
        let port = port
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidNumber {
                var: "OLLAMA_PORT",
                reason: "expected u16 (1..=65535)",
            })?;
        return Ok(format!("http://localhost:{port}"));
    }
    Err(AiLlmError::Config(ConfigError::MissingVar(
        "OLLAMA_URL or OLLAMA_PORT",
    )))
}

fn ollama_temperature() -> Result<f32, AiLlmError> {
    let Some(raw) = opt_env("OLLAMA_TEMPERATURE") else {
        return Ok(DEFAULT_OLLAMA_TEMPERATURE);
    };
    let t = raw
        .trim()
        .parse::<f32>()
        .map_err(|_| ConfigError::InvalidNumber {
            var: "OLLAMA_TEMPERATURE",
            reason: "expected f32",
        })?;
    validate_range_f32("temperature", t, 0.0, 2.0)?;
    Ok(t)
}
