//! Provider selection — builds the configured backend.

use crate::gemini::{GEMINI_BASE_URL, GeminiProvider};
use crate::openai_compat::{OPENAI_BASE_URL, OpenAiCompatProvider};
use sevasaathi_config::{AppConfig, ConfigError};
use sevasaathi_core::provider::Provider;
use std::sync::Arc;
use tracing::debug;

/// Build the backend named by `config.provider.kind`.
///
/// Fails with `MissingSetting("api_key")` when no key is configured, except
/// for a local OpenAI-compatible endpoint (e.g. Ollama) that needs none.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ConfigError> {
    let kind = config.provider.kind.as_str();
    let base_url = config
        .provider
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(kind).to_string());

    let provider: Arc<dyn Provider> = match kind {
        "gemini" => {
            let api_key = config.require_api_key()?;
            let mut p = GeminiProvider::new(api_key);
            if config.provider.api_url.is_some() {
                p = p.with_base_url(&base_url);
            }
            Arc::new(p)
        }
        "openai" => {
            let api_key = match config.require_api_key() {
                Ok(key) => key.to_string(),
                Err(_) if is_local(&base_url) => String::new(),
                Err(e) => return Err(e),
            };
            Arc::new(OpenAiCompatProvider::new(kind, &base_url, api_key))
        }
        other => {
            return Err(ConfigError::ValidationError(format!(
                "Unknown provider kind '{other}'"
            )));
        }
    };

    debug!(provider = kind, model = %config.provider.model, "Provider built");
    Ok(provider)
}

/// Default base URL for each backend kind.
fn default_base_url(kind: &str) -> &'static str {
    match kind {
        "gemini" => GEMINI_BASE_URL,
        _ => OPENAI_BASE_URL,
    }
}

fn is_local(url: &str) -> bool {
    url.contains("://localhost") || url.contains("://127.0.0.1")
}
