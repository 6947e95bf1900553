//! Streaming model backends for pillbox.
//!
//! All backends implement the `pillbox_core::Backend` trait.
//! [`build_from_config`] picks and configures the one the CLI talks to.

pub mod openai_responses;

pub use openai_responses::OpenAiResponsesBackend;

use pillbox_core::error::ProviderError;
use pillbox_core::provider::Backend;
use std::sync::Arc;

/// Build the configured backend.
///
/// Fails with [`ProviderError::NotConfigured`] when no API key is available.
pub fn build_from_config(
    config: &pillbox_config::AppConfig,
) -> Result<Arc<dyn Backend>, ProviderError> {
    let api_key = config.api_key.clone().ok_or_else(|| {
        ProviderError::NotConfigured(
            "no API key; set PILLBOX_API_KEY or OPENAI_API_KEY, or add api_key to config.toml"
                .into(),
        )
    })?;

    let backend = OpenAiResponsesBackend::new(backend_name(&config.api_url), &config.api_url, api_key)?;
    tracing::debug!(backend = %backend.name(), url = %config.api_url, "Backend ready");
    Ok(Arc::new(backend))
}

/// Name a backend after the host it talks to.
fn backend_name(api_url: &str) -> &'static str {
    if api_url.contains("api.openai.com") {
        "openai"
    } else {
        "openai-compatible"
    }
}
