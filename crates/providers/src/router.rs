//! Provider factory: builds the configured model server client.

use std::sync::Arc;

use localpilot_config::{AppConfig, ProviderKind};
use localpilot_core::provider::Provider;

use crate::openai_compat::OpenAiCompatProvider;

/// Build the provider described by the `[model]` and `[tokens]` sections.
///
/// Every supported server speaks the OpenAI chat-completions dialect, so the
/// kind only selects the provider name and default endpoint.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn Provider> {
    let endpoint = config.model.effective_endpoint();

    let provider = match config.model.provider {
        ProviderKind::Ollama => OpenAiCompatProvider::ollama(Some(&endpoint)),
        ProviderKind::Lmstudio => OpenAiCompatProvider::lmstudio(Some(&endpoint)),
        ProviderKind::Llamacpp => OpenAiCompatProvider::llamacpp(Some(&endpoint)),
        ProviderKind::OpenaiCompatible => OpenAiCompatProvider::new("openai-compatible", &endpoint),
    }
    .with_timeout(config.tokens.request_timeout_secs);

    let provider = match &config.model.api_key {
        Some(key) => provider.with_api_key(key),
        None => provider,
    };

    tracing::debug!(
        provider = %config.model.provider,
        endpoint = %endpoint,
        "Built model provider"
    );

    Arc::new(provider)
}
