pub mod bedrock;
pub mod openai;
pub mod provider;
pub mod types;

use std::sync::Arc;

use crate::core::config::settings::{LlmProviderKind, LlmSettings};
use crate::core::errors::ApiError;

pub use bedrock::BedrockProvider;
pub use openai::OpenAiCompatProvider;
pub use provider::LlmProvider;
pub use types::{ChatMessage, ChatRequest, EmbeddingKind};

/// Builds the configured chat + embedding backend.
pub async fn build_provider(settings: &LlmSettings) -> Result<Arc<dyn LlmProvider>, ApiError> {
    let provider: Arc<dyn LlmProvider> = match settings.provider {
        LlmProviderKind::Bedrock => Arc::new(BedrockProvider::from_settings(settings).await),
        LlmProviderKind::OpenAi => Arc::new(OpenAiCompatProvider::from_settings(settings)?),
    };
    tracing::info!(
        "Using {} provider (embeddings: {})",
        provider.name(),
        provider.embedding_model()
    );
    Ok(provider)
}
