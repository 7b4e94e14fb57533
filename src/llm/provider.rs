use async_trait::async_trait;

use crate::core::errors::ApiError;
use super::types::{ChatRequest, EmbeddingKind};

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// provider name (e.g. "bedrock", "openai")
    fn name(&self) -> &str;

    /// configured embedding model id, recorded in the index manifest
    fn embedding_model(&self) -> &str;

    /// chat completion (non-streaming)
    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError>;

    /// one vector per input, in input order
    async fn embed(
        &self,
        inputs: &[String],
        kind: EmbeddingKind,
    ) -> Result<Vec<Vec<f32>>, ApiError>;
}
