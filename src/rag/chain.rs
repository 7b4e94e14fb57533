use std::sync::Arc;

use async_trait::async_trait;

use super::index::FlatIndex;
use super::prompt::render_answer_prompt;
use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, ChatRequest, EmbeddingKind, LlmProvider};

/// Anything that can turn a question into an answer. The HTTP layer only
/// depends on this.
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(&self, question: &str) -> Result<String, ApiError>;
}

/// Retrieve-then-generate over a read-only index.
pub struct RagChain {
    provider: Arc<dyn LlmProvider>,
    index: Arc<FlatIndex>,
    top_k: usize,
}

impl RagChain {
    pub fn new(provider: Arc<dyn LlmProvider>, index: Arc<FlatIndex>, top_k: usize) -> Self {
        Self {
            provider,
            index,
            top_k,
        }
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    /// Chunk texts of the nearest neighbours, blank-line separated.
    pub async fn retrieve_context(&self, question: &str) -> Result<String, ApiError> {
        if self.index.is_empty() {
            return Ok(String::new());
        }

        let vectors = self
            .provider
            .embed(&[question.to_string()], EmbeddingKind::Query)
            .await?;
        let query = vectors
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Internal("No embedding returned for question".to_string()))?;

        let hits = self.index.search(&query, self.top_k);
        tracing::debug!(
            "Retrieved {} chunks (best score {:?})",
            hits.len(),
            hits.first().map(|h| h.score)
        );
        Ok(hits
            .iter()
            .map(|hit| hit.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

#[async_trait]
impl Answerer for RagChain {
    async fn answer(&self, question: &str) -> Result<String, ApiError> {
        let context = self.retrieve_context(question).await?;
        let prompt = render_answer_prompt(&context, question);
        let answer = self
            .provider
            .chat(ChatRequest::new(vec![ChatMessage::user(prompt)]))
            .await?;
        Ok(answer.trim().to_string())
    }
}
