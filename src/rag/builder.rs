use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use super::document::Document;
use super::index::FlatIndex;
use crate::core::config::settings::IndexSettings;
use crate::llm::{EmbeddingKind, LlmProvider};

/// Embeds chunks in fixed-size batches, pausing after each one so the
/// embedding endpoint's rate limit is not exceeded.
pub struct IndexBuilder {
    provider: Arc<dyn LlmProvider>,
    batch_size: usize,
    pause: Duration,
}

impl IndexBuilder {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: &IndexSettings) -> Self {
        Self {
            provider,
            batch_size: settings.batch_size.max(1),
            pause: Duration::from_secs(settings.batch_pause_secs),
        }
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub async fn build(&self, chunks: &[Document]) -> anyhow::Result<FlatIndex> {
        let mut index = FlatIndex::new(self.provider.embedding_model());
        let total = chunks.len().div_ceil(self.batch_size);

        for (i, batch) in chunks.chunks(self.batch_size).enumerate() {
            tracing::info!("Processing batch {}/{} ({} chunks)", i + 1, total, batch.len());
            let texts: Vec<String> = batch.iter().map(|d| d.page_content.clone()).collect();
            let vectors = self
                .provider
                .embed(&texts, EmbeddingKind::Document)
                .await
                .with_context(|| format!("Embedding batch {}/{} failed", i + 1, total))?;
            index.add(batch, vectors)?;

            if !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
        }

        tracing::info!("Indexed {} chunks", index.len());
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::core::errors::ApiError;
    use crate::llm::ChatRequest;

    #[derive(Default)]
    struct CountingEmbedder {
        batches: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl LlmProvider for CountingEmbedder {
        fn name(&self) -> &str {
            "counting"
        }

        fn embedding_model(&self) -> &str {
            "counting-embed"
        }

        async fn chat(&self, _request: ChatRequest) -> Result<String, ApiError> {
            Ok(String::new())
        }

        async fn embed(
            &self,
            inputs: &[String],
            kind: EmbeddingKind,
        ) -> Result<Vec<Vec<f32>>, ApiError> {
            assert_eq!(kind, EmbeddingKind::Document);
            self.batches.lock().unwrap().push(inputs.len());
            Ok(inputs.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    #[tokio::test]
    async fn embeds_in_fixed_batches() {
        let provider = Arc::new(CountingEmbedder::default());
        let settings = IndexSettings {
            batch_size: 2,
            batch_pause_secs: 0,
            ..IndexSettings::default()
        };
        let chunks: Vec<Document> = (0..5).map(|i| Document::new(format!("chunk {i}"))).collect();

        let index = IndexBuilder::new(provider.clone(), &settings)
            .build(&chunks)
            .await
            .unwrap();

        assert_eq!(index.len(), 5);
        assert_eq!(index.embedding_model(), "counting-embed");
        assert_eq!(*provider.batches.lock().unwrap(), vec![2, 2, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_after_every_batch() {
        let provider = Arc::new(CountingEmbedder::default());
        let settings = IndexSettings {
            batch_size: 1,
            batch_pause_secs: 3,
            ..IndexSettings::default()
        };
        let chunks = vec![Document::new("a"), Document::new("b")];

        let started = tokio::time::Instant::now();
        IndexBuilder::new(provider, &settings).build(&chunks).await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(6));
    }
}
