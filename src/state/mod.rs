use std::sync::Arc;

use crate::core::config::{ConfigService, Settings};
use crate::llm::build_provider;
use crate::rag::{Answerer, IndexLoader, IndexSource, RagChain};
use crate::storage::build_object_store;

pub mod error;

use error::InitializationError;

/// Size and provenance of the index behind the answer chain.
#[derive(Debug, Clone, Copy)]
pub struct IndexStats {
    pub chunks: usize,
    pub source: IndexSource,
}

/// Shared, read-only application state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub answerer: Arc<dyn Answerer>,
    pub index: IndexStats,
}

impl AppState {
    /// Loads settings, connects the model provider and acquires the index
    /// (local, remote or rebuilt) before anything is served.
    pub async fn initialize(config: &ConfigService) -> Result<Arc<Self>, InitializationError> {
        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;

        let provider = build_provider(&settings.llm)
            .await
            .map_err(|e| InitializationError::Llm(e.into()))?;
        let store = build_object_store(&settings.storage).await;

        let (index, source) = IndexLoader::new(&settings, config.paths(), provider.clone(), store)
            .load_or_build()
            .await
            .map_err(InitializationError::Index)?;
        let stats = IndexStats {
            chunks: index.len(),
            source,
        };
        tracing::info!(
            "Index ready: {} chunks ({})",
            stats.chunks,
            stats.source.as_str()
        );

        let chain = RagChain::new(provider, Arc::new(index), settings.retrieval.top_k);
        Ok(Self::from_parts(settings, Arc::new(chain), stats))
    }

    pub fn from_parts(
        settings: Settings,
        answerer: Arc<dyn Answerer>,
        index: IndexStats,
    ) -> Arc<Self> {
        Arc::new(AppState {
            settings: Arc::new(settings),
            answerer,
            index,
        })
    }
}
