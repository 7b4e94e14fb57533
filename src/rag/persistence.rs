//! Start-up index acquisition: local directory, then the remote archive,
//! then a full rebuild from the data directory.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::Serialize;

use super::builder::IndexBuilder;
use super::index::FlatIndex;
use super::loaders::load_directory;
use super::splitter::DocumentSplitter;
use crate::core::config::settings::{ChunkingSettings, IndexSettings, Settings};
use crate::core::config::AppPaths;
use crate::llm::LlmProvider;
use crate::storage::{extract_archive, zip_directory, ObjectStore};

/// Where the serving index came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexSource {
    Local,
    Remote,
    Rebuilt,
    Empty,
}

impl IndexSource {
    pub fn as_str(self) -> &'static str {
        match self {
            IndexSource::Local => "local",
            IndexSource::Remote => "remote",
            IndexSource::Rebuilt => "rebuilt",
            IndexSource::Empty => "empty",
        }
    }
}

pub struct IndexLoader {
    provider: Arc<dyn LlmProvider>,
    store: Option<Arc<dyn ObjectStore>>,
    index_dir: PathBuf,
    data_dir: PathBuf,
    archive_key: String,
    chunking: ChunkingSettings,
    index_settings: IndexSettings,
    pause: Option<Duration>,
}

impl IndexLoader {
    pub fn new(
        settings: &Settings,
        paths: &AppPaths,
        provider: Arc<dyn LlmProvider>,
        store: Option<Arc<dyn ObjectStore>>,
    ) -> Self {
        Self {
            provider,
            store,
            index_dir: paths.resolve(&settings.index.local_path),
            data_dir: paths.resolve(&settings.data_dir),
            archive_key: settings.storage.archive_key.clone(),
            chunking: settings.chunking.clone(),
            index_settings: settings.index.clone(),
            pause: None,
        }
    }

    /// Overrides the inter-batch pause of rebuilds.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = Some(pause);
        self
    }

    pub async fn load_or_build(&self) -> anyhow::Result<(FlatIndex, IndexSource)> {
        match self.load_local() {
            Ok(index) => {
                tracing::info!(
                    "Loaded local index from {} ({} chunks)",
                    self.index_dir.display(),
                    index.len()
                );
                return Ok((index, IndexSource::Local));
            }
            Err(err) => tracing::info!("Local index unavailable: {:#}", err),
        }

        match self.load_remote().await {
            Ok(Some(index)) => {
                tracing::info!("Loaded index from remote archive ({} chunks)", index.len());
                return Ok((index, IndexSource::Remote));
            }
            Ok(None) => tracing::info!("No remote index archive"),
            Err(err) => tracing::warn!("Remote index unavailable: {:#}", err),
        }

        tracing::info!("Building index from {}", self.data_dir.display());
        self.rebuild().await
    }

    /// Full rebuild from the data directory; saves and uploads the result
    /// unless nothing could be loaded.
    pub async fn rebuild(&self) -> anyhow::Result<(FlatIndex, IndexSource)> {
        let data_dir = self.data_dir.clone();
        let documents = match tokio::task::spawn_blocking(move || load_directory(&data_dir)).await? {
            Ok(documents) => documents,
            Err(err) => {
                tracing::warn!("{:#}", err);
                Vec::new()
            }
        };

        if documents.is_empty() {
            tracing::warn!("No documents were loaded; serving an empty index");
            return Ok((
                FlatIndex::new(self.provider.embedding_model()),
                IndexSource::Empty,
            ));
        }

        let splitter = DocumentSplitter::new(&self.chunking)?;
        let chunks = splitter.split_documents(&documents);
        tracing::info!("Split {} documents into {} chunks", documents.len(), chunks.len());

        let mut builder = IndexBuilder::new(self.provider.clone(), &self.index_settings);
        if let Some(pause) = self.pause {
            builder = builder.with_pause(pause);
        }
        let index = builder.build(&chunks).await?;

        index
            .save(&self.index_dir)
            .with_context(|| format!("Failed to save index to {}", self.index_dir.display()))?;
        tracing::info!("Saved index to {}", self.index_dir.display());
        self.upload().await;

        Ok((index, IndexSource::Rebuilt))
    }

    fn load_local(&self) -> anyhow::Result<FlatIndex> {
        let index = FlatIndex::load(&self.index_dir)?;
        if index.embedding_model() != self.provider.embedding_model() {
            bail!(
                "index was built with {} but {} is configured",
                index.embedding_model(),
                self.provider.embedding_model()
            );
        }
        Ok(index)
    }

    async fn load_remote(&self) -> anyhow::Result<Option<FlatIndex>> {
        let Some(store) = &self.store else {
            return Ok(None);
        };

        tracing::info!("Downloading {} from {}", self.archive_key, store.describe());
        let Some(bytes) = store.get(&self.archive_key).await? else {
            return Ok(None);
        };
        extract_archive(&bytes, &self.index_dir)?;
        self.load_local().map(Some)
    }

    /// Upload failures never fail the build.
    async fn upload(&self) {
        let Some(store) = &self.store else {
            return;
        };

        let bytes = match zip_directory(&self.index_dir) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!("Failed to archive index: {:#}", err);
                return;
            }
        };
        match store.put(&self.archive_key, bytes).await {
            Ok(()) => tracing::info!("Uploaded {} to {}", self.archive_key, store.describe()),
            Err(err) => tracing::warn!("Index upload failed: {:#}", err),
        }
    }
}
