//! Remote mirror of the persisted index.

pub mod archive;
pub mod s3;

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::config::settings::{StorageProvider, StorageSettings};

pub use archive::{extract_archive, zip_directory};
pub use s3::S3ObjectStore;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn describe(&self) -> String;

    /// `Ok(None)` when the key does not exist.
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;

    async fn put(&self, key: &str, bytes: Vec<u8>) -> anyhow::Result<()>;
}

/// `None` when no remote mirror is configured.
pub async fn build_object_store(settings: &StorageSettings) -> Option<Arc<dyn ObjectStore>> {
    match settings.provider {
        StorageProvider::S3 => {
            let store: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::from_settings(settings).await);
            tracing::info!("Remote index mirror: {}", store.describe());
            Some(store)
        }
        StorageProvider::Disabled => None,
    }
}
