use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use tempfile::TempDir;

use campus_assistant::core::config::{AppPaths, Settings};
use campus_assistant::core::errors::ApiError;
use campus_assistant::llm::{ChatRequest, EmbeddingKind, LlmProvider};
use campus_assistant::rag::{Document, FlatIndex, IndexLoader, IndexSource};
use campus_assistant::storage::{zip_directory, ObjectStore};

const MODEL: &str = "stub-embed";

#[derive(Default)]
struct StubEmbedder {
    embed_calls: AtomicUsize,
}

#[async_trait]
impl LlmProvider for StubEmbedder {
    fn name(&self) -> &str {
        "stub"
    }

    fn embedding_model(&self) -> &str {
        MODEL
    }

    async fn chat(&self, _request: ChatRequest) -> Result<String, ApiError> {
        Ok("unused".to_string())
    }

    async fn embed(
        &self,
        inputs: &[String],
        _kind: EmbeddingKind,
    ) -> Result<Vec<Vec<f32>>, ApiError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        Ok(inputs
            .iter()
            .map(|text| vec![text.len() as f32, 1.0])
            .collect())
    }
}

#[derive(Default)]
struct StubStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    gets: AtomicUsize,
    fail_puts: bool,
}

#[async_trait]
impl ObjectStore for StubStore {
    fn describe(&self) -> String {
        "stub://bucket".to_string()
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.objects.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> anyhow::Result<()> {
        if self.fail_puts {
            return Err(anyhow!("access denied"));
        }
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(())
    }
}

struct Fixture {
    _root: TempDir,
    paths: AppPaths,
    settings: Settings,
}

impl Fixture {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let paths = AppPaths::from_dirs(root.path().to_path_buf(), root.path().join("home"));
        let mut settings = Settings::default();
        settings.data_dir = root.path().join("data");
        settings.index.local_path = root.path().join("vector_store");
        settings.index.batch_size = 2;
        settings.index.batch_pause_secs = 0;
        fs::create_dir_all(&settings.data_dir).unwrap();
        Self {
            _root: root,
            paths,
            settings,
        }
    }

    fn with_coursebook(self) -> Self {
        fs::write(
            self.settings.data_dir.join("coursebook_spring2026.csv"),
            "course_prefix,course_number,section,class_number,title,instructor_s,days,times_12h,location,enrolled_status,enrolled_current,enrolled_max\n\
             cs,6363,001,21001,Design and Analysis of Computer Algorithms,Ada Lovelace,Tuesday & Thursday,10:00am - 11:15am,ECSW 1.315,Open,50,60\n\
             cs,6350,501,21002,Big Data Management and Analytics,Alan Turing,Monday,7:00pm - 9:45pm,JSOM 2.106,Full,90,90\n",
        )
        .unwrap();
        self
    }

    fn index_dir(&self) -> &Path {
        &self.settings.index.local_path
    }

    fn loader(
        &self,
        provider: Arc<StubEmbedder>,
        store: Option<Arc<StubStore>>,
    ) -> IndexLoader {
        IndexLoader::new(
            &self.settings,
            &self.paths,
            provider,
            store.map(|s| s as Arc<dyn ObjectStore>),
        )
        .with_pause(Duration::ZERO)
    }
}

fn saved_index(dir: &Path, model: &str) {
    let mut index = FlatIndex::new(model);
    index
        .add(&[Document::new("cached chunk")], vec![vec![0.5, 0.5]])
        .unwrap();
    index.save(dir).unwrap();
}

#[tokio::test]
async fn local_index_wins_without_touching_remote_or_embeddings() {
    let fixture = Fixture::new().with_coursebook();
    saved_index(fixture.index_dir(), MODEL);
    let provider = Arc::new(StubEmbedder::default());
    let store = Arc::new(StubStore::default());

    let (index, source) = fixture
        .loader(provider.clone(), Some(store.clone()))
        .load_or_build()
        .await
        .unwrap();

    assert_eq!(source, IndexSource::Local);
    assert_eq!(index.len(), 1);
    assert_eq!(store.gets.load(Ordering::SeqCst), 0);
    assert_eq!(provider.embed_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn remote_archive_is_unpacked_when_local_is_missing() {
    let fixture = Fixture::new().with_coursebook();
    let staging = tempfile::tempdir().unwrap();
    saved_index(staging.path(), MODEL);
    let store = Arc::new(StubStore::default());
    store.objects.lock().unwrap().insert(
        fixture.settings.storage.archive_key.clone(),
        zip_directory(staging.path()).unwrap(),
    );
    let provider = Arc::new(StubEmbedder::default());

    let (index, source) = fixture
        .loader(provider.clone(), Some(store))
        .load_or_build()
        .await
        .unwrap();

    assert_eq!(source, IndexSource::Remote);
    assert_eq!(index.len(), 1);
    assert!(fixture.index_dir().join("manifest.json").exists());
    assert_eq!(provider.embed_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rebuild_saves_locally_and_uploads() {
    let fixture = Fixture::new().with_coursebook();
    let provider = Arc::new(StubEmbedder::default());
    let store = Arc::new(StubStore::default());

    let (index, source) = fixture
        .loader(provider.clone(), Some(store.clone()))
        .load_or_build()
        .await
        .unwrap();

    assert_eq!(source, IndexSource::Rebuilt);
    assert_eq!(index.len(), 2);
    assert_eq!(provider.embed_calls.load(Ordering::SeqCst), 1);
    assert!(fixture.index_dir().join("vectors.bin").exists());
    assert!(store
        .objects
        .lock()
        .unwrap()
        .contains_key("vector_store.zip"));

    // The saved copy is what the next start-up loads.
    let (_, source) = fixture
        .loader(Arc::new(StubEmbedder::default()), None)
        .load_or_build()
        .await
        .unwrap();
    assert_eq!(source, IndexSource::Local);
}

#[tokio::test]
async fn index_from_another_embedding_model_is_rebuilt() {
    let fixture = Fixture::new().with_coursebook();
    saved_index(fixture.index_dir(), "some-older-model");

    let (index, source) = fixture
        .loader(Arc::new(StubEmbedder::default()), None)
        .load_or_build()
        .await
        .unwrap();

    assert_eq!(source, IndexSource::Rebuilt);
    assert_eq!(index.embedding_model(), MODEL);
}

#[tokio::test]
async fn failed_upload_does_not_fail_the_build() {
    let fixture = Fixture::new().with_coursebook();
    let store = Arc::new(StubStore {
        fail_puts: true,
        ..StubStore::default()
    });

    let (_, source) = fixture
        .loader(Arc::new(StubEmbedder::default()), Some(store))
        .load_or_build()
        .await
        .unwrap();

    assert_eq!(source, IndexSource::Rebuilt);
    assert!(fixture.index_dir().join("manifest.json").exists());
}

#[tokio::test]
async fn empty_data_directory_serves_an_empty_index() {
    let fixture = Fixture::new();
    fs::write(fixture.settings.data_dir.join("notes.txt"), "ignored").unwrap();
    let store = Arc::new(StubStore::default());

    let (index, source) = fixture
        .loader(Arc::new(StubEmbedder::default()), Some(store.clone()))
        .load_or_build()
        .await
        .unwrap();

    assert_eq!(source, IndexSource::Empty);
    assert!(index.is_empty());
    assert!(!fixture.index_dir().exists());
    assert!(store.objects.lock().unwrap().is_empty());
}
