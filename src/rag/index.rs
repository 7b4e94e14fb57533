//! Flat similarity index: exhaustive cosine scan over every stored vector,
//! persisted as a small directory of files.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::document::Document;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const DOCSTORE_FILE: &str = "docstore.json";
pub const VECTORS_FILE: &str = "vectors.bin";
const FORMAT_VERSION: u32 = 1;

/// A stored chunk with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub chunk_id: String,
    pub content: String,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk: IndexedChunk,
    /// Cosine similarity, higher is closer.
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    pub embedding_model: String,
    pub dimension: usize,
    pub chunk_count: usize,
    pub built_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FlatIndex {
    embedding_model: String,
    dimension: usize,
    chunks: Vec<IndexedChunk>,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    pub fn new(embedding_model: impl Into<String>) -> Self {
        Self {
            embedding_model: embedding_model.into(),
            dimension: 0,
            chunks: Vec::new(),
            vectors: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Appends documents with their vectors. The first non-empty batch fixes
    /// the dimension; later vectors must match it.
    pub fn add(&mut self, documents: &[Document], vectors: Vec<Vec<f32>>) -> anyhow::Result<()> {
        if documents.len() != vectors.len() {
            bail!(
                "Got {} vectors for {} documents",
                vectors.len(),
                documents.len()
            );
        }

        for vector in &vectors {
            if vector.is_empty() {
                bail!("Empty embedding vector");
            }
            if self.dimension == 0 {
                self.dimension = vector.len();
            } else if vector.len() != self.dimension {
                bail!(
                    "Vector dimension mismatch: {} != {}",
                    vector.len(),
                    self.dimension
                );
            }
        }

        self.chunks.extend(documents.iter().map(|doc| IndexedChunk {
            chunk_id: uuid::Uuid::new_v4().to_string(),
            content: doc.page_content.clone(),
            metadata: doc.metadata.clone(),
        }));
        self.vectors.extend(vectors);
        Ok(())
    }

    /// The `limit` chunks closest to `query`, best first.
    pub fn search(&self, query: &[f32], limit: usize) -> Vec<SearchHit> {
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(idx, vector)| (idx, cosine_similarity(query, vector)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        scored
            .into_iter()
            .map(|(idx, score)| SearchHit {
                chunk: self.chunks[idx].clone(),
                score,
            })
            .collect()
    }

    pub fn save(&self, dir: &Path) -> anyhow::Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let manifest = IndexManifest {
            format_version: FORMAT_VERSION,
            embedding_model: self.embedding_model.clone(),
            dimension: self.dimension,
            chunk_count: self.chunks.len(),
            built_at: Utc::now(),
        };
        fs::write(
            dir.join(MANIFEST_FILE),
            serde_json::to_vec_pretty(&manifest)?,
        )?;
        fs::write(dir.join(DOCSTORE_FILE), serde_json::to_vec(&self.chunks)?)?;

        let blob: Vec<u8> = self
            .vectors
            .iter()
            .flat_map(|vector| vector.iter().flat_map(|f| f.to_le_bytes()))
            .collect();
        fs::write(dir.join(VECTORS_FILE), blob)?;
        Ok(())
    }

    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let manifest: IndexManifest = serde_json::from_slice(
            &fs::read(dir.join(MANIFEST_FILE))
                .with_context(|| format!("No index manifest in {}", dir.display()))?,
        )
        .context("Corrupt index manifest")?;
        if manifest.format_version != FORMAT_VERSION {
            bail!("Unsupported index format version {}", manifest.format_version);
        }

        let chunks: Vec<IndexedChunk> =
            serde_json::from_slice(&fs::read(dir.join(DOCSTORE_FILE))?)
                .context("Corrupt index docstore")?;
        let blob = fs::read(dir.join(VECTORS_FILE))?;

        let expected_bytes = manifest.chunk_count * manifest.dimension * 4;
        if chunks.len() != manifest.chunk_count || blob.len() != expected_bytes {
            bail!(
                "Index files disagree: manifest says {} x {}, found {} chunks and {} bytes",
                manifest.chunk_count,
                manifest.dimension,
                chunks.len(),
                blob.len()
            );
        }

        let vectors = if manifest.dimension == 0 {
            Vec::new()
        } else {
            blob.chunks_exact(manifest.dimension * 4)
                .map(|row| {
                    row.chunks_exact(4)
                        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                        .collect()
                })
                .collect()
        };

        Ok(Self {
            embedding_model: manifest.embedding_model,
            dimension: manifest.dimension,
            chunks,
            vectors,
        })
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> FlatIndex {
        let mut index = FlatIndex::new("test-embed");
        index
            .add(
                &[
                    Document::new("CS 6363 algorithms").with_meta("course", "CS 6363"),
                    Document::new("CS 6350 big data").with_meta("course", "CS 6350"),
                    Document::new("CS 6375 machine learning").with_meta("course", "CS 6375"),
                ],
                vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.7, 0.7, 0.0]],
            )
            .unwrap();
        index
    }

    #[test]
    fn search_ranks_by_cosine_and_truncates() {
        let index = sample_index();

        let hits = index.search(&[1.0, 0.1, 0.0], 2);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.content, "CS 6363 algorithms");
        assert_eq!(hits[1].chunk.content, "CS 6375 machine learning");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn add_rejects_mismatched_inputs() {
        let mut index = sample_index();

        assert!(index.add(&[Document::new("x")], vec![]).is_err());
        assert!(index.add(&[Document::new("x")], vec![vec![1.0, 0.0]]).is_err());
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn save_and_load_preserve_chunks_and_vectors() {
        let dir = tempfile::tempdir().unwrap();
        let index = sample_index();

        index.save(dir.path()).unwrap();
        let loaded = FlatIndex::load(dir.path()).unwrap();

        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.dimension(), 3);
        assert_eq!(loaded.embedding_model(), "test-embed");
        let hits = loaded.search(&[0.0, 1.0, 0.0], 1);
        assert_eq!(hits[0].chunk.metadata["course"], "CS 6350");
    }

    #[test]
    fn load_rejects_truncated_vectors() {
        let dir = tempfile::tempdir().unwrap();
        sample_index().save(dir.path()).unwrap();
        fs::write(dir.path().join(VECTORS_FILE), [0u8; 7]).unwrap();

        assert!(FlatIndex::load(dir.path()).is_err());
    }
}
