use anyhow::anyhow;
use text_splitter::{ChunkConfig, TextSplitter};

use super::document::Document;
use crate::core::config::settings::ChunkingSettings;

/// Recursive character splitter: paragraphs, then sentences, then words,
/// then characters, until each window fits.
pub struct DocumentSplitter {
    splitter: TextSplitter<text_splitter::Characters>,
}

impl DocumentSplitter {
    pub fn new(settings: &ChunkingSettings) -> anyhow::Result<Self> {
        let config = ChunkConfig::new(settings.chunk_size)
            .with_overlap(settings.chunk_overlap)
            .map_err(|e| anyhow!("Invalid chunk config: {}", e))?;
        Ok(Self {
            splitter: TextSplitter::new(config),
        })
    }

    /// Splits every document; each chunk copies its parent's metadata.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Document> {
        documents
            .iter()
            .flat_map(|doc| {
                self.splitter
                    .chunks(&doc.page_content)
                    .map(|text| Document {
                        page_content: text.to_string(),
                        metadata: doc.metadata.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(chunk_size: usize, chunk_overlap: usize) -> DocumentSplitter {
        DocumentSplitter::new(&ChunkingSettings {
            chunk_size,
            chunk_overlap,
        })
        .unwrap()
    }

    #[test]
    fn short_documents_stay_whole_and_empty_ones_vanish() {
        let docs = vec![
            Document::new("CS 6363 meets Tuesday and Thursday.").with_meta("row", 3),
            Document::new("   "),
        ];

        let chunks = splitter(1000, 100).split_documents(&docs);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], docs[0]);
    }

    #[test]
    fn long_documents_split_into_bounded_overlapping_windows() {
        let sentence = "Students on the thesis track must complete six hours of CS 6V98. ";
        let doc = Document::new(sentence.repeat(60)).with_meta("source", "catalog.pdf");

        let chunks = splitter(1000, 100).split_documents(&[doc]);

        assert!(chunks.len() > 3);
        for chunk in &chunks {
            assert!(chunk.page_content.chars().count() <= 1000);
            assert_eq!(chunk.source(), Some("catalog.pdf"));
        }
        let covered: usize = chunks.iter().map(|c| c.page_content.chars().count()).sum();
        let original = sentence.repeat(60).trim().chars().count();
        assert!(covered > original, "adjacent windows should share text");
    }

    #[test]
    fn rejects_overlap_larger_than_window() {
        assert!(DocumentSplitter::new(&ChunkingSettings {
            chunk_size: 10,
            chunk_overlap: 20,
        })
        .is_err());
    }
}
