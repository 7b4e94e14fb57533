//! Retrieval-augmented generation: ingestion, chunking, the similarity
//! index and the question-answering chain.

pub mod builder;
pub mod chain;
pub mod document;
pub mod index;
pub mod loaders;
pub mod persistence;
pub mod prompt;
pub mod splitter;

pub use builder::IndexBuilder;
pub use chain::{Answerer, RagChain};
pub use document::Document;
pub use index::FlatIndex;
pub use persistence::{IndexLoader, IndexSource};
pub use splitter::DocumentSplitter;
