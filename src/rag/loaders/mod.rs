//! Format-specific document adapters and the data-directory scan.
//!
//! Each adapter turns one file into documents; a file that fails is logged
//! and skipped so a single bad input never aborts ingestion.

mod docx;
mod pdf;
mod ratings;
mod tabular;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use super::document::Document;

pub use docx::{docx_xml_to_text, load_docx};
pub use pdf::load_pdf;
pub use ratings::load_professor_ratings;
pub use tabular::{load_coursebook_csv, load_grade_history_csv};

/// How a file in the data directory is ingested, decided from its suffix
/// and name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    Docx,
    CoursebookCsv,
    GradeHistoryCsv,
    ProfessorRatings,
}

impl SourceKind {
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Some(SourceKind::Pdf),
            "docx" => Some(SourceKind::Docx),
            "csv" if name.contains("coursebook") => Some(SourceKind::CoursebookCsv),
            "csv" if name.contains("filtered_") => Some(SourceKind::GradeHistoryCsv),
            "json" if name.contains("prof") || name.contains("review") => {
                Some(SourceKind::ProfessorRatings)
            }
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            SourceKind::Pdf => "PDF",
            SourceKind::Docx => "DOCX",
            SourceKind::CoursebookCsv => "Coursebook CSV",
            SourceKind::GradeHistoryCsv => "Grade History CSV",
            SourceKind::ProfessorRatings => "Professor Ratings JSON",
        }
    }
}

/// Loads one file with the adapter matching `kind`.
pub fn load_file(path: &Path, kind: SourceKind) -> anyhow::Result<Vec<Document>> {
    match kind {
        SourceKind::Pdf => load_pdf(path),
        SourceKind::Docx => load_docx(path),
        SourceKind::CoursebookCsv => load_coursebook_csv(path),
        SourceKind::GradeHistoryCsv => load_grade_history_csv(path),
        SourceKind::ProfessorRatings => load_professor_ratings(path),
    }
}

/// Scans `data_dir` (non-recursively, in file-name order) and loads every
/// supported file.
pub fn load_directory(data_dir: &Path) -> anyhow::Result<Vec<Document>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(data_dir)
        .with_context(|| format!("Failed to read data directory {}", data_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut documents = Vec::new();
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let Some(kind) = SourceKind::detect(&path) else {
            tracing::info!("Skipping unsupported file: {}", name);
            continue;
        };

        tracing::info!("Loading {}: {}", kind.label(), name);
        match load_file(&path, kind) {
            Ok(docs) => {
                tracing::debug!("{} yielded {} documents", name, docs.len());
                documents.extend(docs);
            }
            Err(err) => tracing::warn!("Error loading {}: {:#}", name, err),
        }
    }

    Ok(documents)
}

/// Plain file name used as the `source` provenance of record-based adapters.
fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}
