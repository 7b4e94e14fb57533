use std::path::Path;
use std::sync::OnceLock;

use anyhow::Context;
use regex::Regex;

use crate::rag::document::Document;

static TRAILING_SPACE: OnceLock<Regex> = OnceLock::new();
static BLANK_RUNS: OnceLock<Regex> = OnceLock::new();

/// Strips trailing blanks on each line and collapses runs of empty lines
/// left behind by positioned text operators.
fn tidy_page_text(raw: &str) -> String {
    let trailing = TRAILING_SPACE.get_or_init(|| Regex::new(r"[ \t]+\n").expect("static pattern"));
    let blanks = BLANK_RUNS.get_or_init(|| Regex::new(r"\n{3,}").expect("static pattern"));
    let text = trailing.replace_all(raw, "\n");
    blanks.replace_all(&text, "\n\n").trim().to_string()
}

/// One document per page; `page` is 0-based.
pub fn load_pdf(path: &Path) -> anyhow::Result<Vec<Document>> {
    let pdf = lopdf::Document::load(path)
        .with_context(|| format!("Failed to open PDF {}", path.display()))?;
    let source = path.to_string_lossy().to_string();

    let mut documents = Vec::new();
    for (index, page_number) in pdf.get_pages().keys().enumerate() {
        match pdf.extract_text(&[*page_number]) {
            Ok(text) => documents.push(
                Document::new(tidy_page_text(&text))
                    .with_meta("source", source.clone())
                    .with_meta("page", index as u64),
            ),
            Err(err) => {
                tracing::warn!(
                    "Skipping page {} of {}: {}",
                    page_number,
                    path.display(),
                    err
                );
            }
        }
    }

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    fn write_single_page_pdf(path: &Path, text: &str) {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[test]
    fn emits_one_document_per_page_with_path_and_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("handbook.pdf");
        write_single_page_pdf(&path, "Thesis track requires CS 6V98");

        let docs = load_pdf(&path).unwrap();

        assert_eq!(docs.len(), 1);
        assert!(docs[0].page_content.contains("Thesis track"));
        assert_eq!(docs[0].metadata["page"], 0);
        assert_eq!(docs[0].source(), Some(path.to_string_lossy().as_ref()));
    }

    #[test]
    fn page_text_is_tidied() {
        assert_eq!(
            tidy_page_text("  Degree Plan  \n\n\n\nCore courses\t\n"),
            "Degree Plan\n\nCore courses"
        );
    }

    #[test]
    fn rejects_non_pdf_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, "plain text").unwrap();

        assert!(load_pdf(&path).is_err());
    }
}
