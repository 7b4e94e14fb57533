use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use crate::rag::document::Document;

const DOCUMENT_PART: &str = "word/document.xml";

/// Whole Word document as one text document.
pub fn load_docx(path: &Path) -> anyhow::Result<Vec<Document>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("{} is not a valid .docx container", path.display()))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .with_context(|| format!("{} has no {}", path.display(), DOCUMENT_PART))?
        .read_to_string(&mut xml)?;

    let text = docx_xml_to_text(&xml)?;
    Ok(vec![
        Document::new(text).with_meta("source", path.to_string_lossy().to_string())
    ])
}

/// Flattens WordprocessingML runs: paragraphs and breaks become newlines,
/// tabs stay tabs, everything outside `w:t` is dropped.
pub fn docx_xml_to_text(xml: &str) -> anyhow::Result<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_run_text = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_run_text => text.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const BODY: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Data Science Track</w:t></w:r></w:p>
    <w:p><w:r><w:t xml:space="preserve">Core: </w:t></w:r><w:r><w:tab/><w:t>CS 6313 &amp; CS 6350</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    #[test]
    fn flattens_paragraphs_tabs_and_entities() {
        let text = docx_xml_to_text(BODY).unwrap();
        assert_eq!(text, "Data Science Track\nCore: \tCS 6313 & CS 6350");
    }

    #[test]
    fn loads_document_part_from_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.docx");
        let mut writer = ZipWriter::new(File::create(&path).unwrap());
        writer
            .start_file(DOCUMENT_PART, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(BODY.as_bytes()).unwrap();
        writer.finish().unwrap();

        let docs = load_docx(&path).unwrap();

        assert_eq!(docs.len(), 1);
        assert!(docs[0].page_content.starts_with("Data Science Track"));
        assert_eq!(docs[0].source(), Some(path.to_string_lossy().as_ref()));
    }
}
