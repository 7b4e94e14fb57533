use std::fs;
use std::path::Path;

use anyhow::Context;
use serde_json::{Map, Value};

use crate::rag::document::{Document, MISSING_FIELD};

/// Provenance tag for rating documents; the scraped site is not exposed.
const RATINGS_SOURCE: &str = "professor_reviews";

/// Reads `{ "<course>": [ { name, rating, difficulty, would_take_again } ] }`.
pub fn load_professor_ratings(path: &Path) -> anyhow::Result<Vec<Document>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let courses: Map<String, Value> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a course -> professors object", path.display()))?;

    let mut documents = Vec::new();
    for (course, professors) in &courses {
        let Some(professors) = professors.as_array() else {
            tracing::warn!("Skipping course {} in {}: expected a list", course, path.display());
            continue;
        };

        for professor in professors {
            let name = display_field(professor, "name");
            let page_content = format!(
                "For course CS {}, professor {} has a student rating of {}, a difficulty of {}, \
                 and {} of students would take them again.",
                course,
                name,
                display_field(professor, "rating"),
                display_field(professor, "difficulty"),
                display_field(professor, "would_take_again"),
            );
            documents.push(
                Document::new(page_content)
                    .with_meta("source", RATINGS_SOURCE)
                    .with_meta("course", course.clone())
                    .with_meta("professor", name),
            );
        }
    }

    tracing::info!(
        "Finished loading {} professor reviews from {}",
        documents.len(),
        path.display()
    );
    Ok(documents)
}

fn display_field(entry: &Value, key: &str) -> String {
    match entry.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => MISSING_FIELD.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn professor_entry_becomes_rating_sentence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("course_to_prof.json");
        fs::write(
            &path,
            r#"{"6350": [{"prof_id": "2038564", "name": "Ada Lovelace", "rating": "4.5",
                          "would_take_again": "88%", "difficulty": "3.2"}]}"#,
        )
        .unwrap();

        let docs = load_professor_ratings(&path).unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(
            docs[0].page_content,
            "For course CS 6350, professor Ada Lovelace has a student rating of 4.5, \
             a difficulty of 3.2, and 88% of students would take them again."
        );
        assert_eq!(
            Value::Object(docs[0].metadata.clone()),
            json!({ "source": "professor_reviews", "course": "6350", "professor": "Ada Lovelace" })
        );
    }

    #[test]
    fn missing_and_numeric_fields_are_rendered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prof_ratings.json");
        fs::write(
            &path,
            r#"{"6313": [{"rating": 3.9, "difficulty": null}], "6360": "oops"}"#,
        )
        .unwrap();

        let docs = load_professor_ratings(&path).unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(
            docs[0].page_content,
            "For course CS 6313, professor N/A has a student rating of 3.9, \
             a difficulty of N/A, and N/A of students would take them again."
        );
    }

    #[test]
    fn non_object_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prof.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        assert!(load_professor_ratings(&path).is_err());
    }
}
