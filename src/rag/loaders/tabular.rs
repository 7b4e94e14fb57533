//! Record-per-row adapters for the two CSV schemas: the coursebook export
//! and the filtered grade-distribution history.

use std::path::Path;

use anyhow::Context;
use csv::StringRecord;

use super::file_name;
use crate::rag::document::{Document, MISSING_FIELD};

const GRADE_COLUMNS: [&str; 15] = [
    "A+", "A", "A-", "B+", "B", "B-", "C+", "C", "C-", "D+", "D", "D-", "F", "W", "P",
];

/// A CSV row addressed by (trimmed) header name.
struct Row<'a> {
    headers: &'a [String],
    record: StringRecord,
}

impl<'a> Row<'a> {
    fn get(&self, column: &str) -> Option<&str> {
        let index = self.headers.iter().position(|h| h == column)?;
        self.record.get(index)
    }

    fn field(&self, column: &str) -> &str {
        self.get(column).unwrap_or(MISSING_FIELD)
    }

    fn columns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(String::as_str)
            .zip(self.record.iter())
    }
}

fn read_rows<F>(path: &Path, mut on_row: F) -> anyhow::Result<()>
where
    F: FnMut(usize, &Row<'_>),
{
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    for (index, result) in reader.records().enumerate() {
        match result {
            Ok(record) => on_row(
                index,
                &Row {
                    headers: &headers,
                    record,
                },
            ),
            Err(err) => {
                tracing::warn!("Skipping row {} of {}: {}", index, path.display(), err);
            }
        }
    }

    Ok(())
}

pub fn load_coursebook_csv(path: &Path) -> anyhow::Result<Vec<Document>> {
    let source = file_name(path);
    let mut documents = Vec::new();

    read_rows(path, |index, row| {
        let page_content = format!(
            "Course Section: {} {}.{} (Class Number: {}). Title: {}. Instructor: {}. \
             Schedule: {} from {}. Location: {}. Status: {} ({}/{} enrolled).",
            row.field("course_prefix"),
            row.field("course_number"),
            row.field("section"),
            row.field("class_number"),
            row.field("title"),
            row.field("instructor_s"),
            row.field("days"),
            row.field("times_12h"),
            row.field("location"),
            row.field("enrolled_status"),
            row.field("enrolled_current"),
            row.field("enrolled_max"),
        );
        documents.push(
            Document::new(page_content)
                .with_meta("source", source.clone())
                .with_meta("row", index as u64)
                .with_meta(
                    "course",
                    format!(
                        "{} {}",
                        row.field("course_prefix"),
                        row.field("course_number")
                    ),
                ),
        );
    })?;

    Ok(documents)
}

pub fn load_grade_history_csv(path: &Path) -> anyhow::Result<Vec<Document>> {
    let source = file_name(path);
    let mut documents = Vec::new();

    read_rows(path, |index, row| {
        let catalog = row
            .get("Catalog Nbr")
            .or_else(|| row.get("Catalog Number"))
            .unwrap_or(MISSING_FIELD);
        let grades = row
            .columns()
            .filter(|(column, count)| GRADE_COLUMNS.contains(column) && !count.is_empty())
            .map(|(column, count)| format!("{}: {}", column, count))
            .collect::<Vec<_>>()
            .join(", ");
        let subject = row.field("Subject");
        let instructor = row.field("Instructor 1");

        let page_content = format!(
            "In a past semester, for course {} {} Section {}, the instructor {} \
             (and others: {}, {}) gave the following grades: {}.",
            subject,
            catalog,
            row.field("Section"),
            instructor,
            row.field("Instructor 2"),
            row.field("Instructor 3"),
            grades,
        );
        documents.push(
            Document::new(page_content)
                .with_meta("source", source.clone())
                .with_meta("row", index as u64)
                .with_meta("course", format!("{} {}", subject, catalog))
                .with_meta("professor", instructor),
        );
    })?;

    Ok(documents)
}
