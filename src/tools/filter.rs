//! Subsets semester enrollment exports down to the graduate CS courses the
//! grade-history loader ingests.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};

use crate::core::config::settings::FilterSettings;

const SUBJECT_COLUMN: &str = "Subject";
/// Older exports call the column `Catalog Number`.
const CATALOG_COLUMNS: [&str; 2] = ["Catalog Nbr", "Catalog Number"];

#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub output: PathBuf,
    pub kept: usize,
    pub total: usize,
}

/// Output path for `input`: `filtered_<name>` in the same directory.
pub fn filtered_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    input.with_file_name(format!("filtered_{}", name))
}

/// Filters every configured file in `data_dir`; a failing file is logged and
/// the rest still run.
pub fn filter_enrollment_files(data_dir: &Path, settings: &FilterSettings) -> Vec<FilterOutcome> {
    let mut outcomes = Vec::new();
    for file in &settings.files {
        let path = data_dir.join(file);
        tracing::info!("Processing file: {}", file);
        match filter_file(&path, settings) {
            Ok(outcome) => {
                tracing::info!(
                    "Filtered {}: kept {} of {} rows, saved to {}",
                    file,
                    outcome.kept,
                    outcome.total,
                    outcome.output.display()
                );
                outcomes.push(outcome);
            }
            Err(err) => tracing::warn!("Failed to filter {}: {:#}", file, err),
        }
    }
    outcomes
}

/// Rows are staged next to the output and only renamed into place once the
/// whole file filtered cleanly.
fn staging_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    output.with_file_name(format!(".{}.part", name))
}

/// Keeps rows whose subject matches and whose numeric catalog number lies in
/// the inclusive range. Every column is written back unchanged; short rows
/// are padded with empty fields up to the header width.
pub fn filter_file(path: &Path, settings: &FilterSettings) -> anyhow::Result<FilterOutcome> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let headers = reader.headers()?.clone();

    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
    };
    let subject_idx =
        position(SUBJECT_COLUMN).ok_or_else(|| anyhow!("missing column {}", SUBJECT_COLUMN))?;
    let catalog_idx = CATALOG_COLUMNS
        .iter()
        .find_map(|name| position(name))
        .ok_or_else(|| anyhow!("missing column {}", CATALOG_COLUMNS.join(" / ")))?;

    let output = filtered_path(path);
    let staging = staging_path(&output);
    let columns = Columns {
        subject: subject_idx,
        catalog: catalog_idx,
        width: headers.len(),
    };

    let counts = match write_matching_rows(&mut reader, &headers, columns, &staging, settings) {
        Ok(counts) => counts,
        Err(err) => {
            if let Err(cleanup) = fs::remove_file(&staging) {
                tracing::debug!("No staged output to remove at {}: {}", staging.display(), cleanup);
            }
            return Err(err);
        }
    };
    fs::rename(&staging, &output)
        .with_context(|| format!("Failed to move output into {}", output.display()))?;

    Ok(FilterOutcome {
        output,
        kept: counts.0,
        total: counts.1,
    })
}

#[derive(Clone, Copy)]
struct Columns {
    subject: usize,
    catalog: usize,
    width: usize,
}

/// Returns `(kept, total)`.
fn write_matching_rows(
    reader: &mut csv::Reader<fs::File>,
    headers: &csv::StringRecord,
    columns: Columns,
    staging: &Path,
    settings: &FilterSettings,
) -> anyhow::Result<(usize, usize)> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(staging)
        .with_context(|| format!("Failed to create {}", staging.display()))?;
    writer.write_record(headers)?;

    let mut kept = 0;
    let mut total = 0;
    for record in reader.records() {
        let record = record?;
        total += 1;

        let subject = record.get(columns.subject).unwrap_or_default().trim();
        let in_range = record
            .get(columns.catalog)
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .map(|n| n >= settings.min_catalog && n <= settings.max_catalog)
            .unwrap_or(false);

        if subject == settings.subject && in_range {
            let mut row: Vec<&str> = record.iter().collect();
            if row.len() < columns.width {
                row.resize(columns.width, "");
            }
            writer.write_record(&row)?;
            kept += 1;
        }
    }
    writer.flush()?;
    Ok((kept, total))
}
