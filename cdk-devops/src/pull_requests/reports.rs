//! Reading CI output files and turning validation reports into markdown.

use super::CommentError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

/// Reads a CI output file.
///
/// Returns `Ok(None)` if the file does not exist.
///
/// # Errors
///
/// Returns [`CommentError::Io`] for any other read failure.
pub async fn read_output_file(path: &Path) -> Result<Option<String>, CommentError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            error!(path = %path.display(), "Output file not found");
            Ok(None)
        }
        Err(source) => {
            error!(path = %path.display(), error = %source, "Failed to read output file");
            Err(CommentError::Io {
                path: path.display().to_string(),
                source,
            })
        }
    }
}

/// Lists the `*.csv` files of `dir`, sorted by name.
///
/// A missing directory yields an empty list.
///
/// # Errors
///
/// Returns [`CommentError::Io`] if the directory cannot be read.
pub async fn list_reports(dir: &Path) -> Result<Vec<PathBuf>, CommentError> {
    let io_error = |source| CommentError::Io {
        path: dir.display().to_string(),
        source,
    };

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %dir.display(), "Report directory does not exist");
            return Ok(Vec::new());
        }
        Err(e) => return Err(io_error(e)),
    };

    let mut reports = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
            reports.push(path);
        }
    }
    reports.sort();
    Ok(reports)
}

/// Converts CSV data into a markdown table.
///
/// The first record is the header row. Rows are padded or cut to the header
/// width. Returns `Ok(None)` when there are no data rows.
///
/// # Errors
///
/// Returns the underlying [`csv::Error`] for malformed input.
pub fn csv_to_markdown(reader: impl Read) -> Result<Option<String>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(escape_cell).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut cells: Vec<String> = record.iter().map(escape_cell).collect();
        cells.resize(headers.len(), String::new());
        rows.push(cells);
    }

    if headers.is_empty() || rows.is_empty() {
        return Ok(None);
    }

    let mut table = String::new();
    push_row(&mut table, &headers);
    push_row(&mut table, &vec!["---".to_string(); headers.len()]);
    for row in &rows {
        push_row(&mut table, row);
    }
    Ok(Some(table))
}

fn push_row(table: &mut String, cells: &[String]) {
    table.push_str("| ");
    table.push_str(&cells.join(" | "));
    table.push_str(" |\n");
}

fn escape_cell(cell: &str) -> String {
    cell.trim()
        .replace('|', "\\|")
        .replace("\r\n", "<br>")
        .replace('\n', "<br>")
}
