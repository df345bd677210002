use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn a source file into a `Dataset`. Fatal for the whole dashboard.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open spreadsheet '{}': {source}", path.display())]
    Spreadsheet {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("spreadsheet '{}' has no worksheet with a header row", path.display())]
    NoWorksheet { path: PathBuf },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidJson(String),

    #[error("unsupported input format: '{}'", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("column '{0}' appears more than once after trimming")]
    DuplicateColumn(String),

    #[error("row {row} has {found} fields, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row}, column '{column}': {detail}")]
    BadCell {
        row: usize,
        column: String,
        detail: String,
    },
}

/// Failure of a single analytical view. Other views are unaffected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewError {
    #[error("column '{column}' not found")]
    MissingColumn { column: String },

    #[error("column '{column}' row {row}: '{value}' is not numeric")]
    NotNumeric {
        column: String,
        row: usize,
        value: String,
    },
}

impl ViewError {
    pub fn missing(column: &str) -> Self {
        ViewError::MissingColumn {
            column: column.to_string(),
        }
    }
}
