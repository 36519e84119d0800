//! I/O error types for attrition-io.

use std::path::PathBuf;

/// Errors from reading training data and writing reports.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        path: PathBuf,
        offset: u64,
        source: csv::Error,
    },

    /// Returned when the CSV file has a header but no data rows.
    #[error("no employee rows in {path}")]
    EmptyDataset { path: PathBuf },

    /// Returned when the header lacks the `attrition` label column.
    #[error("missing required column \"attrition\" in {path}")]
    MissingLabelColumn { path: PathBuf },

    /// Returned when a data row has a different column count than the header.
    #[error("row {row_index} in {path} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        path: PathBuf,
        /// Zero-based, header excluded.
        row_index: usize,
        expected: usize,
        got: usize,
    },

    /// Returned when an `attrition` cell is neither `Yes` nor `No`.
    #[error("row {row_index} in {path}: attrition must be \"Yes\" or \"No\", got \"{raw}\"")]
    InvalidLabel {
        path: PathBuf,
        row_index: usize,
        raw: String,
    },

    /// Returned when a numeric column holds something other than a finite number.
    #[error("row {row_index} in {path}: column {column} is not a finite number: \"{raw}\"")]
    InvalidNumber {
        path: PathBuf,
        row_index: usize,
        column: String,
        raw: String,
    },

    /// Returned when a feature cell is empty.
    #[error("row {row_index} in {path}: column {column} is empty")]
    MissingValue {
        path: PathBuf,
        row_index: usize,
        column: String,
    },

    /// Returned when a report name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid report name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidReportName { name: String },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Returned when a report payload cannot be encoded as JSON.
    #[error("cannot encode report {path}")]
    EncodeReport {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Returned when a report file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },
}
