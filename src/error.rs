use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Unsupported file format: {0}. Please upload CSV or XLSX.")]
    UnsupportedFormat(String),

    #[error("Uploaded file has no rows")]
    EmptyInput,

    #[error("Missing required fields for {upload_type}: {}", missing.join(", "))]
    MissingRequiredFields {
        upload_type: String,
        missing: Vec<String>,
    },

    #[error("No valid data rows could be parsed. Check column names and data format.")]
    NoParsableRows,

    #[error("Unknown upload type: {0}")]
    UnknownUploadType(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Failure of a single input row. The batch logs these and moves on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("row {row}: amount in column '{column}' is not a finite number ({raw})")]
    NonFiniteAmount {
        row: usize,
        column: String,
        raw: String,
    },

    #[error("row {row}: column '{column}' holds a spreadsheet error ({value})")]
    CellError {
        row: usize,
        column: String,
        value: String,
    },
}
