use std::path::Path;

use serde::Serialize;

use crate::aliases::AliasRegistry;
use crate::error::{LedgerError, Result};
use crate::mapper::{analyze_columns, ColumnMapping, EXACT_MATCH};
use crate::metrics::{aggregate, PartialMetrics};
use crate::models::{CellValue, RawTable, UploadRows, UploadType};
use crate::parser::{parse_records, passthrough_records};
use crate::validator::ensure_valid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Excel serial day number to an ISO date string.
pub fn excel_serial_to_date(serial: f64) -> Option<String> {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = chrono::NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = base.checked_add_signed(chrono::Duration::days(serial.trunc() as i64))?;
    Some(date.format("%Y-%m-%d").to_string())
}

/// UTF-8 when valid (minus any BOM), otherwise each byte read as Latin-1.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.strip_prefix('\u{feff}').unwrap_or(s).to_string(),
        Err(_) => {
            tracing::debug!("input is not UTF-8, decoding as latin1");
            bytes.iter().map(|&b| b as char).collect()
        }
    }
}

/// Blank headers become `Unnamed: N`; repeats get `.1`, `.2`, ... suffixes.
fn dedupe_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(raw.len());
    for (i, header) in raw.into_iter().enumerate() {
        let base = if header.trim().is_empty() {
            format!("Unnamed: {i}")
        } else {
            header
        };
        let mut name = base.clone();
        let mut n = 1;
        while seen.contains(&name) {
            name = format!("{base}.{n}");
            n += 1;
        }
        seen.push(name);
    }
    seen
}

/// Drop fully blank rows; a table with nothing left is an error.
fn finish_table(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<RawTable> {
    if headers.is_empty() {
        return Err(LedgerError::EmptyInput);
    }
    let rows: Vec<Vec<CellValue>> = rows
        .into_iter()
        .filter(|row| !row.iter().all(CellValue::is_blank))
        .collect();
    if rows.is_empty() {
        return Err(LedgerError::EmptyInput);
    }
    Ok(RawTable {
        headers: dedupe_headers(headers),
        rows,
    })
}

// ---------------------------------------------------------------------------
// Source formats: enum dispatch on file extension
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceFormat {
    Csv,
    #[cfg(feature = "xlsx")]
    Spreadsheet,
}

impl SourceFormat {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            #[cfg(feature = "xlsx")]
            Self::Spreadsheet => "spreadsheet",
        }
    }

    pub fn extensions(&self) -> &[&str] {
        match self {
            Self::Csv => &["csv"],
            #[cfg(feature = "xlsx")]
            Self::Spreadsheet => &["xlsx", "xlsm", "xls", "ods"],
        }
    }

    pub fn read(&self, bytes: &[u8]) -> Result<RawTable> {
        match self {
            Self::Csv => read_csv(bytes),
            #[cfg(feature = "xlsx")]
            Self::Spreadsheet => read_spreadsheet(bytes),
        }
    }
}

const ALL_FORMATS: &[SourceFormat] = &[
    SourceFormat::Csv,
    #[cfg(feature = "xlsx")]
    SourceFormat::Spreadsheet,
];

pub fn get_for_filename(filename: &str) -> Result<SourceFormat> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    ALL_FORMATS
        .iter()
        .find(|f| f.extensions().contains(&ext.as_str()))
        .copied()
        .ok_or_else(|| LedgerError::UnsupportedFormat(filename.to_string()))
}

/// Read a file's bytes into a table, choosing the reader by extension.
pub fn read_table(bytes: &[u8], filename: &str) -> Result<RawTable> {
    let format = get_for_filename(filename)?;
    let table = format.read(bytes)?;
    tracing::info!(
        format = format.key(),
        rows = table.rows.len(),
        columns = ?table.headers,
        "table loaded"
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

fn read_csv(bytes: &[u8]) -> Result<RawTable> {
    let text = decode_text(bytes);
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    let width = headers.len();
    let mut rows = Vec::new();

    for (i, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(row = i + 1, "unreadable CSV row skipped: {e}");
                continue;
            }
        };
        rows.push(
            (0..width)
                .map(|c| record.get(c).map(CellValue::from_text).unwrap_or_default())
                .collect(),
        );
    }

    finish_table(headers, rows)
}

// ---------------------------------------------------------------------------
// Spreadsheet reader (first worksheet only)
// ---------------------------------------------------------------------------

#[cfg(feature = "xlsx")]
fn spreadsheet_cell(data: &calamine::Data) -> CellValue {
    use calamine::Data;

    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.trim().is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            CellValue::Text(excel_serial_to_date(serial).unwrap_or_else(|| serial.to_string()))
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Error {
            error: e.to_string(),
        },
    }
}

#[cfg(feature = "xlsx")]
fn read_spreadsheet(bytes: &[u8]) -> Result<RawTable> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto_from_rs(std::io::Cursor::new(bytes.to_vec()))
        .map_err(|e| LedgerError::Spreadsheet(format!("Failed to open workbook: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(LedgerError::EmptyInput)?
        .map_err(|e| LedgerError::Spreadsheet(e.to_string()))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Err(LedgerError::EmptyInput);
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| spreadsheet_cell(cell).to_text())
        .collect();
    let body = rows.map(|row| row.iter().map(spreadsheet_cell).collect()).collect();

    finish_table(headers, body)
}

// ---------------------------------------------------------------------------
// Upload pipeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadResult {
    pub metrics: PartialMetrics,
    pub parsed_data: UploadRows,
    pub column_mapping: ColumnMapping,
    pub confidence: u8,
    pub rows_parsed: usize,
    pub rows_skipped: usize,
}

/// Read, map, validate and parse one upload. Nothing is persisted here; either
/// the whole batch comes back or the call fails.
pub fn process_upload(
    bytes: &[u8],
    filename: &str,
    upload_type: UploadType,
    registry: &AliasRegistry,
) -> Result<UploadResult> {
    tracing::info!(filename, upload_type = %upload_type, "processing upload");
    let table = read_table(bytes, filename)?;

    let result = if upload_type.is_auxiliary() {
        let records = passthrough_records(&table);
        UploadResult {
            metrics: PartialMetrics::default(),
            column_mapping: ColumnMapping::passthrough(&table.headers),
            confidence: EXACT_MATCH,
            rows_parsed: records.len(),
            rows_skipped: 0,
            parsed_data: UploadRows::Raw(records),
        }
    } else {
        let column_mapping = analyze_columns(&table.headers, registry);
        ensure_valid(&column_mapping, upload_type)?;
        let report = parse_records(&table, &column_mapping);
        UploadResult {
            metrics: aggregate(&report.records, upload_type),
            confidence: column_mapping.min_confidence,
            column_mapping,
            rows_parsed: report.records.len(),
            rows_skipped: report.zero_amount_rows + report.failed_rows.len(),
            parsed_data: UploadRows::Transactions(report.records),
        }
    };

    if result.rows_parsed == 0 {
        tracing::error!(filename, "no rows parsed");
        return Err(LedgerError::NoParsableRows);
    }
    tracing::info!(rows = result.rows_parsed, metrics = ?result.metrics, "upload processed");
    Ok(result)
}

pub fn process_file(path: &Path, upload_type: UploadType, registry: &AliasRegistry) -> Result<UploadResult> {
    let bytes = std::fs::read(path)?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    process_upload(&bytes, filename, upload_type, registry)
}
