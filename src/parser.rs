use crate::aliases::StandardField;
use crate::error::RowError;
use crate::mapper::ColumnMapping;
use crate::models::{CellValue, Direction, NormalizedRecord, PaymentStatus, RawRecord, RawTable};

const DEBIT_MARKERS: &[&str] = &["debit", "dr", "expense", "payment"];
const UNPAID_MARKERS: &[&str] = &["unpaid", "pending", "due", "overdue"];

/// Clean a money string: drop currency symbols, commas and whitespace; `(x)` means `-x`.
/// Anything still non-numeric is 0.0.
pub fn parse_amount(raw: &str) -> f64 {
    let s: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | '₹' | '€' | '£' | ',') && !c.is_whitespace())
        .collect();
    if s.is_empty() {
        return 0.0;
    }
    let parsed: Option<f64> = match s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => format!("-{inner}").parse().ok(),
        None => s.parse().ok(),
    };
    // "nan" and "inf" parse as floats but are not amounts
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Numeric value of a cell. Spreadsheet error cells have no value.
pub fn cell_amount(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Empty => Some(0.0),
        CellValue::Number(n) => Some(*n),
        CellValue::Text(s) => Some(parse_amount(s)),
        CellValue::Error { .. } => None,
    }
}

/// Column positions of the canonical fields, first mapped column per field.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FieldColumns {
    pub date: Option<usize>,
    pub amount: Option<usize>,
    pub credit: Option<usize>,
    pub debit: Option<usize>,
    pub kind: Option<usize>,
    pub description: Option<usize>,
    pub status: Option<usize>,
}

impl FieldColumns {
    pub fn resolve(mapping: &ColumnMapping, table: &RawTable) -> Self {
        let index = |field: StandardField| {
            mapping
                .column_for(field)
                .and_then(|name| table.column_index(name))
        };
        Self {
            date: index(StandardField::Date),
            amount: index(StandardField::Amount),
            credit: index(StandardField::Credit),
            debit: index(StandardField::Debit),
            kind: index(StandardField::Type),
            description: index(StandardField::Description),
            status: index(StandardField::Status),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Record(NormalizedRecord),
    /// Resolved amount was zero; the row is dropped without complaint.
    ZeroAmount,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseReport {
    pub records: Vec<NormalizedRecord>,
    pub zero_amount_rows: usize,
    pub failed_rows: Vec<RowError>,
}

fn amount_at(table: &RawTable, row: usize, column: usize) -> Result<f64, RowError> {
    let cell = table.cell(row, column);
    let column_name = || table.headers.get(column).cloned().unwrap_or_default();
    let value = cell_amount(cell).ok_or_else(|| RowError::CellError {
        row: row + 1,
        column: column_name(),
        value: cell.to_text(),
    })?;
    if !value.is_finite() {
        return Err(RowError::NonFiniteAmount {
            row: row + 1,
            column: column_name(),
            raw: cell.to_text(),
        });
    }
    Ok(value)
}

fn text_at(table: &RawTable, row: usize, column: Option<usize>) -> Option<String> {
    column.map(|c| table.cell(row, c).to_text())
}

fn contains_any(text: &str, markers: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    markers.iter().any(|m| lowered.contains(m))
}

fn resolve_amount(
    table: &RawTable,
    row: usize,
    cols: &FieldColumns,
) -> Result<(f64, Direction), RowError> {
    match (cols.credit, cols.debit, cols.amount) {
        (Some(credit_col), Some(debit_col), _) => {
            let credit = amount_at(table, row, credit_col)?;
            let debit = amount_at(table, row, debit_col)?;
            if credit > 0.0 {
                Ok((credit, Direction::Credit))
            } else if debit > 0.0 {
                Ok((debit, Direction::Debit))
            } else {
                Ok((0.0, Direction::Credit))
            }
        }
        (_, _, Some(amount_col)) => {
            let amount = amount_at(table, row, amount_col)?;
            let direction = match text_at(table, row, cols.kind) {
                Some(kind) if contains_any(&kind, DEBIT_MARKERS) => Direction::Debit,
                Some(_) => Direction::Credit,
                None if amount < 0.0 => Direction::Debit,
                None => Direction::Credit,
            };
            Ok((amount.abs(), direction))
        }
        (Some(credit_col), None, None) => {
            Ok((amount_at(table, row, credit_col)?.abs(), Direction::Credit))
        }
        (None, Some(debit_col), None) => {
            Ok((amount_at(table, row, debit_col)?.abs(), Direction::Debit))
        }
        (None, None, None) => Ok((0.0, Direction::Credit)),
    }
}

/// Turn one table row into a normalized record.
pub fn parse_row(table: &RawTable, row: usize, cols: &FieldColumns) -> Result<RowOutcome, RowError> {
    let (amount, direction) = resolve_amount(table, row, cols)?;
    if amount == 0.0 {
        return Ok(RowOutcome::ZeroAmount);
    }

    let date = match cols.date {
        Some(c) => {
            let cell = table.cell(row, c);
            (!cell.is_blank()).then(|| cell.to_text())
        }
        // No date column: the row position stands in as a key
        None => Some(row.to_string()),
    };

    let status = match text_at(table, row, cols.status) {
        Some(s) if contains_any(&s, UNPAID_MARKERS) => PaymentStatus::Unpaid,
        _ => PaymentStatus::Paid,
    };

    Ok(RowOutcome::Record(NormalizedRecord {
        date,
        amount,
        direction,
        status,
        description: text_at(table, row, cols.description).unwrap_or_default(),
    }))
}

/// Parse every row; bad rows are logged and skipped, never fatal.
pub fn parse_records(table: &RawTable, mapping: &ColumnMapping) -> ParseReport {
    let cols = FieldColumns::resolve(mapping, table);
    let mut report = ParseReport::default();

    for row in 0..table.rows.len() {
        match parse_row(table, row, &cols) {
            Ok(RowOutcome::Record(record)) => report.records.push(record),
            Ok(RowOutcome::ZeroAmount) => report.zero_amount_rows += 1,
            Err(e) => {
                tracing::warn!("{e}");
                report.failed_rows.push(e);
            }
        }
    }

    tracing::info!(
        parsed = report.records.len(),
        zero_amount = report.zero_amount_rows,
        failed = report.failed_rows.len(),
        "rows parsed"
    );
    report
}

/// Inventory and loan rows: every column kept verbatim, blanks as explicit empties.
pub fn passthrough_records(table: &RawTable) -> Vec<RawRecord> {
    table
        .rows
        .iter()
        .map(|row| {
            table
                .headers
                .iter()
                .enumerate()
                .map(|(i, header)| {
                    let cell = match row.get(i) {
                        Some(c) if !c.is_blank() => c.clone(),
                        _ => CellValue::Empty,
                    };
                    (header.clone(), cell)
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aliases::AliasRegistry;
    use crate::mapper::analyze_columns;

    fn text(s: &str) -> CellValue {
        CellValue::from_text(s)
    }

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| text(c)).collect())
                .collect(),
        }
    }

    fn parse(t: &RawTable) -> ParseReport {
        let mapping = analyze_columns(&t.headers, &AliasRegistry::default());
        parse_records(t, &mapping)
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,234.56"), 1234.56);
        assert_eq!(parse_amount("  -42.50  "), -42.5);
        assert_eq!(parse_amount("0"), 0.0);
        assert_eq!(parse_amount("not_a_number"), 0.0);
        assert_eq!(parse_amount(""), 0.0);
        assert_eq!(parse_amount("nan"), 0.0);
        assert_eq!(parse_amount("inf"), 0.0);
        assert_eq!(parse_amount("-Infinity"), 0.0);
    }

    #[test]
    fn test_parse_amount_parenthesized_negatives() {
        assert_eq!(parse_amount("(1,234.50)"), -1234.5);
        assert_eq!(parse_amount("( 500 )"), -500.0);
        assert_eq!(parse_amount("(-5)"), 0.0);
    }

    #[test]
    fn test_parse_amount_currency_symbols() {
        assert_eq!(parse_amount("₹1,000"), 1000.0);
        assert_eq!(parse_amount("$ 12.5"), 12.5);
        assert_eq!(parse_amount("€7"), 7.0);
        assert_eq!(parse_amount("-£3.25"), -3.25);
        assert_eq!(parse_amount("Rs. 100"), 0.0);
    }

    #[test]
    fn test_cell_amount_error_cell_has_no_value() {
        assert_eq!(cell_amount(&CellValue::Empty), Some(0.0));
        assert_eq!(cell_amount(&CellValue::Number(-3.0)), Some(-3.0));
        assert_eq!(cell_amount(&CellValue::Error { error: "#REF!".into() }), None);
    }

    #[test]
    fn test_bank_amount_with_type_column() {
        let t = table(
            &["Date", "Amount", "Type"],
            &[
                &["2024-01-01", "5000", "Credit"],
                &["2024-01-02", "100", "Debit"],
                &["2024-01-03", "200", "DR"],
            ],
        );
        let report = parse(&t);
        assert_eq!(report.records.len(), 3);
        assert_eq!(report.records[0].direction, Direction::Credit);
        assert_eq!(report.records[1].direction, Direction::Debit);
        assert_eq!(report.records[2].direction, Direction::Debit);
        assert_eq!(report.records[2].amount, 200.0);
        assert_eq!(report.records[0].date.as_deref(), Some("2024-01-01"));
    }

    #[test]
    fn test_type_column_keeps_amount_non_negative() {
        let t = table(&["Date", "Amount", "Type"], &[&["2024-01-01", "-75", "payment"]]);
        let report = parse(&t);
        assert_eq!(report.records[0].amount, 75.0);
        assert_eq!(report.records[0].direction, Direction::Debit);
    }

    #[test]
    fn test_signed_amount_without_type_column() {
        let t = table(
            &["Date", "Amount"],
            &[&["2024-01-01", "(250.00)"], &["2024-01-02", "₹1,000"]],
        );
        let report = parse(&t);
        assert_eq!(report.records[0].amount, 250.0);
        assert_eq!(report.records[0].direction, Direction::Debit);
        assert_eq!(report.records[1].amount, 1000.0);
        assert_eq!(report.records[1].direction, Direction::Credit);
    }

    #[test]
    fn test_credit_debit_columns_prefer_credit() {
        let t = table(
            &["Date", "Credit", "Debit"],
            &[
                &["2024-01-01", "300", "50"],
                &["2024-01-02", "", "80"],
                &["2024-01-03", "0", "0"],
            ],
        );
        let report = parse(&t);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].amount, 300.0);
        assert_eq!(report.records[0].direction, Direction::Credit);
        assert_eq!(report.records[1].amount, 80.0);
        assert_eq!(report.records[1].direction, Direction::Debit);
        assert_eq!(report.zero_amount_rows, 1);
    }

    #[test]
    fn test_single_credit_or_debit_column() {
        let credit_only = table(&["Date", "Deposits"], &[&["2024-01-01", "40"]]);
        assert_eq!(parse(&credit_only).records[0].direction, Direction::Credit);

        let debit_only = table(&["Date", "Withdrawals"], &[&["2024-01-01", "40"]]);
        assert_eq!(parse(&debit_only).records[0].direction, Direction::Debit);
    }

    #[test]
    fn test_zero_rows_are_never_emitted() {
        let t = table(
            &["Date", "Amount"],
            &[&["2024-01-01", "0"], &["2024-01-02", "abc"], &["2024-01-03", ""]],
        );
        let report = parse(&t);
        assert!(report.records.is_empty());
        assert_eq!(report.zero_amount_rows, 3);
        assert!(report.failed_rows.is_empty());
    }

    #[test]
    fn test_status_detection() {
        let t = table(
            &["Invoice Date", "Amount", "Status"],
            &[
                &["2024-02-01", "10", "Pending"],
                &["2024-02-02", "10", "Overdue"],
                &["2024-02-03", "10", "Paid"],
                &["2024-02-04", "10", ""],
            ],
        );
        let statuses: Vec<PaymentStatus> = parse(&t).records.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                PaymentStatus::Unpaid,
                PaymentStatus::Unpaid,
                PaymentStatus::Paid,
                PaymentStatus::Paid
            ]
        );
    }

    #[test]
    fn test_description_and_missing_date() {
        let t = table(
            &["Date", "Amount", "Narration"],
            &[&["", "10", "Office rent"]],
        );
        let record = &parse(&t).records[0];
        assert_eq!(record.date, None);
        assert_eq!(record.description, "Office rent");
    }

    #[test]
    fn test_row_index_stands_in_for_absent_date_column() {
        let t = table(&["Credit", "Debit"], &[&["10", ""], &["", "5"]]);
        let report = parse(&t);
        assert_eq!(report.records[0].date.as_deref(), Some("0"));
        assert_eq!(report.records[1].date.as_deref(), Some("1"));
        assert_eq!(report.records[1].description, "");
    }

    #[test]
    fn test_bad_rows_are_skipped_not_fatal() {
        let mut t = table(
            &["Date", "Amount"],
            &[&["2024-01-01", "10"], &["2024-01-02", "1"], &["2024-01-03", "2"]],
        );
        t.rows[1][1] = CellValue::Error { error: "#DIV/0!".into() };
        t.rows[2][1] = CellValue::Number(f64::INFINITY);
        let report = parse(&t);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.failed_rows.len(), 2);
        assert!(matches!(report.failed_rows[0], RowError::CellError { row: 2, .. }));
        assert!(matches!(report.failed_rows[1], RowError::NonFiniteAmount { row: 3, .. }));
    }

    #[test]
    fn test_nan_text_counts_as_zero_amount() {
        let t = table(&["Date", "Amount"], &[&["2024-01-01", "nan"], &["2024-01-02", "inf"]]);
        let report = parse(&t);
        assert!(report.records.is_empty());
        assert_eq!(report.zero_amount_rows, 2);
        assert!(report.failed_rows.is_empty());
    }

    #[test]
    fn test_short_rows_read_as_empty() {
        let mut t = table(&["Date", "Amount", "Remarks"], &[&["2024-01-01", "10", "x"]]);
        t.rows[0].truncate(2);
        let report = parse(&t);
        assert_eq!(report.records[0].description, "");
    }

    #[test]
    fn test_passthrough_keeps_every_column() {
        let t = table(&["item_name", "qty", "note"], &[&["Bolts", "10", " "]]);
        let rows = passthrough_records(&t);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["item_name"], CellValue::Text("Bolts".into()));
        assert_eq!(rows[0]["qty"], CellValue::Number(10.0));
        assert_eq!(rows[0]["note"], CellValue::Empty);
    }
}
