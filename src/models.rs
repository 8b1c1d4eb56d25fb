use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Declared kind of an uploaded spreadsheet. Supplied by the caller, never inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadType {
    Bank,
    Sales,
    Purchase,
    Inventory,
    Loan,
}

impl UploadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bank => "bank",
            Self::Sales => "sales",
            Self::Purchase => "purchase",
            Self::Inventory => "inventory",
            Self::Loan => "loan",
        }
    }

    /// Inventory and loan sheets skip column mapping and carry no cash metrics.
    pub fn is_auxiliary(&self) -> bool {
        matches!(self, Self::Inventory | Self::Loan)
    }

    /// Filename prefix used when an auxiliary upload is stored under `bank`.
    pub fn storage_tag(&self) -> Option<&'static str> {
        match self {
            Self::Inventory => Some("[INVENTORY]"),
            Self::Loan => Some("[LOAN]"),
            _ => None,
        }
    }

    /// The type the uploads table accepts for this upload.
    pub fn storage_type(&self) -> UploadType {
        if self.is_auxiliary() {
            Self::Bank
        } else {
            *self
        }
    }
}

impl fmt::Display for UploadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploadType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bank" => Ok(Self::Bank),
            "sales" => Ok(Self::Sales),
            "purchase" => Ok(Self::Purchase),
            "inventory" => Ok(Self::Inventory),
            "loan" => Ok(Self::Loan),
            other => Err(LedgerError::UnknownUploadType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Credit,
    Debit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
}

/// A single spreadsheet cell as read from the file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    /// Spreadsheet error value such as `#DIV/0!`.
    Error { error: String },
}

impl CellValue {
    /// Build a cell from CSV text, inferring plain numbers the way spreadsheet tools do.
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Self::Number(n),
            _ => Self::Text(raw.to_string()),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text rendering used for dates, descriptions and keyword checks.
    pub fn to_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
            Self::Error { error } => error.clone(),
        }
    }
}

/// Rows exactly as read: header names plus one cell per header per row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn cell(&self, row: usize, column: usize) -> &CellValue {
        const EMPTY: &CellValue = &CellValue::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(EMPTY)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Pass-through row for inventory and loan uploads, keyed by original column name.
pub type RawRecord = BTreeMap<String, CellValue>;

/// One transaction after column mapping and amount/direction resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub date: Option<String>,
    pub amount: f64,
    pub direction: Direction,
    pub status: PaymentStatus,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Income,
    Expense,
    Uncategorized,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedRecord {
    #[serde(flatten)]
    pub record: NormalizedRecord,
    pub category: Category,
    pub subcategory: String,
    pub is_cash: bool,
}

/// Stored rows of an upload; the variant follows the upload's effective type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UploadRows {
    Transactions(Vec<NormalizedRecord>),
    Raw(Vec<RawRecord>),
}

impl UploadRows {
    pub fn len(&self) -> usize {
        match self {
            Self::Transactions(rows) => rows.len(),
            Self::Raw(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn transactions(&self) -> &[NormalizedRecord] {
        match self {
            Self::Transactions(rows) => rows,
            Self::Raw(_) => &[],
        }
    }

    pub fn raw(&self) -> &[RawRecord] {
        match self {
            Self::Raw(rows) => rows,
            Self::Transactions(_) => &[],
        }
    }
}

/// A previously stored upload as handed back by the persistence layer.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRecord {
    pub id: i64,
    pub filename: String,
    /// Type as stored; auxiliary uploads appear here as `Bank`.
    pub file_type: UploadType,
    pub status: String,
    pub rows: UploadRows,
}

impl UploadRecord {
    /// Recover the declared type, honoring both literal types and filename tags.
    pub fn effective_type(&self) -> UploadType {
        if self.file_type.is_auxiliary() {
            return self.file_type;
        }
        if self.file_type == UploadType::Bank {
            for aux in [UploadType::Inventory, UploadType::Loan] {
                if let Some(tag) = aux.storage_tag() {
                    if self.filename.starts_with(tag) {
                        return aux;
                    }
                }
            }
        }
        self.file_type
    }

    pub fn is_auxiliary(&self) -> bool {
        self.effective_type().is_auxiliary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(file_type: UploadType, filename: &str) -> UploadRecord {
        UploadRecord {
            id: 1,
            filename: filename.to_string(),
            file_type,
            status: "completed".to_string(),
            rows: UploadRows::Transactions(Vec::new()),
        }
    }

    #[test]
    fn test_upload_type_parse() {
        assert_eq!("Bank".parse::<UploadType>().unwrap(), UploadType::Bank);
        assert_eq!(" loan ".parse::<UploadType>().unwrap(), UploadType::Loan);
        assert!("ledger".parse::<UploadType>().is_err());
    }

    #[test]
    fn test_storage_type_masks_auxiliary() {
        assert_eq!(UploadType::Inventory.storage_type(), UploadType::Bank);
        assert_eq!(UploadType::Loan.storage_type(), UploadType::Bank);
        assert_eq!(UploadType::Sales.storage_type(), UploadType::Sales);
    }

    #[test]
    fn test_effective_type_reads_filename_tag() {
        assert_eq!(
            upload(UploadType::Bank, "[INVENTORY] stock.csv").effective_type(),
            UploadType::Inventory
        );
        assert_eq!(
            upload(UploadType::Bank, "[LOAN] loans.xlsx").effective_type(),
            UploadType::Loan
        );
        assert_eq!(upload(UploadType::Bank, "hdfc.csv").effective_type(), UploadType::Bank);
        assert_eq!(upload(UploadType::Loan, "loans.csv").effective_type(), UploadType::Loan);
        // Tags only mean something on rows stored as bank
        assert_eq!(
            upload(UploadType::Sales, "[LOAN] odd.csv").effective_type(),
            UploadType::Sales
        );
    }

    #[test]
    fn test_cell_from_text_infers_numbers() {
        assert_eq!(CellValue::from_text("42.5"), CellValue::Number(42.5));
        assert_eq!(CellValue::from_text("  "), CellValue::Empty);
        assert_eq!(CellValue::from_text("1,000"), CellValue::Text("1,000".to_string()));
        assert_eq!(CellValue::from_text("NaN"), CellValue::Text("NaN".to_string()));
    }

    #[test]
    fn test_cell_json_shape() {
        let row: RawRecord = [
            ("item".to_string(), CellValue::Text("Bolts".to_string())),
            ("qty".to_string(), CellValue::Number(10.0)),
            ("note".to_string(), CellValue::Empty),
        ]
        .into_iter()
        .collect();
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"item":"Bolts","note":null,"qty":10.0}"#);
        let back: RawRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn test_number_to_text_drops_trailing_zero() {
        assert_eq!(CellValue::Number(5000.0).to_text(), "5000");
        assert_eq!(CellValue::Number(12.75).to_text(), "12.75");
    }
}
