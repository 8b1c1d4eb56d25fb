use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::categorizer::{classify, KeywordTable};
use crate::dates::{parse_month, MonthKey};
use crate::fmt::round2;
use crate::mapper::normalize_column_name;
use crate::models::{CellValue, Category, RawRecord, UploadRecord, UploadType};
use crate::parser::cell_amount;

const TOP_EXPENSE_CATEGORIES: usize = 10;
const TOP_INVENTORY_ITEMS: usize = 10;
const MIN_TRANSACTIONS: usize = 3;

// ---------------------------------------------------------------------------
// Bookkeeping summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthAmount {
    pub month: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryAmount {
    pub category: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookkeepingSummary {
    pub total_income: f64,
    pub total_expenses: f64,
    pub net_balance: f64,
    pub monthly_income: Vec<MonthAmount>,
    pub monthly_expenses: Vec<MonthAmount>,
    pub expense_categories: Vec<CategoryAmount>,
    pub cash_transactions: usize,
    pub non_cash_transactions: usize,
    pub total_transactions: usize,
    pub has_sufficient_data: bool,
}

fn month_series(buckets: BTreeMap<MonthKey, f64>) -> Vec<MonthAmount> {
    buckets
        .into_iter()
        .map(|(month, amount)| MonthAmount {
            month: month.label(),
            amount: round2(amount),
        })
        .collect()
}

/// Classify every transaction of the bank/sales/purchase uploads and total them
/// by category and calendar month. Undated records still count toward totals.
pub fn bookkeeping_summary(uploads: &[UploadRecord], keywords: &KeywordTable) -> BookkeepingSummary {
    let mut total_income = 0.0;
    let mut total_expenses = 0.0;
    let mut monthly_income: BTreeMap<MonthKey, f64> = BTreeMap::new();
    let mut monthly_expenses: BTreeMap<MonthKey, f64> = BTreeMap::new();
    // Insertion order breaks ties between equal category totals
    let mut categories: Vec<(String, f64)> = Vec::new();
    let mut cash_transactions = 0;
    let mut non_cash_transactions = 0;

    for upload in uploads.iter().filter(|u| !u.is_auxiliary()) {
        let upload_type = upload.effective_type();
        for record in upload.rows.transactions() {
            let classified = classify(record, upload_type, keywords);
            let amount = classified.record.amount;
            let month = classified.record.date.as_deref().and_then(parse_month);

            match classified.category {
                Category::Income => {
                    total_income += amount;
                    if let Some(m) = month {
                        *monthly_income.entry(m).or_default() += amount;
                    }
                }
                Category::Expense => {
                    total_expenses += amount;
                    match categories.iter_mut().find(|(name, _)| *name == classified.subcategory) {
                        Some((_, total)) => *total += amount,
                        None => categories.push((classified.subcategory.clone(), amount)),
                    }
                    if let Some(m) = month {
                        *monthly_expenses.entry(m).or_default() += amount;
                    }
                }
                Category::Uncategorized => {}
            }

            if classified.is_cash {
                cash_transactions += 1;
            } else {
                non_cash_transactions += 1;
            }
        }
    }

    categories.sort_by(|a, b| b.1.total_cmp(&a.1));
    let total_transactions = cash_transactions + non_cash_transactions;
    tracing::info!(total_transactions, "bookkeeping summary built");

    BookkeepingSummary {
        total_income: round2(total_income),
        total_expenses: round2(total_expenses),
        net_balance: round2(total_income - total_expenses),
        monthly_income: month_series(monthly_income),
        monthly_expenses: month_series(monthly_expenses),
        expense_categories: categories
            .into_iter()
            .take(TOP_EXPENSE_CATEGORIES)
            .map(|(category, amount)| CategoryAmount {
                category,
                amount: round2(amount),
            })
            .collect(),
        cash_transactions,
        non_cash_transactions,
        total_transactions,
        has_sufficient_data: total_transactions >= MIN_TRANSACTIONS,
    }
}

// ---------------------------------------------------------------------------
// Pass-through field lookup
// ---------------------------------------------------------------------------

/// A pass-through row keyed by normalized column name.
struct FieldLookup<'a> {
    cells: HashMap<String, &'a CellValue>,
}

impl<'a> FieldLookup<'a> {
    fn new(record: &'a RawRecord) -> Self {
        let mut cells = HashMap::new();
        for (column, cell) in record {
            // Duplicate normalized names keep the first column
            cells.entry(normalize_column_name(column)).or_insert(cell);
        }
        Self { cells }
    }

    /// First non-blank text among the candidate columns.
    fn text(&self, candidates: &[&str]) -> Option<String> {
        candidates.iter().find_map(|key| {
            let cell = self.cells.get(*key)?;
            let text = cell.to_text();
            (!cell.is_blank() && !text.trim().is_empty()).then_some(text)
        })
    }

    /// First non-zero number among the candidate columns, else 0.
    fn number(&self, candidates: &[&str]) -> f64 {
        candidates
            .iter()
            .filter_map(|key| self.cells.get(*key))
            .filter_map(|cell| cell_amount(cell))
            .find(|v| *v != 0.0 && v.is_finite())
            .unwrap_or(0.0)
    }
}

fn auxiliary_rows(uploads: &[UploadRecord], upload_type: UploadType) -> impl Iterator<Item = &RawRecord> {
    uploads
        .iter()
        .filter(move |u| u.effective_type() == upload_type)
        .flat_map(|u| u.rows.raw())
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

const ITEM_NAME_FIELDS: &[&str] = &["item_name", "name", "product", "description"];
const QUANTITY_FIELDS: &[&str] = &["quantity", "qty", "stock"];
const UNIT_VALUE_FIELDS: &[&str] = &["unit_value", "value", "price", "rate"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryItem {
    pub item_name: String,
    pub quantity: i64,
    pub unit_value: f64,
    pub total_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventorySummary {
    pub total_items: usize,
    pub total_quantity: i64,
    pub total_value: f64,
    pub top_items: Vec<InventoryItem>,
    pub has_data: bool,
}

fn inventory_item(record: &RawRecord) -> (InventoryItem, f64) {
    let fields = FieldLookup::new(record);
    let quantity = fields.number(QUANTITY_FIELDS);
    let unit_value = fields.number(UNIT_VALUE_FIELDS);
    let total = quantity * unit_value;
    let item = InventoryItem {
        item_name: fields.text(ITEM_NAME_FIELDS).unwrap_or_else(|| "Unknown".to_string()),
        quantity: quantity.trunc() as i64,
        unit_value: round2(unit_value),
        total_value: round2(total),
    };
    (item, total)
}

pub fn inventory_summary(uploads: &[UploadRecord]) -> InventorySummary {
    let mut items = Vec::new();
    let mut total_value = 0.0;
    let mut total_quantity = 0i64;

    for record in auxiliary_rows(uploads, UploadType::Inventory) {
        let (item, value) = inventory_item(record);
        total_value += value;
        total_quantity += item.quantity;
        items.push(item);
    }

    let total_items = items.len();
    items.sort_by(|a, b| b.total_value.total_cmp(&a.total_value));
    items.truncate(TOP_INVENTORY_ITEMS);

    InventorySummary {
        total_items,
        total_quantity,
        total_value: round2(total_value),
        top_items: items,
        has_data: total_items > 0,
    }
}

// ---------------------------------------------------------------------------
// Loans
// ---------------------------------------------------------------------------

const LENDER_FIELDS: &[&str] = &["lender", "bank", "institution", "name"];
const OUTSTANDING_FIELDS: &[&str] = &["outstanding_amount", "outstanding", "principal", "amount"];
const EMI_FIELDS: &[&str] = &["monthly_emi", "emi", "installment"];
const INTEREST_FIELDS: &[&str] = &["interest_rate", "rate", "interest"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanEntry {
    pub lender: String,
    pub outstanding_amount: f64,
    pub monthly_emi: f64,
    pub interest_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanSummary {
    pub total_outstanding: f64,
    pub total_monthly_emi: f64,
    pub loan_count: usize,
    pub loans: Vec<LoanEntry>,
    pub has_data: bool,
}

pub fn loan_summary(uploads: &[UploadRecord]) -> LoanSummary {
    let mut loans = Vec::new();
    let mut total_outstanding = 0.0;
    let mut total_emi = 0.0;

    for record in auxiliary_rows(uploads, UploadType::Loan) {
        let fields = FieldLookup::new(record);
        let outstanding = fields.number(OUTSTANDING_FIELDS);
        let emi = fields.number(EMI_FIELDS);
        let rate = fields.number(INTEREST_FIELDS);
        total_outstanding += outstanding;
        total_emi += emi;
        loans.push(LoanEntry {
            lender: fields.text(LENDER_FIELDS).unwrap_or_else(|| "Unknown".to_string()),
            outstanding_amount: round2(outstanding),
            monthly_emi: round2(emi),
            interest_rate: (rate > 0.0).then(|| round2(rate)),
        });
    }

    LoanSummary {
        total_outstanding: round2(total_outstanding),
        total_monthly_emi: round2(total_emi),
        loan_count: loans.len(),
        has_data: !loans.is_empty(),
        loans,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, NormalizedRecord, PaymentStatus, UploadRows};

    fn txn(date: &str, amount: f64, direction: Direction, description: &str) -> NormalizedRecord {
        NormalizedRecord {
            date: (!date.is_empty()).then(|| date.to_string()),
            amount,
            direction,
            status: PaymentStatus::Paid,
            description: description.to_string(),
        }
    }

    fn upload(file_type: UploadType, filename: &str, records: Vec<NormalizedRecord>) -> UploadRecord {
        UploadRecord {
            id: 1,
            filename: filename.to_string(),
            file_type,
            status: "completed".to_string(),
            rows: UploadRows::Transactions(records),
        }
    }

    fn raw_upload(filename: &str, rows: &[&[(&str, CellValue)]]) -> UploadRecord {
        UploadRecord {
            id: 2,
            filename: filename.to_string(),
            file_type: UploadType::Bank,
            status: "completed".to_string(),
            rows: UploadRows::Raw(
                rows.iter()
                    .map(|r| r.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
                    .collect(),
            ),
        }
    }

    fn num(n: f64) -> CellValue {
        CellValue::Number(n)
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_bookkeeping_totals_and_months() {
        let uploads = vec![
            upload(
                UploadType::Bank,
                "bank.csv",
                vec![
                    txn("2024-02-01", 5000.0, Direction::Credit, "Client payment"),
                    txn("2024-01-15", 1200.0, Direction::Debit, "Office rent"),
                    txn("", 300.0, Direction::Debit, "Staff lunch"),
                ],
            ),
            upload(
                UploadType::Sales,
                "sales.csv",
                vec![txn("15/01/2024", 800.0, Direction::Credit, "INV-1")],
            ),
        ];
        let summary = bookkeeping_summary(&uploads, &KeywordTable::default());

        assert_eq!(summary.total_income, 5800.0);
        assert_eq!(summary.total_expenses, 1500.0);
        assert_eq!(summary.net_balance, 4300.0);
        assert_eq!(summary.total_transactions, 4);
        assert_eq!(summary.cash_transactions, 3);
        assert_eq!(summary.non_cash_transactions, 1);
        assert!(summary.has_sufficient_data);

        let income_months: Vec<&str> = summary.monthly_income.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(income_months, vec!["Jan 2024", "Feb 2024"]);
        // The undated expense is in the totals but no month
        assert_eq!(summary.monthly_expenses.len(), 1);
        assert_eq!(summary.monthly_expenses[0].amount, 1200.0);
    }

    #[test]
    fn test_expense_categories_sorted_descending() {
        let uploads = vec![upload(
            UploadType::Purchase,
            "purchases.csv",
            vec![
                txn("2024-01-01", 100.0, Direction::Debit, "printer paper"),
                txn("2024-01-02", 900.0, Direction::Debit, "salary"),
                txn("2024-01-03", 50.0, Direction::Debit, "misc"),
                txn("2024-01-04", 60.0, Direction::Debit, "stationery"),
            ],
        )];
        let summary = bookkeeping_summary(&uploads, &KeywordTable::default());
        let cats: Vec<(&str, f64)> = summary
            .expense_categories
            .iter()
            .map(|c| (c.category.as_str(), c.amount))
            .collect();
        assert_eq!(
            cats,
            vec![
                ("Salary & Wages", 900.0),
                ("Office Supplies", 160.0),
                ("General Expenses", 50.0)
            ]
        );
    }

    #[test]
    fn test_bookkeeping_skips_tagged_uploads_and_flags_thin_data() {
        let uploads = vec![
            upload(
                UploadType::Bank,
                "[LOAN] loans.csv",
                vec![txn("2024-01-01", 1.0, Direction::Credit, "")],
            ),
            upload(
                UploadType::Bank,
                "bank.csv",
                vec![txn("2024-01-01", 10.0, Direction::Credit, "")],
            ),
        ];
        let summary = bookkeeping_summary(&uploads, &KeywordTable::default());
        assert_eq!(summary.total_transactions, 1);
        assert_eq!(summary.total_income, 10.0);
        assert!(!summary.has_sufficient_data);
    }

    #[test]
    fn test_empty_bookkeeping_summary() {
        let summary = bookkeeping_summary(&[], &KeywordTable::default());
        assert_eq!(summary.total_transactions, 0);
        assert!(summary.expense_categories.is_empty());
        assert!(!summary.has_sufficient_data);
    }

    #[test]
    fn test_inventory_summary_uses_field_priority() {
        let uploads = vec![raw_upload(
            "[INVENTORY] stock.csv",
            &[
                &[("Item Name", text("Bolts")), ("Qty", num(100.0)), ("Price", text("₹2.50"))],
                &[("Product", text("Nuts")), ("Stock", num(10.9)), ("Unit Value", num(20.0))],
                &[("Qty", num(3.0)), ("Rate", num(1.0))],
            ],
        )];
        let summary = inventory_summary(&uploads);
        assert!(summary.has_data);
        assert_eq!(summary.total_items, 3);
        assert_eq!(summary.total_quantity, 113);
        // 250 + 218 + 3
        assert_eq!(summary.total_value, 471.0);
        assert_eq!(summary.top_items[0].item_name, "Bolts");
        assert_eq!(summary.top_items[1].item_name, "Nuts");
        assert_eq!(summary.top_items[1].quantity, 10);
        assert_eq!(summary.top_items[2].item_name, "Unknown");
    }

    #[test]
    fn test_inventory_top_items_capped_at_ten() {
        let rows: Vec<Vec<(&str, CellValue)>> = (1..=12)
            .map(|i| vec![("name", text(&format!("item{i}"))), ("qty", num(i as f64)), ("price", num(1.0))])
            .collect();
        let row_refs: Vec<&[(&str, CellValue)]> = rows.iter().map(|r| r.as_slice()).collect();
        let summary = inventory_summary(&[raw_upload("[INVENTORY] big.csv", &row_refs)]);
        assert_eq!(summary.total_items, 12);
        assert_eq!(summary.top_items.len(), 10);
        assert_eq!(summary.top_items[0].item_name, "item12");
    }

    #[test]
    fn test_inventory_ignores_other_uploads() {
        let uploads = vec![
            raw_upload("[LOAN] loans.csv", &[&[("lender", text("SBI"))]]),
            upload(UploadType::Bank, "bank.csv", vec![txn("2024-01-01", 1.0, Direction::Credit, "")]),
        ];
        let summary = inventory_summary(&uploads);
        assert!(!summary.has_data);
        assert_eq!(summary.total_items, 0);
        assert_eq!(summary.total_value, 0.0);
    }

    #[test]
    fn test_loan_summary() {
        let uploads = vec![raw_upload(
            "[LOAN] loans.xlsx",
            &[
                &[
                    ("Lender", text("HDFC")),
                    ("Outstanding Amount", text("5,00,000")),
                    ("EMI", num(12000.0)),
                    ("Interest Rate", num(9.5)),
                ],
                &[("Bank", text("SBI")), ("Principal", num(100000.0)), ("Installment", num(3000.0))],
            ],
        )];
        let summary = loan_summary(&uploads);
        assert!(summary.has_data);
        assert_eq!(summary.loan_count, 2);
        assert_eq!(summary.total_outstanding, 600000.0);
        assert_eq!(summary.total_monthly_emi, 15000.0);
        assert_eq!(summary.loans[0].lender, "HDFC");
        assert_eq!(summary.loans[0].interest_rate, Some(9.5));
        assert_eq!(summary.loans[1].interest_rate, None);
    }

    #[test]
    fn test_loan_summary_literal_type() {
        let mut u = raw_upload("loans.csv", &[&[("amount", num(10.0))]]);
        u.file_type = UploadType::Loan;
        let summary = loan_summary(&[u]);
        assert_eq!(summary.loan_count, 1);
        assert_eq!(summary.loans[0].lender, "Unknown");
        assert_eq!(summary.total_outstanding, 10.0);
    }
}
