use crate::models::{Category, ClassifiedRecord, Direction, NormalizedRecord, UploadType};

pub const GENERAL_EXPENSES: &str = "General Expenses";

const DEFAULT_KEYWORDS: &[(&str, &[&str])] = &[
    ("Salary & Wages", &["salary", "wages", "payroll", "employee", "staff"]),
    (
        "Rent & Utilities",
        &["rent", "lease", "electricity", "water", "utility", "power", "gas"],
    ),
    ("Office Supplies", &["office", "stationery", "supplies", "printer", "paper"]),
    (
        "Marketing & Advertising",
        &["marketing", "advertising", "promotion", "ads", "campaign"],
    ),
    (
        "Travel & Transport",
        &["travel", "transport", "fuel", "petrol", "diesel", "cab", "taxi", "flight"],
    ),
    (
        "Professional Services",
        &["consulting", "legal", "accounting", "professional", "advisory"],
    ),
    (
        "Raw Materials",
        &["material", "raw", "goods", "inventory", "stock", "purchase"],
    ),
    (
        "Equipment & Maintenance",
        &["equipment", "machinery", "repair", "maintenance", "service"],
    ),
    ("Insurance", &["insurance", "premium", "policy"]),
    ("Bank Charges", &["bank", "charge", "fee", "interest", "commission"]),
    ("Taxes", &["tax", "gst", "vat", "tds", "duty"]),
];

/// Expense subcategories and their trigger substrings, checked in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordTable {
    categories: Vec<(String, Vec<String>)>,
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::new(
            DEFAULT_KEYWORDS
                .iter()
                .map(|(name, words)| (name.to_string(), words.iter().map(|w| w.to_string()).collect()))
                .collect(),
        )
    }
}

impl KeywordTable {
    /// Keywords are lowercased; order is kept as given.
    pub fn new(categories: Vec<(String, Vec<String>)>) -> Self {
        Self {
            categories: categories
                .into_iter()
                .map(|(name, words)| (name, words.into_iter().map(|w| w.to_lowercase()).collect()))
                .collect(),
        }
    }

    /// First category whose keyword appears in the description, else "General Expenses".
    pub fn categorize_expense(&self, description: &str) -> &str {
        let lowered = description.to_lowercase();
        self.categories
            .iter()
            .find(|(_, words)| words.iter().any(|w| lowered.contains(w.as_str())))
            .map(|(name, _)| name.as_str())
            .unwrap_or(GENERAL_EXPENSES)
    }
}

/// Assign a bookkeeping category to one record of an upload.
pub fn classify(record: &NormalizedRecord, upload_type: UploadType, keywords: &KeywordTable) -> ClassifiedRecord {
    let (category, subcategory, is_cash) = match (upload_type, record.direction) {
        (UploadType::Sales, _) => (Category::Income, "Sales Revenue".to_string(), false),
        (UploadType::Purchase, _) => (
            Category::Expense,
            keywords.categorize_expense(&record.description).to_string(),
            false,
        ),
        (UploadType::Bank, Direction::Credit) => (Category::Income, "Bank Credit".to_string(), true),
        (UploadType::Bank, Direction::Debit) => (
            Category::Expense,
            keywords.categorize_expense(&record.description).to_string(),
            true,
        ),
        (UploadType::Inventory | UploadType::Loan, _) => {
            (Category::Uncategorized, "Other".to_string(), false)
        }
    };

    ClassifiedRecord {
        record: record.clone(),
        category,
        subcategory,
        is_cash,
    }
}
