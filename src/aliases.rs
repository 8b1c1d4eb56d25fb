use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical schema fields that raw columns are mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StandardField {
    Date,
    Amount,
    Credit,
    Debit,
    Type,
    Description,
    Status,
    Party,
}

impl StandardField {
    /// Matching order. Earlier fields win ties in both exact and partial passes.
    #[cfg(test)]
    pub const ALL: [StandardField; 8] = [
        Self::Date,
        Self::Amount,
        Self::Credit,
        Self::Debit,
        Self::Type,
        Self::Description,
        Self::Status,
        Self::Party,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Amount => "amount",
            Self::Credit => "credit",
            Self::Debit => "debit",
            Self::Type => "type",
            Self::Description => "description",
            Self::Status => "status",
            Self::Party => "party",
        }
    }
}

impl fmt::Display for StandardField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// (field, accepted normalized spellings)
const DEFAULT_ALIASES: &[(StandardField, &[&str])] = &[
    (
        StandardField::Date,
        &[
            "date", "txn_date", "transaction_date", "invoice_date", "bill_date",
            "posting_date", "value_date", "trans_date", "entry_date", "voucher_date",
        ],
    ),
    (
        StandardField::Amount,
        &[
            "amount", "total", "value", "amt", "net_amount", "gross_amount",
            "txn_amount", "transaction_amount", "invoice_amount", "bill_amount",
        ],
    ),
    (
        StandardField::Credit,
        &[
            "credit", "cr", "income", "receipt", "receipts", "deposits",
            "credit_amount", "inflow", "sales", "revenue",
        ],
    ),
    (
        StandardField::Debit,
        &[
            "debit", "dr", "expense", "payment", "payments", "withdrawals",
            "debit_amount", "outflow", "purchase", "cost",
        ],
    ),
    (
        StandardField::Type,
        &[
            "type", "txn_type", "transaction_type", "dr_cr", "cr_dr",
            "direction", "nature", "indicator",
        ],
    ),
    (
        StandardField::Description,
        &[
            "description", "desc", "narration", "particulars", "details",
            "remarks", "memo", "notes",
        ],
    ),
    (
        StandardField::Status,
        &["status", "payment_status", "invoice_status", "bill_status", "paid"],
    ),
    (
        StandardField::Party,
        &["customer", "client", "party", "vendor", "supplier", "buyer", "seller", "name"],
    ),
];

/// Immutable table of accepted column spellings per canonical field.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasRegistry {
    entries: Vec<(StandardField, Vec<String>)>,
}

impl Default for AliasRegistry {
    fn default() -> Self {
        Self::new(
            DEFAULT_ALIASES
                .iter()
                .map(|(field, aliases)| (*field, aliases.iter().map(|a| a.to_string()).collect()))
                .collect(),
        )
    }
}

impl AliasRegistry {
    /// Build a registry from explicit entries. Fields are re-sorted into canonical order.
    pub fn new(mut entries: Vec<(StandardField, Vec<String>)>) -> Self {
        entries.sort_by_key(|(field, _)| *field);
        Self { entries }
    }

    /// Entries in canonical field order.
    pub fn entries(&self) -> impl Iterator<Item = (StandardField, &[String])> {
        self.entries.iter().map(|(f, a)| (*f, a.as_slice()))
    }

    #[cfg(test)]
    pub fn aliases(&self, field: StandardField) -> &[String] {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, a)| a.as_slice())
            .unwrap_or(&[])
    }
}
