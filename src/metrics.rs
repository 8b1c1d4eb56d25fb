use serde::{Deserialize, Serialize};

use crate::models::{Direction, NormalizedRecord, PaymentStatus, UploadType};

/// Totals contributed by a single upload. Only the keys its type can compute are set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_revenue: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_expenses: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_inflow: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_outflow: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_receivables: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_payables: Option<f64>,
}

impl PartialMetrics {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Reduce one upload's records into the metrics its type supports.
pub fn aggregate(records: &[NormalizedRecord], upload_type: UploadType) -> PartialMetrics {
    if records.is_empty() {
        return PartialMetrics::default();
    }

    let sum = |pred: &dyn Fn(&NormalizedRecord) -> bool| -> f64 {
        records.iter().filter(|r| pred(r)).map(|r| r.amount).sum()
    };
    let all = sum(&|_| true);
    let unpaid = sum(&|r| r.status == PaymentStatus::Unpaid);

    match upload_type {
        UploadType::Bank => PartialMetrics {
            cash_inflow: Some(sum(&|r| r.direction == Direction::Credit)),
            cash_outflow: Some(sum(&|r| r.direction == Direction::Debit)),
            ..Default::default()
        },
        UploadType::Sales => PartialMetrics {
            total_revenue: Some(all),
            total_receivables: Some(unpaid),
            ..Default::default()
        },
        UploadType::Purchase => PartialMetrics {
            total_expenses: Some(all),
            total_payables: Some(unpaid),
            ..Default::default()
        },
        UploadType::Inventory | UploadType::Loan => PartialMetrics::default(),
    }
}

/// Running per-user totals. Profit figures are always derived, never summed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_revenue: f64,
    pub total_expenses: f64,
    pub cash_inflow: f64,
    pub cash_outflow: f64,
    pub total_receivables: f64,
    pub total_payables: f64,
    pub net_profit: f64,
    pub profit_margin: f64,
}

impl MetricsSnapshot {
    pub fn from_totals(
        total_revenue: f64,
        total_expenses: f64,
        cash_inflow: f64,
        cash_outflow: f64,
        total_receivables: f64,
        total_payables: f64,
    ) -> Self {
        let net_profit = total_revenue - total_expenses;
        let profit_margin = if total_revenue > 0.0 {
            net_profit / total_revenue * 100.0
        } else {
            0.0
        };
        Self {
            total_revenue,
            total_expenses,
            cash_inflow,
            cash_outflow,
            total_receivables,
            total_payables,
            net_profit,
            profit_margin,
        }
    }

    /// Additive merge of an upload's partial totals.
    pub fn merge(&self, partial: &PartialMetrics) -> Self {
        Self::from_totals(
            self.total_revenue + partial.total_revenue.unwrap_or(0.0),
            self.total_expenses + partial.total_expenses.unwrap_or(0.0),
            self.cash_inflow + partial.cash_inflow.unwrap_or(0.0),
            self.cash_outflow + partial.cash_outflow.unwrap_or(0.0),
            self.total_receivables + partial.total_receivables.unwrap_or(0.0),
            self.total_payables + partial.total_payables.unwrap_or(0.0),
        )
    }

    /// True when every total is zero.
    pub fn is_empty(&self) -> bool {
        [
            self.total_revenue,
            self.total_expenses,
            self.cash_inflow,
            self.cash_outflow,
            self.total_receivables,
            self.total_payables,
        ]
        .iter()
        .all(|v| *v == 0.0)
    }
}
