use std::fmt;

use serde::Serialize;

use crate::fmt::{money_whole, round2};
use crate::metrics::MetricsSnapshot;
use crate::models::{PaymentStatus, UploadRecord, UploadType};

/// Gap above this many currency units is High risk when revenue is unknown.
pub const ABSOLUTE_GAP_THRESHOLD: f64 = 100_000.0;
/// Gap-to-monthly-revenue ratio at or below which the risk stays Medium.
pub const GAP_RATIO_THRESHOLD: f64 = 0.30;
const SLOW_COLLECTION_DAYS: f64 = 45.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkingCapital {
    pub receivables: f64,
    pub payables: f64,
    pub working_capital_gap: f64,
    pub risk_level: RiskLevel,
    pub key_observations: Vec<String>,
    pub has_sufficient_data: bool,
}

pub fn classify_risk(gap: f64, monthly_revenue: f64) -> RiskLevel {
    if gap <= 0.0 {
        return RiskLevel::Low;
    }
    if monthly_revenue <= 0.0 {
        return if gap > ABSOLUTE_GAP_THRESHOLD {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        };
    }
    if gap / monthly_revenue <= GAP_RATIO_THRESHOLD {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

/// Unpaid sales and unpaid purchases summed from stored transactions.
fn outstanding_from_records(uploads: &[UploadRecord]) -> (f64, f64) {
    let mut receivables = 0.0;
    let mut payables = 0.0;
    for upload in uploads {
        let unpaid = upload
            .rows
            .transactions()
            .iter()
            .filter(|r| r.status == PaymentStatus::Unpaid)
            .map(|r| r.amount);
        match upload.effective_type() {
            UploadType::Sales => receivables += unpaid.sum::<f64>(),
            UploadType::Purchase => payables += unpaid.sum::<f64>(),
            _ => {}
        }
    }
    (receivables, payables)
}

pub fn observations(
    receivables: f64,
    payables: f64,
    gap: f64,
    risk: RiskLevel,
    monthly_revenue: f64,
    symbol: &str,
) -> Vec<String> {
    let mut notes = Vec::new();

    if receivables > 0.0 {
        notes.push(format!(
            "{} tied up in receivables (unpaid invoices)",
            money_whole(receivables, symbol)
        ));
    }
    if payables > 0.0 {
        notes.push(format!(
            "{} in pending payables to suppliers/vendors",
            money_whole(payables, symbol)
        ));
    }

    if gap > 0.0 {
        notes.push(format!(
            "Working capital gap of {} indicates cash is blocked",
            money_whole(gap, symbol)
        ));
        match risk {
            RiskLevel::High => notes.push("⚠️ High risk: Consider faster receivable collection".to_string()),
            RiskLevel::Medium => notes.push("Monitor receivables closely to maintain liquidity".to_string()),
            RiskLevel::Low => {}
        }
    } else if gap < 0.0 {
        notes.push(format!(
            "Positive working capital position: payables exceed receivables by {}",
            money_whole(gap.abs(), symbol)
        ));
        notes.push("✅ Healthy cash flow position".to_string());
    } else {
        notes.push("Balanced working capital: receivables equal payables".to_string());
    }

    if receivables > 0.0 && monthly_revenue > 0.0 {
        let days = receivables / monthly_revenue * 30.0;
        if days > SLOW_COLLECTION_DAYS {
            notes.push(format!(
                "Average receivable period: ~{days:.0} days (consider faster collection)"
            ));
        } else {
            notes.push(format!("Average receivable period: ~{days:.0} days"));
        }
    }

    notes
}

/// Score working-capital health from the metrics snapshot, falling back to
/// stored records for receivables or payables the snapshot has as zero.
pub fn analyze(uploads: &[UploadRecord], metrics: Option<&MetricsSnapshot>, symbol: &str) -> WorkingCapital {
    let snapshot = metrics.copied().unwrap_or_default();
    let mut receivables = snapshot.total_receivables;
    let mut payables = snapshot.total_payables;
    let monthly_revenue = snapshot.total_revenue / 3.0;

    if receivables == 0.0 || payables == 0.0 {
        let (calc_receivables, calc_payables) = outstanding_from_records(uploads);
        if receivables == 0.0 {
            receivables = calc_receivables;
        }
        if payables == 0.0 {
            payables = calc_payables;
        }
    }

    let gap = receivables - payables;
    let risk_level = classify_risk(gap, monthly_revenue);
    tracing::info!(receivables, payables, gap, risk = %risk_level, "working capital analyzed");

    WorkingCapital {
        receivables: round2(receivables),
        payables: round2(payables),
        working_capital_gap: round2(gap),
        risk_level,
        key_observations: observations(receivables, payables, gap, risk_level, monthly_revenue, symbol),
        has_sufficient_data: receivables > 0.0 || payables > 0.0 || snapshot.total_revenue > 0.0,
    }
}
