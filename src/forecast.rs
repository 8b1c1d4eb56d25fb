use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::dates::{parse_month, MonthKey};
use crate::fmt::round2;
use crate::metrics::MetricsSnapshot;
use crate::models::{Direction, UploadRecord, UploadType};

pub const DISCLAIMER: &str =
    "Rule-based estimate for planning purposes. Based on historical averages only.";
pub const INSUFFICIENT_DATA: &str = "Not enough historical data to forecast";

const HISTORY_MONTHS: usize = 3;
const PROJECTION_MONTHS: u32 = 3;
/// Cumulative snapshot totals are assumed to span this many months.
const SNAPSHOT_MONTHS: f64 = 3.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyProjection {
    pub month: MonthKey,
    pub projected_revenue: f64,
    pub projected_expenses: f64,
    pub projected_profit: f64,
    pub projected_cash_inflow: f64,
    pub projected_cash_outflow: f64,
    pub net_cash_movement: f64,
    pub cumulative_cash_movement: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSummary {
    pub total_3month_revenue: f64,
    pub total_3month_expenses: f64,
    pub total_3month_profit: f64,
    pub total_net_cash_movement: f64,
    pub avg_monthly_revenue: f64,
    pub avg_monthly_expenses: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Forecast {
    Projected {
        has_sufficient_data: bool,
        data_months_used: usize,
        monthly_projections: Vec<MonthlyProjection>,
        summary: ForecastSummary,
        disclaimer: &'static str,
    },
    Insufficient {
        has_sufficient_data: bool,
        message: &'static str,
        monthly_projections: Vec<MonthlyProjection>,
    },
}

impl Forecast {
    pub fn has_sufficient_data(&self) -> bool {
        matches!(self, Self::Projected { .. })
    }
}

/// Flat per-month averages the projection repeats.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Averages {
    revenue: f64,
    expenses: f64,
    cash_in: f64,
    cash_out: f64,
}

impl Averages {
    fn from_snapshot(snapshot: &MetricsSnapshot) -> Self {
        Self {
            revenue: snapshot.total_revenue / SNAPSHOT_MONTHS,
            expenses: snapshot.total_expenses / SNAPSHOT_MONTHS,
            cash_in: snapshot.cash_inflow / SNAPSHOT_MONTHS,
            cash_out: snapshot.cash_outflow / SNAPSHOT_MONTHS,
        }
    }

    /// Replace zero averages with the snapshot-derived value.
    fn fill_zeros(self, fallback: &Averages) -> Self {
        let pick = |v: f64, f: f64| if v == 0.0 { f } else { v };
        Self {
            revenue: pick(self.revenue, fallback.revenue),
            expenses: pick(self.expenses, fallback.expenses),
            cash_in: pick(self.cash_in, fallback.cash_in),
            cash_out: pick(self.cash_out, fallback.cash_out),
        }
    }
}

#[derive(Debug, Default)]
struct MonthlyHistory {
    revenue: BTreeMap<MonthKey, f64>,
    expenses: BTreeMap<MonthKey, f64>,
    cash_in: BTreeMap<MonthKey, f64>,
    cash_out: BTreeMap<MonthKey, f64>,
}

impl MonthlyHistory {
    fn collect(uploads: &[UploadRecord]) -> Self {
        let mut history = Self::default();
        for upload in uploads.iter().filter(|u| !u.is_auxiliary()) {
            let upload_type = upload.effective_type();
            for record in upload.rows.transactions() {
                let Some(month) = record.date.as_deref().and_then(parse_month) else {
                    continue;
                };
                let bucket = match (upload_type, record.direction) {
                    (UploadType::Sales, _) => &mut history.revenue,
                    (UploadType::Purchase, _) => &mut history.expenses,
                    (UploadType::Bank, Direction::Credit) => &mut history.cash_in,
                    (UploadType::Bank, Direction::Debit) => &mut history.cash_out,
                    _ => continue,
                };
                *bucket.entry(month).or_default() += record.amount;
            }
        }
        history
    }

    /// Up to `n` most recent months with any data, newest first.
    fn recent_months(&self, n: usize) -> Vec<MonthKey> {
        let all: BTreeSet<MonthKey> = self
            .revenue
            .keys()
            .chain(self.expenses.keys())
            .chain(self.cash_in.keys())
            .chain(self.cash_out.keys())
            .copied()
            .collect();
        all.into_iter().rev().take(n).collect()
    }

    fn averages(&self, months: &[MonthKey]) -> Averages {
        let n = months.len() as f64;
        let avg = |series: &BTreeMap<MonthKey, f64>| {
            months.iter().filter_map(|m| series.get(m)).sum::<f64>() / n
        };
        Averages {
            revenue: avg(&self.revenue),
            expenses: avg(&self.expenses),
            cash_in: avg(&self.cash_in),
            cash_out: avg(&self.cash_out),
        }
    }
}

fn project(averages: &Averages, today: NaiveDate) -> Vec<MonthlyProjection> {
    let start = MonthKey::of(today);
    let revenue = round2(averages.revenue);
    let expenses = round2(averages.expenses);
    let cash_in = round2(averages.cash_in);
    let cash_out = round2(averages.cash_out);
    let net = round2(cash_in - cash_out);

    let mut cumulative = 0.0;
    (1..=PROJECTION_MONTHS)
        .map(|i| {
            cumulative += net;
            MonthlyProjection {
                month: start.plus_months(i),
                projected_revenue: revenue,
                projected_expenses: expenses,
                projected_profit: round2(revenue - expenses),
                projected_cash_inflow: cash_in,
                projected_cash_outflow: cash_out,
                net_cash_movement: net,
                cumulative_cash_movement: round2(cumulative),
            }
        })
        .collect()
}

/// Project the next three calendar months after `today` from historical averages.
///
/// Uses up to the three most recent months that have any dated transaction,
/// averaging over however many exist. With no dated history the snapshot totals
/// divided by three stand in; with neither, the forecast is `Insufficient`.
pub fn forecast(uploads: &[UploadRecord], snapshot: Option<&MetricsSnapshot>, today: NaiveDate) -> Forecast {
    let history = MonthlyHistory::collect(uploads);
    let months = history.recent_months(HISTORY_MONTHS);
    let fallback = snapshot.filter(|s| !s.is_empty()).map(Averages::from_snapshot);

    let averages = match (months.is_empty(), fallback) {
        (true, None) => {
            tracing::info!("no dated history or metrics; forecast skipped");
            return Forecast::Insufficient {
                has_sufficient_data: false,
                message: INSUFFICIENT_DATA,
                monthly_projections: Vec::new(),
            };
        }
        (true, Some(fallback)) => fallback,
        (false, Some(fallback)) => history.averages(&months).fill_zeros(&fallback),
        (false, None) => history.averages(&months),
    };
    tracing::info!(months_used = months.len(), "forecast projected");

    let projections = project(&averages, today);
    let total_revenue: f64 = projections.iter().map(|p| p.projected_revenue).sum();
    let total_expenses: f64 = projections.iter().map(|p| p.projected_expenses).sum();
    let total_net: f64 = projections.iter().map(|p| p.net_cash_movement).sum();

    Forecast::Projected {
        has_sufficient_data: true,
        // The snapshot fallback counts as one period of data
        data_months_used: months.len().max(1),
        summary: ForecastSummary {
            total_3month_revenue: round2(total_revenue),
            total_3month_expenses: round2(total_expenses),
            total_3month_profit: round2(total_revenue - total_expenses),
            total_net_cash_movement: round2(total_net),
            avg_monthly_revenue: round2(averages.revenue),
            avg_monthly_expenses: round2(averages.expenses),
        },
        monthly_projections: projections,
        disclaimer: DISCLAIMER,
    }
}
