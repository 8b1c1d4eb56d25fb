use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::categorizer::KeywordTable;
use crate::cli::{open_db, print_json, resolve_user, ViewArgs};
use crate::db::{load_metrics, load_uploads};
use crate::error::Result;
use crate::fmt::{money, percent};
use crate::forecast::{self, Forecast};
use crate::metrics::MetricsSnapshot;
use crate::models::UploadRecord;
use crate::reports;
use crate::settings::load_settings;
use crate::working_capital::{self, RiskLevel};

fn signed_cell(val: f64, symbol: &str) -> Cell {
    let text = money(val, symbol);
    if val < 0.0 {
        Cell::new(text.red())
    } else {
        Cell::new(text)
    }
}

fn user_uploads(args: &ViewArgs) -> Result<(String, Vec<UploadRecord>, Option<MetricsSnapshot>)> {
    let settings = load_settings();
    let user = resolve_user(args.user.clone(), &settings);
    let conn = open_db()?;
    let uploads = load_uploads(&conn, &user)?;
    let metrics = load_metrics(&conn, &user)?;
    Ok((settings.currency_symbol, uploads, metrics))
}

pub fn metrics(args: ViewArgs) -> Result<()> {
    let (symbol, _, snapshot) = user_uploads(&args)?;
    let snapshot = snapshot.unwrap_or_default();
    if args.json {
        return print_json(&snapshot);
    }

    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    let rows = [
        ("Total revenue", snapshot.total_revenue),
        ("Total expenses", snapshot.total_expenses),
        ("Cash inflow", snapshot.cash_inflow),
        ("Cash outflow", snapshot.cash_outflow),
        ("Receivables", snapshot.total_receivables),
        ("Payables", snapshot.total_payables),
    ];
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(money(value, &symbol))]);
    }
    table.add_row(vec![
        Cell::new("Net profit".bold()),
        signed_cell(snapshot.net_profit, &symbol),
    ]);
    table.add_row(vec![
        Cell::new("Profit margin"),
        Cell::new(percent(snapshot.profit_margin)),
    ]);

    println!("Metrics\n{table}");
    if snapshot.is_empty() {
        println!("{}", "No bank, sales or purchase uploads yet.".dimmed());
    }
    Ok(())
}

pub fn summary(args: ViewArgs) -> Result<()> {
    let (symbol, uploads, _) = user_uploads(&args)?;
    let summary = reports::bookkeeping_summary(&uploads, &KeywordTable::default());
    if args.json {
        return print_json(&summary);
    }

    let mut totals = Table::new();
    totals.set_header(vec!["", "Amount"]);
    totals.add_row(vec![
        Cell::new("Income".green().bold()),
        Cell::new(money(summary.total_income, &symbol)),
    ]);
    totals.add_row(vec![
        Cell::new("Expenses".red().bold()),
        Cell::new(money(summary.total_expenses, &symbol)),
    ]);
    totals.add_row(vec![
        Cell::new("Net balance".bold()),
        signed_cell(summary.net_balance, &symbol),
    ]);
    println!("Bookkeeping Summary\n{totals}");

    if !summary.expense_categories.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Category", "Amount"]);
        for c in &summary.expense_categories {
            table.add_row(vec![Cell::new(&c.category), Cell::new(money(c.amount, &symbol))]);
        }
        println!("\nExpense Categories\n{table}");
    }

    if !summary.monthly_income.is_empty() || !summary.monthly_expenses.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Month", "Income", "Expenses"]);
        let mut months: Vec<&str> = Vec::new();
        for m in summary.monthly_income.iter().chain(&summary.monthly_expenses) {
            if !months.contains(&m.month.as_str()) {
                months.push(&m.month);
            }
        }
        let lookup = |list: &[reports::MonthAmount], month: &str| {
            list.iter()
                .find(|m| m.month == month)
                .map(|m| m.amount)
                .unwrap_or(0.0)
        };
        for month in months {
            table.add_row(vec![
                Cell::new(month),
                Cell::new(money(lookup(&summary.monthly_income, month), &symbol)),
                Cell::new(money(lookup(&summary.monthly_expenses, month), &symbol)),
            ]);
        }
        println!("\nBy Month\n{table}");
    }

    println!(
        "\n{} transactions ({} cash, {} non-cash)",
        summary.total_transactions, summary.cash_transactions, summary.non_cash_transactions
    );
    if !summary.has_sufficient_data {
        println!("{}", "Upload at least 3 transactions for a meaningful summary.".yellow());
    }
    Ok(())
}

pub fn forecast(args: ViewArgs) -> Result<()> {
    let (symbol, uploads, snapshot) = user_uploads(&args)?;
    let today = chrono::Local::now().date_naive();
    let result = forecast::forecast(&uploads, snapshot.as_ref(), today);
    if args.json {
        return print_json(&result);
    }

    match result {
        Forecast::Insufficient { message, .. } => {
            println!("{}", message.yellow());
        }
        Forecast::Projected {
            data_months_used,
            monthly_projections,
            summary,
            disclaimer,
            ..
        } => {
            let mut table = Table::new();
            table.set_header(vec![
                "Month",
                "Revenue",
                "Expenses",
                "Profit",
                "Net Cash",
                "Cumulative",
            ]);
            for p in &monthly_projections {
                table.add_row(vec![
                    Cell::new(p.month.label()),
                    Cell::new(money(p.projected_revenue, &symbol)),
                    Cell::new(money(p.projected_expenses, &symbol)),
                    signed_cell(p.projected_profit, &symbol),
                    signed_cell(p.net_cash_movement, &symbol),
                    signed_cell(p.cumulative_cash_movement, &symbol),
                ]);
            }
            println!("3-Month Forecast\n{table}");
            println!(
                "3-month totals: revenue {}, expenses {}, profit {}",
                money(summary.total_3month_revenue, &symbol),
                money(summary.total_3month_expenses, &symbol),
                money(summary.total_3month_profit, &symbol)
            );
            println!("Months of history used: {data_months_used}");
            println!("{}", disclaimer.dimmed());
        }
    }
    Ok(())
}

pub fn working_capital(args: ViewArgs) -> Result<()> {
    let (symbol, uploads, snapshot) = user_uploads(&args)?;
    let wc = working_capital::analyze(&uploads, snapshot.as_ref(), &symbol);
    if args.json {
        return print_json(&wc);
    }

    let risk = match wc.risk_level {
        RiskLevel::Low => wc.risk_level.to_string().green(),
        RiskLevel::Medium => wc.risk_level.to_string().yellow(),
        RiskLevel::High => wc.risk_level.to_string().red().bold(),
    };

    let mut table = Table::new();
    table.set_header(vec!["", "Amount"]);
    table.add_row(vec![Cell::new("Receivables"), Cell::new(money(wc.receivables, &symbol))]);
    table.add_row(vec![Cell::new("Payables"), Cell::new(money(wc.payables, &symbol))]);
    table.add_row(vec![
        Cell::new("Working capital gap".bold()),
        signed_cell(wc.working_capital_gap, &symbol),
    ]);
    table.add_row(vec![Cell::new("Risk level"), Cell::new(risk)]);
    println!("Working Capital\n{table}");

    for obs in &wc.key_observations {
        println!("  - {obs}");
    }
    if !wc.has_sufficient_data {
        println!("{}", "Upload sales or purchase data to assess working capital.".yellow());
    }
    Ok(())
}

pub fn inventory(args: ViewArgs) -> Result<()> {
    let (symbol, uploads, _) = user_uploads(&args)?;
    let summary = reports::inventory_summary(&uploads);
    if args.json {
        return print_json(&summary);
    }
    if !summary.has_data {
        println!("No inventory uploads found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Item", "Quantity", "Unit Value", "Total Value"]);
    for item in &summary.top_items {
        table.add_row(vec![
            Cell::new(&item.item_name),
            Cell::new(item.quantity),
            Cell::new(money(item.unit_value, &symbol)),
            Cell::new(money(item.total_value, &symbol)),
        ]);
    }
    println!("Top Inventory Items\n{table}");
    println!(
        "{} items, {} units, total value {}",
        summary.total_items,
        summary.total_quantity,
        money(summary.total_value, &symbol)
    );
    Ok(())
}

pub fn loans(args: ViewArgs) -> Result<()> {
    let (symbol, uploads, _) = user_uploads(&args)?;
    let summary = reports::loan_summary(&uploads);
    if args.json {
        return print_json(&summary);
    }
    if !summary.has_data {
        println!("No loan uploads found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Lender", "Outstanding", "Monthly EMI", "Interest"]);
    for loan in &summary.loans {
        table.add_row(vec![
            Cell::new(&loan.lender),
            Cell::new(money(loan.outstanding_amount, &symbol)),
            Cell::new(money(loan.monthly_emi, &symbol)),
            Cell::new(loan.interest_rate.map(percent).unwrap_or_else(|| "-".to_string())),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(money(summary.total_outstanding, &symbol)),
        Cell::new(money(summary.total_monthly_emi, &symbol)),
        Cell::new(""),
    ]);
    println!("Loans ({})\n{table}", summary.loan_count);
    Ok(())
}
