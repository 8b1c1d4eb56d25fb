use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};
use serde::Serialize;

use crate::aliases::AliasRegistry;
use crate::cli::{open_db, print_json, resolve_user};
use crate::db::store_upload;
use crate::error::Result;
use crate::fmt::{money, percent};
use crate::importer::{process_file, UploadResult};
use crate::mapper::{EXACT_MATCH, PARTIAL_MATCH};
use crate::metrics::PartialMetrics;
use crate::models::UploadType;
use crate::settings::load_settings;

#[derive(Serialize)]
struct UploadOutput<'a> {
    upload_id: Option<i64>,
    filename: &'a str,
    upload_type: UploadType,
    #[serde(flatten)]
    result: &'a UploadResult,
}

pub fn run(file: &str, upload_type: &str, user: Option<String>, dry_run: bool, json: bool) -> Result<()> {
    let upload_type: UploadType = upload_type.parse()?;
    let settings = load_settings();
    let user = resolve_user(user, &settings);
    let path = PathBuf::from(file);

    let result = process_file(&path, upload_type, &AliasRegistry::default())?;
    let original = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file)
        .to_string();

    let stored = if dry_run {
        None
    } else {
        let mut conn = open_db()?;
        Some(store_upload(&mut conn, &user, &original, upload_type, &result)?)
    };
    let upload_id = stored.as_ref().map(|s| s.upload_id);
    let filename = stored.as_ref().map_or(original.as_str(), |s| s.filename.as_str());

    if json {
        return print_json(&UploadOutput {
            upload_id,
            filename,
            upload_type,
            result: &result,
        });
    }

    print_mapping(&result);
    if !result.metrics.is_empty() {
        print_metrics(&result.metrics, &settings.currency_symbol);
    }

    println!(
        "{} rows parsed, {} skipped ({upload_type})",
        result.rows_parsed, result.rows_skipped
    );
    match &stored {
        Some(stored) => {
            println!("Stored as upload #{}: {} (user {user})", stored.upload_id, stored.filename);
            if let Some(snapshot) = &stored.metrics {
                println!(
                    "Running net profit: {} ({})",
                    money(snapshot.net_profit, &settings.currency_symbol),
                    percent(snapshot.profit_margin)
                );
            }
        }
        None => println!("{}", "Dry run: nothing stored.".yellow()),
    }
    Ok(())
}

fn confidence_cell(confidence: u8) -> Cell {
    let text = confidence.to_string();
    match confidence {
        EXACT_MATCH => Cell::new(text.green()),
        PARTIAL_MATCH => Cell::new(text.yellow()),
        _ => Cell::new(text.red()),
    }
}

fn print_mapping(result: &UploadResult) {
    let mut table = Table::new();
    table.set_header(vec!["Column", "Field", "Confidence"]);
    for m in &result.column_mapping.mapping {
        table.add_row(vec![
            Cell::new(&m.column),
            Cell::new(m.standard.to_string()),
            confidence_cell(m.confidence),
        ]);
    }
    for column in &result.column_mapping.unmapped {
        table.add_row(vec![
            Cell::new(column),
            Cell::new("(unmapped)".dimmed()),
            Cell::new(""),
        ]);
    }
    println!("Column Mapping\n{table}");
    println!("Minimum confidence: {}", result.confidence);
}

fn print_metrics(metrics: &PartialMetrics, symbol: &str) {
    let rows = [
        ("Total revenue", metrics.total_revenue),
        ("Total expenses", metrics.total_expenses),
        ("Cash inflow", metrics.cash_inflow),
        ("Cash outflow", metrics.cash_outflow),
        ("Receivables", metrics.total_receivables),
        ("Payables", metrics.total_payables),
    ];
    let mut table = Table::new();
    table.set_header(vec!["Metric", "Amount"]);
    for (label, value) in rows {
        if let Some(v) = value {
            table.add_row(vec![Cell::new(label), Cell::new(money(v, symbol))]);
        }
    }
    println!("\nUpload Metrics\n{table}");
}
