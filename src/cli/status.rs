use std::collections::BTreeMap;

use crate::db::{get_connection, load_metrics, load_uploads};
use crate::error::Result;
use crate::forecast::forecast;
use crate::settings::{db_path, get_data_dir, load_settings, settings_file_exists};

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = db_path();

    if !settings_file_exists() {
        println!("No settings saved yet, using defaults.");
    }
    println!("User:       {}", settings.user_id);
    println!("Currency:   {}", settings.currency_symbol);
    println!("Data dir:   {}", get_data_dir().display());
    println!("Database:   {}", db_path.display());

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `ledgerlens init` to set up.");
        return Ok(());
    }

    let conn = get_connection(&db_path)?;
    let uploads = load_uploads(&conn, &settings.user_id)?;
    let mut by_type: BTreeMap<&'static str, (usize, usize)> = BTreeMap::new();
    for upload in &uploads {
        let entry = by_type.entry(upload.effective_type().as_str()).or_default();
        entry.0 += 1;
        entry.1 += upload.rows.len();
    }

    println!();
    println!("Uploads:    {}", uploads.len());
    for (kind, (count, rows)) in &by_type {
        println!("  {kind:<10} {count} upload(s), {rows} row(s)");
    }

    let snapshot = load_metrics(&conn, &settings.user_id)?;
    let today = chrono::Local::now().date_naive();
    let ready = forecast(&uploads, snapshot.as_ref(), today).has_sufficient_data();
    println!("Forecast:   {}", if ready { "ready" } else { "not enough data" });
    Ok(())
}
