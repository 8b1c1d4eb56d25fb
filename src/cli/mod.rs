pub mod init;
pub mod report;
pub mod status;
pub mod upload;

use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::{get_connection, init_db};
use crate::error::{LedgerError, Result};
use crate::settings::{db_path, Settings};

#[derive(Parser)]
#[command(
    name = "ledgerlens",
    about = "Normalize small-business spreadsheets into bookkeeping, forecast and working-capital views."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every read-only view.
#[derive(Args, Debug, Clone)]
pub struct ViewArgs {
    /// User whose uploads to read (default: user_id from settings)
    #[arg(long)]
    pub user: Option<String>,
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for ledgerlens data (default: ~/Documents/ledgerlens)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Default user id for uploads and views
        #[arg(long)]
        user: Option<String>,
        /// Currency symbol used in observations and tables
        #[arg(long)]
        currency: Option<String>,
    },
    /// Map, validate and parse a CSV/XLSX export, then store it.
    Upload {
        /// Path to CSV or XLSX file
        file: String,
        /// Upload type: bank, sales, purchase, inventory or loan
        #[arg(long = "type")]
        upload_type: String,
        /// User to store the upload under
        #[arg(long)]
        user: Option<String>,
        /// Parse and report without storing anything
        #[arg(long)]
        dry_run: bool,
        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,
    },
    /// Show the running metrics snapshot.
    Metrics(ViewArgs),
    /// Bookkeeping summary: income, expenses, categories, months.
    Summary(ViewArgs),
    /// Three-month rule-based forecast.
    Forecast(ViewArgs),
    /// Receivables, payables, gap and risk level.
    WorkingCapital(ViewArgs),
    /// Inventory totals from inventory uploads.
    Inventory(ViewArgs),
    /// Loan obligations from loan uploads.
    Loans(ViewArgs),
    /// Show data directory, database and upload counts.
    Status,
}

pub(crate) fn resolve_user(user: Option<String>, settings: &Settings) -> String {
    user.filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| settings.user_id.clone())
}

/// Open the configured database, failing with a hint when `init` was never run.
pub(crate) fn open_db() -> Result<Connection> {
    let db_path = db_path();
    if !db_path.exists() {
        return Err(LedgerError::Other(format!(
            "No database found at {}\nRun `ledgerlens init` to set up.",
            db_path.display()
        )));
    }
    let conn = get_connection(&db_path)?;
    init_db(&conn)?;
    Ok(conn)
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
