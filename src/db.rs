use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, TransactionBehavior};

use crate::error::Result;
use crate::importer::UploadResult;
use crate::metrics::MetricsSnapshot;
use crate::models::{UploadRecord, UploadRows, UploadType};

pub const DB_FILENAME: &str = "ledgerlens.db";

const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS uploads (
    id INTEGER PRIMARY KEY,
    user_id TEXT NOT NULL,
    filename TEXT NOT NULL,
    file_type TEXT NOT NULL CHECK (file_type IN ('bank', 'sales', 'purchase')),
    processing_status TEXT NOT NULL DEFAULT 'completed',
    parsed_data TEXT NOT NULL DEFAULT '[]',
    rows_parsed INTEGER NOT NULL DEFAULT 0,
    confidence INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_uploads_user ON uploads(user_id);

CREATE TABLE IF NOT EXISTS metrics (
    user_id TEXT PRIMARY KEY,
    upload_id INTEGER,
    total_revenue REAL NOT NULL DEFAULT 0,
    total_expenses REAL NOT NULL DEFAULT 0,
    cash_inflow REAL NOT NULL DEFAULT 0,
    cash_outflow REAL NOT NULL DEFAULT 0,
    total_receivables REAL NOT NULL DEFAULT 0,
    total_payables REAL NOT NULL DEFAULT 0,
    net_profit REAL NOT NULL DEFAULT 0,
    profit_margin REAL NOT NULL DEFAULT 0,
    updated_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (upload_id) REFERENCES uploads(id)
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Filename as stored: auxiliary uploads carry their tag exactly once.
pub fn stored_filename(filename: &str, upload_type: UploadType) -> String {
    match upload_type.storage_tag() {
        Some(tag) if !filename.starts_with(tag) => format!("{tag} {filename}"),
        _ => filename.to_string(),
    }
}

pub struct StoredUpload {
    pub upload_id: i64,
    pub filename: String,
    pub metrics: Option<MetricsSnapshot>,
}

fn read_metrics(conn: &Connection, user_id: &str) -> Result<Option<MetricsSnapshot>> {
    Ok(conn
        .query_row(
            "SELECT total_revenue, total_expenses, cash_inflow, cash_outflow, \
             total_receivables, total_payables, net_profit, profit_margin \
             FROM metrics WHERE user_id = ?1",
            [user_id],
            |row| {
                Ok(MetricsSnapshot {
                    total_revenue: row.get(0)?,
                    total_expenses: row.get(1)?,
                    cash_inflow: row.get(2)?,
                    cash_outflow: row.get(3)?,
                    total_receivables: row.get(4)?,
                    total_payables: row.get(5)?,
                    net_profit: row.get(6)?,
                    profit_margin: row.get(7)?,
                })
            },
        )
        .optional()?)
}

/// Persist a processed upload and fold its partial metrics into the user's snapshot.
///
/// The write lock is taken before the snapshot is read, so concurrent uploads
/// for the same user merge one after another. The upload row and the merged
/// snapshot commit together or not at all.
pub fn store_upload(
    conn: &mut Connection,
    user_id: &str,
    filename: &str,
    upload_type: UploadType,
    result: &UploadResult,
) -> Result<StoredUpload> {
    let filename = stored_filename(filename, upload_type);
    let parsed_data = serde_json::to_string(&result.parsed_data)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute(
        "INSERT INTO uploads (user_id, filename, file_type, processing_status, parsed_data, rows_parsed, confidence) \
         VALUES (?1, ?2, ?3, 'completed', ?4, ?5, ?6)",
        rusqlite::params![
            user_id,
            filename,
            upload_type.storage_type().as_str(),
            parsed_data,
            result.rows_parsed as i64,
            result.confidence,
        ],
    )?;
    let upload_id = tx.last_insert_rowid();

    let previous = read_metrics(&tx, user_id)?;
    let metrics = if result.metrics.is_empty() {
        previous
    } else {
        let merged = previous.unwrap_or_default().merge(&result.metrics);
        tx.execute(
            "INSERT INTO metrics (user_id, upload_id, total_revenue, total_expenses, cash_inflow, \
             cash_outflow, total_receivables, total_payables, net_profit, profit_margin, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, datetime('now')) \
             ON CONFLICT(user_id) DO UPDATE SET \
             upload_id = excluded.upload_id, \
             total_revenue = excluded.total_revenue, \
             total_expenses = excluded.total_expenses, \
             cash_inflow = excluded.cash_inflow, \
             cash_outflow = excluded.cash_outflow, \
             total_receivables = excluded.total_receivables, \
             total_payables = excluded.total_payables, \
             net_profit = excluded.net_profit, \
             profit_margin = excluded.profit_margin, \
             updated_at = excluded.updated_at",
            rusqlite::params![
                user_id,
                upload_id,
                merged.total_revenue,
                merged.total_expenses,
                merged.cash_inflow,
                merged.cash_outflow,
                merged.total_receivables,
                merged.total_payables,
                merged.net_profit,
                merged.profit_margin,
            ],
        )?;
        Some(merged)
    };
    tx.commit()?;

    tracing::info!(upload_id, user_id, filename = %filename, "upload stored");
    Ok(StoredUpload {
        upload_id,
        filename,
        metrics,
    })
}

/// Completed uploads for a user, oldest first, with rows typed by effective upload type.
pub fn load_uploads(conn: &Connection, user_id: &str) -> Result<Vec<UploadRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, filename, file_type, processing_status, parsed_data FROM uploads \
         WHERE user_id = ?1 AND processing_status = 'completed' ORDER BY id",
    )?;
    let rows: Vec<(i64, String, String, String, String)> = stmt
        .query_map([user_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut uploads = Vec::with_capacity(rows.len());
    for (id, filename, file_type, status, parsed_data) in rows {
        let mut upload = UploadRecord {
            id,
            filename,
            file_type: file_type.parse()?,
            status,
            rows: UploadRows::Transactions(Vec::new()),
        };
        upload.rows = if upload.is_auxiliary() {
            UploadRows::Raw(serde_json::from_str(&parsed_data)?)
        } else {
            UploadRows::Transactions(serde_json::from_str(&parsed_data)?)
        };
        if upload.rows.is_empty() {
            tracing::warn!(upload_id = upload.id, "stored upload has no rows");
        }
        uploads.push(upload);
    }
    Ok(uploads)
}

pub fn load_metrics(conn: &Connection, user_id: &str) -> Result<Option<MetricsSnapshot>> {
    read_metrics(conn, user_id)
}
