// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::LedgerError;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Partnerbook", "partnerbook"));

pub const DB_ENV: &str = "PARTNERBOOK_DB";
pub const OPEN_ATTEMPTS: u32 = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

pub fn db_path() -> Result<PathBuf> {
    if let Some(p) = std::env::var_os(DB_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(p));
    }
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("partnerbook.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let mut conn = open_with_retry(&path, OPEN_ATTEMPTS, RETRY_DELAY)
        .with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

/// Opens the store, retrying a fixed number of times before giving up.
pub fn open_with_retry(
    path: &Path,
    attempts: u32,
    delay: Duration,
) -> Result<Connection, LedgerError> {
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match Connection::open(path).and_then(|c| {
            c.busy_timeout(Duration::from_secs(5))?;
            c.query_row("SELECT 1", [], |r| r.get::<_, i64>(0))?;
            Ok(c)
        }) {
            Ok(conn) => {
                tracing::debug!(path = %path.display(), attempt, "store opened");
                return Ok(conn);
            }
            Err(err) if attempt < attempts => {
                tracing::warn!(
                    path = %path.display(),
                    attempt,
                    attempts,
                    error = %err,
                    "store open failed, retrying"
                );
                thread::sleep(delay);
            }
            Err(source) => {
                tracing::error!(path = %path.display(), attempts, error = %source, "store unavailable");
                return Err(LedgerError::Storage { attempts, source });
            }
        }
    }
}

pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS categories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        description TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS projects(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        description TEXT,
        included_in_calc INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL,
        amount TEXT NOT NULL,
        label TEXT NOT NULL,
        category_id INTEGER NOT NULL,
        kind TEXT NOT NULL CHECK(kind IN ('charge','recette')),
        project_id INTEGER,
        paid INTEGER NOT NULL DEFAULT 0,
        payment_date TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(category_id) REFERENCES categories(id),
        FOREIGN KEY(project_id) REFERENCES projects(id)
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
    CREATE INDEX IF NOT EXISTS idx_transactions_project ON transactions(project_id);

    CREATE TABLE IF NOT EXISTS partners(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        share_percentage TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS partner_payments(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        partner_id INTEGER NOT NULL,
        amount TEXT NOT NULL,
        date TEXT NOT NULL,
        description TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(partner_id) REFERENCES partners(id)
    );

    CREATE TABLE IF NOT EXISTS immobilisations(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT,
        total_price TEXT NOT NULL,
        acquisition_date TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS investment_transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        partner_id INTEGER NOT NULL,
        immobilisation_id INTEGER NOT NULL,
        amount TEXT NOT NULL,
        date TEXT NOT NULL,
        description TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(partner_id) REFERENCES partners(id),
        FOREIGN KEY(immobilisation_id) REFERENCES immobilisations(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS invoice_sequence(
        id INTEGER PRIMARY KEY CHECK(id = 1),
        current_value INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS invoices(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        invoice_number TEXT NOT NULL UNIQUE,
        date TEXT NOT NULL,
        client_info TEXT NOT NULL, -- JSON
        period_from TEXT,
        period_to TEXT,
        lines TEXT NOT NULL, -- JSON
        totals_info TEXT NOT NULL, -- JSON
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS todo_tasks(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_name TEXT NOT NULL,
        due_date TEXT NOT NULL,
        description TEXT,
        steps TEXT NOT NULL DEFAULT '[]', -- JSON
        requirements TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    "#,
    )?;
    tracing::debug!("schema ready");
    Ok(())
}
