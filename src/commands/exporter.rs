// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::LedgerError;
use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => {
            let fmt: ExportFormat = sub.get_one::<String>("format").unwrap().parse()?;
            let out = sub.get_one::<String>("out").unwrap();
            let n = export_transactions(conn, fmt, Path::new(out), sub.get_flag("included-only"))?;
            println!("Exported {} transaction(s) to {}", n, out);
            Ok(())
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(LedgerError::validation(format!(
                "Unknown format: {} (use csv|json)",
                other
            ))),
        }
    }
}

/// Writes `rows` to `out`. CSV gets one header line from the field names.
pub fn write_rows<T: Serialize>(fmt: ExportFormat, out: &Path, rows: &[T]) -> Result<()> {
    match fmt {
        ExportFormat::Csv => {
            let mut wtr = csv::Writer::from_path(out)
                .with_context(|| format!("Create {}", out.display()))?;
            for row in rows {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
        }
        ExportFormat::Json => {
            std::fs::write(out, serde_json::to_string_pretty(rows)?)
                .with_context(|| format!("Write {}", out.display()))?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ExportRow {
    date: String,
    amount: String,
    label: String,
    kind: String,
    project: String,
    category: String,
    paid: &'static str,
    payment_date: String,
}

/// Exports in the importer's column layout, so a CSV export can be imported
/// back as is.
pub fn export_transactions(
    conn: &Connection,
    fmt: ExportFormat,
    out: &Path,
    included_only: bool,
) -> Result<usize> {
    let mut sql = String::from(
        "SELECT t.date, t.amount, t.label, t.kind, p.name, c.name, t.paid, t.payment_date
         FROM transactions t
         LEFT JOIN categories c ON t.category_id=c.id
         LEFT JOIN projects p ON t.project_id=p.id",
    );
    if included_only {
        sql.push_str(" WHERE (t.project_id IS NULL OR p.included_in_calc=1)");
    }
    sql.push_str(" ORDER BY t.date, t.id");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |r| {
        Ok(ExportRow {
            date: r.get(0)?,
            amount: r.get(1)?,
            label: r.get(2)?,
            kind: r.get(3)?,
            project: r.get::<_, Option<String>>(4)?.unwrap_or_default(),
            category: r.get::<_, Option<String>>(5)?.unwrap_or_default(),
            paid: if r.get::<_, bool>(6)? { "oui" } else { "non" },
            payment_date: r.get::<_, Option<String>>(7)?.unwrap_or_default(),
        })
    })?;
    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    write_rows(fmt, out, &items)?;
    tracing::info!(count = items.len(), out = %out.display(), "transactions exported");
    Ok(items.len())
}
