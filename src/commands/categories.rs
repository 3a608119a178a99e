// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::LedgerError;
use crate::models::Category;
use crate::utils::{id_for_category, maybe_print_json, pretty_table, require_text};
use anyhow::Result;
use rusqlite::{params, Connection};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = require_text("Category name", sub.get_one::<String>("name").unwrap())?;
            let description = sub
                .get_one::<String>("description")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            conn.execute(
                "INSERT INTO categories(name, description) VALUES (?1, ?2)",
                params![name, description],
            )?;
            tracing::info!(id = conn.last_insert_rowid(), name = %name, "category added");
            println!("Added category '{}'", name);
        }
        Some(("list", sub)) => {
            let cats = list_categories(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &cats)? {
                let data = cats
                    .into_iter()
                    .map(|c| vec![c.name, c.description.unwrap_or_default()])
                    .collect();
                println!("{}", pretty_table(&["Category", "Description"], data));
            }
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            remove_category(conn, name)?;
            println!("Removed category '{}'", name);
        }
        _ => {}
    }
    Ok(())
}

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT id, name, description FROM categories ORDER BY name")?;
    let rows = stmt.query_map([], |r| {
        Ok(Category {
            id: r.get(0)?,
            name: r.get(1)?,
            description: r.get(2)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Refuses to delete a category still used by transactions.
pub fn remove_category(conn: &Connection, name: &str) -> Result<()> {
    let id = id_for_category(conn, name)?;
    let used: i64 = conn.query_row(
        "SELECT COUNT(*) FROM transactions WHERE category_id=?1",
        params![id],
        |r| r.get(0),
    )?;
    if used > 0 {
        return Err(LedgerError::in_use("Category", name, used, "transaction(s)").into());
    }
    conn.execute("DELETE FROM categories WHERE id=?1", params![id])?;
    tracing::info!(id, name, "category removed");
    Ok(())
}
