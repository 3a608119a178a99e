// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::LedgerError;
use crate::models::Project;
use crate::utils::{id_for_project, maybe_print_json, pretty_table, require_text};
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = require_text("Project name", sub.get_one::<String>("name").unwrap())?;
            let description = sub
                .get_one::<String>("description")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            let included = !sub.get_flag("excluded");
            add_project(conn, &name, description.as_deref(), included)?;
            println!(
                "Added project '{}' ({})",
                name,
                if included { "included" } else { "excluded" }
            );
        }
        Some(("list", sub)) => list(conn, sub)?,
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            remove_project(conn, name)?;
            println!("Removed project '{}'", name);
        }
        Some(("rename", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let to = require_text("New project name", sub.get_one::<String>("to").unwrap())?;
            rename_project(conn, name, &to)?;
            println!("Renamed project '{}' -> '{}'", name, to);
        }
        Some(("include", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            set_inclusion(conn, name, true)?;
            println!("Project '{}' is now included in calculations", name);
        }
        Some(("exclude", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            set_inclusion(conn, name, false)?;
            println!("Project '{}' is now excluded from calculations", name);
        }
        _ => {}
    }
    Ok(())
}

pub fn add_project(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
    included: bool,
) -> Result<i64> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT id FROM projects WHERE name=?1",
            params![name],
            |r| r.get(0),
        )
        .optional()?;
    if exists.is_some() {
        return Err(LedgerError::validation(format!("Project '{}' already exists", name)).into());
    }
    conn.execute(
        "INSERT INTO projects(name, description, included_in_calc) VALUES (?1, ?2, ?3)",
        params![name, description, included],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(id, name, included, "project added");
    Ok(id)
}

#[derive(Serialize)]
pub struct ProjectRow {
    #[serde(flatten)]
    pub project: Project,
    pub transactions: i64,
}

pub fn list_projects(conn: &Connection) -> Result<Vec<ProjectRow>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.name, p.description, p.included_in_calc,
                (SELECT COUNT(*) FROM transactions t WHERE t.project_id = p.id)
         FROM projects p ORDER BY p.name",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(ProjectRow {
            project: Project {
                id: r.get(0)?,
                name: r.get(1)?,
                description: r.get(2)?,
                included_in_calc: r.get(3)?,
            },
            transactions: r.get(4)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let data = list_projects(conn)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .into_iter()
            .map(|p| {
                vec![
                    p.project.name,
                    if p.project.included_in_calc { "yes" } else { "no" }.to_string(),
                    p.transactions.to_string(),
                    p.project.description.unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Project", "Included", "Transactions", "Description"], rows)
        );
    }
    Ok(())
}

pub fn remove_project(conn: &Connection, name: &str) -> Result<()> {
    let id = id_for_project(conn, name)?;
    let used: i64 = conn.query_row(
        "SELECT COUNT(*) FROM transactions WHERE project_id=?1",
        params![id],
        |r| r.get(0),
    )?;
    if used > 0 {
        return Err(LedgerError::in_use("Project", name, used, "transaction(s)").into());
    }
    conn.execute("DELETE FROM projects WHERE id=?1", params![id])?;
    tracing::info!(id, name, "project removed");
    Ok(())
}

/// Transactions reference projects by id, so only the name row changes; todo
/// tasks that carry the project name are moved along in the same transaction.
pub fn rename_project(conn: &mut Connection, name: &str, to: &str) -> Result<()> {
    let tx = conn.transaction()?;
    let id = id_for_project(&tx, name)?;
    let clash: Option<i64> = tx
        .query_row(
            "SELECT id FROM projects WHERE name=?1 AND id<>?2",
            params![to, id],
            |r| r.get(0),
        )
        .optional()?;
    if clash.is_some() {
        return Err(LedgerError::validation(format!("A project named '{}' already exists", to)).into());
    }
    tx.execute("UPDATE projects SET name=?1 WHERE id=?2", params![to, id])?;
    tx.execute(
        "UPDATE todo_tasks SET project_name=?1 WHERE project_name=?2",
        params![to, name],
    )?;
    tx.commit()?;
    tracing::info!(id, from = name, to, "project renamed");
    Ok(())
}

pub fn set_inclusion(conn: &Connection, name: &str, included: bool) -> Result<()> {
    let id = id_for_project(conn, name)?;
    conn.execute(
        "UPDATE projects SET included_in_calc=?1 WHERE id=?2",
        params![included, id],
    )?;
    tracing::info!(id, name, included, "project inclusion updated");
    Ok(())
}
