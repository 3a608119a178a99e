// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::LedgerError;
use crate::models::{TodoStep, TodoTask};
use crate::utils::{
    date_column, id_for_project, maybe_print_json, parse_date, parse_id, pretty_table,
};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let project = sub.get_one::<String>("project").unwrap().trim();
            let due = parse_date(sub.get_one::<String>("due").unwrap())?;
            let text = |name: &str| {
                sub.get_one::<String>(name)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
            };
            let steps: Vec<String> = sub
                .get_many::<String>("step")
                .into_iter()
                .flatten()
                .cloned()
                .collect();
            let id = add_task(
                conn,
                project,
                due,
                text("description").as_deref(),
                text("requirements").as_deref(),
                &steps,
            )?;
            println!("Added task {} for project '{}'", id, project);
        }
        Some(("list", sub)) => {
            let tasks = list_tasks(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &tasks)? {
                let rows = tasks
                    .iter()
                    .map(|t| {
                        let done = t.steps.iter().filter(|s| s.completed).count();
                        let steps = t
                            .steps
                            .iter()
                            .enumerate()
                            .map(|(i, s)| {
                                format!("{}. [{}] {}", i + 1, if s.completed { "x" } else { " " }, s.label)
                            })
                            .collect::<Vec<_>>()
                            .join("\n");
                        vec![
                            t.id.to_string(),
                            t.due_date.to_string(),
                            t.project_name.clone(),
                            t.description.clone().unwrap_or_default(),
                            format!("{}/{}", done, t.steps.len()),
                            steps,
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["ID", "Due", "Project", "Description", "Done", "Steps"], rows)
                );
            }
        }
        Some(("check", sub)) => {
            let id = parse_id(sub.get_one::<String>("id").unwrap())?;
            let step = *sub.get_one::<usize>("step").unwrap();
            let completed = !sub.get_flag("undo");
            let task = set_step(conn, id, step, completed)?;
            println!(
                "Task {} step {} {}{}",
                id,
                step,
                if completed { "done" } else { "reopened" },
                if task.is_complete() { " (task complete)" } else { "" }
            );
        }
        Some(("rm", sub)) => {
            let id = parse_id(sub.get_one::<String>("id").unwrap())?;
            let n = conn.execute("DELETE FROM todo_tasks WHERE id=?1", params![id])?;
            if n == 0 {
                return Err(LedgerError::not_found("Task", id.to_string()).into());
            }
            tracing::info!(id, "task removed");
            println!("Removed task {}", id);
        }
        _ => {}
    }
    Ok(())
}

pub fn add_task(
    conn: &Connection,
    project: &str,
    due: NaiveDate,
    description: Option<&str>,
    requirements: Option<&str>,
    steps: &[String],
) -> Result<i64> {
    id_for_project(conn, project)?;
    let steps: Vec<TodoStep> = steps
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|label| TodoStep {
            label: label.to_string(),
            completed: false,
        })
        .collect();
    conn.execute(
        "INSERT INTO todo_tasks(project_name, due_date, description, steps, requirements)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            project,
            due.to_string(),
            description,
            serde_json::to_string(&steps)?,
            requirements
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(id, project, steps = steps.len(), "task added");
    Ok(id)
}

fn task_from_row(r: &rusqlite::Row<'_>) -> Result<TodoTask> {
    let id: i64 = r.get(0)?;
    let due: String = r.get(2)?;
    let steps: String = r.get(4)?;
    Ok(TodoTask {
        id,
        project_name: r.get(1)?,
        due_date: date_column(&due, "due date")?,
        description: r.get(3)?,
        steps: serde_json::from_str(&steps).with_context(|| format!("Invalid steps for task {}", id))?,
        requirements: r.get(5)?,
    })
}

/// Ordered by due date.
pub fn list_tasks(conn: &Connection) -> Result<Vec<TodoTask>> {
    let mut stmt = conn.prepare(
        "SELECT id, project_name, due_date, description, steps, requirements
         FROM todo_tasks ORDER BY due_date, id",
    )?;
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        out.push(task_from_row(r)?);
    }
    Ok(out)
}

/// Marks step `step` (1-based) of task `id` done or not done.
pub fn set_step(conn: &Connection, id: i64, step: usize, completed: bool) -> Result<TodoTask> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT steps FROM todo_tasks WHERE id=?1",
            params![id],
            |r| r.get(0),
        )
        .optional()?;
    let raw = raw.ok_or_else(|| LedgerError::not_found("Task", id.to_string()))?;
    let mut steps: Vec<TodoStep> =
        serde_json::from_str(&raw).with_context(|| format!("Invalid steps for task {}", id))?;
    let slot = step
        .checked_sub(1)
        .and_then(|i| steps.get_mut(i))
        .ok_or_else(|| {
            LedgerError::validation(format!("Task {} has no step {}", id, step))
        })?;
    slot.completed = completed;
    conn.execute(
        "UPDATE todo_tasks SET steps=?1 WHERE id=?2",
        params![serde_json::to_string(&steps)?, id],
    )?;
    tracing::info!(id, step, completed, "task step updated");
    let mut stmt = conn.prepare(
        "SELECT id, project_name, due_date, description, steps, requirements
         FROM todo_tasks WHERE id=?1",
    )?;
    let mut rows = stmt.query(params![id])?;
    match rows.next()? {
        Some(r) => task_from_row(r),
        None => Err(LedgerError::not_found("Task", id.to_string()).into()),
    }
}
