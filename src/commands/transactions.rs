// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::LedgerError;
use crate::models::{Transaction, TxKind};
use crate::utils::{
    currency_suffix, fmt_money, id_for_category, id_for_project, maybe_print_json, parse_amount,
    parse_date, parse_id, pretty_table, require_text, today,
};
use anyhow::Result;
use rusqlite::{params, Connection};
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("rm", sub)) => {
            let id = parse_id(sub.get_one::<String>("id").unwrap())?;
            remove_transaction(conn, id)?;
            println!("Removed transaction {}", id);
        }
        Some(("mark-paid", sub)) => {
            let id = parse_id(sub.get_one::<String>("id").unwrap())?;
            let date = match sub.get_one::<String>("date") {
                Some(raw) => parse_date(raw)?,
                None => today(),
            };
            mark_paid(conn, id, date)?;
            println!("Transaction {} marked paid on {}", id, date);
        }
        Some(("mark-all-paid", _)) => {
            let n = mark_all_paid(conn)?;
            println!("Marked {} transaction(s) paid", n);
        }
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let date = parse_date(sub.get_one::<String>("date").unwrap())?;
    let amount = parse_amount(sub.get_one::<String>("amount").unwrap())?;
    let label = require_text("Label", sub.get_one::<String>("label").unwrap())?;
    let kind: TxKind = sub.get_one::<String>("kind").unwrap().parse()?;
    let category_id = id_for_category(conn, sub.get_one::<String>("category").unwrap())?;
    let project_id = match sub
        .get_one::<String>("project")
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
    {
        Some(p) => Some(id_for_project(conn, p)?),
        None => None,
    };
    let paid = sub.get_flag("paid");
    let payment_date = match sub.get_one::<String>("payment-date") {
        Some(raw) if paid => Some(parse_date(raw)?),
        Some(_) => {
            return Err(LedgerError::validation("--payment-date requires --paid").into());
        }
        None if paid => Some(date),
        None => None,
    };

    let t = Transaction {
        id: 0,
        date,
        amount,
        label,
        category_id,
        kind,
        project_id,
        paid,
        payment_date,
    };
    let id = insert_transaction(conn, &t)?;
    println!(
        "Recorded {} {} on {} '{}' (id {})",
        t.kind,
        fmt_money(&t.amount, &currency_suffix(conn)?),
        t.date,
        t.label,
        id
    );
    Ok(())
}

/// Inserts `t` (its `id` is ignored) and returns the new row id.
pub fn insert_transaction(conn: &Connection, t: &Transaction) -> Result<i64> {
    if t.amount <= rust_decimal::Decimal::ZERO {
        return Err(LedgerError::validation("Amount must be greater than 0").into());
    }
    if t.label.trim().is_empty() {
        return Err(LedgerError::validation("Label is required").into());
    }
    conn.execute(
        "INSERT INTO transactions(date, amount, label, category_id, kind, project_id, paid, payment_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            t.date.to_string(),
            t.amount.to_string(),
            t.label,
            t.category_id,
            t.kind.as_str(),
            t.project_id,
            t.paid,
            t.payment_date.map(|d| d.to_string()),
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(id, kind = %t.kind, amount = %t.amount, "transaction recorded");
    Ok(id)
}

pub fn remove_transaction(conn: &Connection, id: i64) -> Result<()> {
    let n = conn.execute("DELETE FROM transactions WHERE id=?1", params![id])?;
    if n == 0 {
        return Err(LedgerError::not_found("Transaction", id.to_string()).into());
    }
    tracing::info!(id, "transaction removed");
    Ok(())
}

pub fn mark_paid(conn: &Connection, id: i64, date: chrono::NaiveDate) -> Result<()> {
    let n = conn.execute(
        "UPDATE transactions SET paid=1, payment_date=?1 WHERE id=?2",
        params![date.to_string(), id],
    )?;
    if n == 0 {
        return Err(LedgerError::not_found("Transaction", id.to_string()).into());
    }
    tracing::info!(id, %date, "transaction marked paid");
    Ok(())
}

/// Marks every unpaid transaction paid; the payment date falls back to the
/// transaction date where none was recorded.
pub fn mark_all_paid(conn: &Connection) -> Result<usize> {
    let n = conn.execute(
        "UPDATE transactions SET paid=1, payment_date=COALESCE(payment_date, date) WHERE paid=0",
        [],
    )?;
    tracing::info!(count = n, "all transactions marked paid");
    Ok(n)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let suffix = currency_suffix(conn)?;
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.date.clone(),
                    r.kind.clone(),
                    r.label.clone(),
                    fmt_money(&r.amount, &suffix),
                    r.category.clone(),
                    r.project.clone(),
                    if r.paid { "oui" } else { "non" }.to_string(),
                    r.payment_date.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &[
                    "ID", "Date", "Kind", "Label", "Amount", "Category", "Project", "Paid",
                    "Paid on"
                ],
                rows,
            )
        );
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct TransactionRow {
    pub id: i64,
    pub date: String,
    pub kind: String,
    pub label: String,
    pub amount: rust_decimal::Decimal,
    pub category: String,
    pub project: String,
    pub included_in_calc: bool,
    pub paid: bool,
    pub payment_date: String,
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<TransactionRow>> {
    let mut sql = String::from(
        "SELECT t.id, t.date, t.kind, t.label, t.amount, c.name, p.name,
                (t.project_id IS NULL OR p.included_in_calc = 1), t.paid, t.payment_date
         FROM transactions t
         LEFT JOIN categories c ON t.category_id=c.id
         LEFT JOIN projects p ON t.project_id=p.id
         WHERE 1=1",
    );
    let mut params_vec: Vec<String> = Vec::new();

    if let Some(cat) = sub.get_one::<String>("category") {
        sql.push_str(" AND c.name=?");
        params_vec.push(cat.trim().into());
    }
    if let Some(project) = sub.get_one::<String>("project") {
        sql.push_str(" AND p.name=?");
        params_vec.push(project.trim().into());
    }
    if let Some(kind) = sub.get_one::<String>("kind") {
        let kind: TxKind = kind.parse()?;
        sql.push_str(" AND t.kind=?");
        params_vec.push(kind.as_str().into());
    }
    if sub.get_flag("paid") {
        sql.push_str(" AND t.paid=1");
    }
    if sub.get_flag("unpaid") {
        sql.push_str(" AND t.paid=0");
    }
    if sub.get_flag("included-only") {
        sql.push_str(" AND (t.project_id IS NULL OR p.included_in_calc=1)");
    }
    if sub.get_flag("excluded-only") {
        sql.push_str(" AND p.included_in_calc=0");
    }
    for (arg, clause) in [
        ("from", " AND t.date>=?"),
        ("to", " AND t.date<=?"),
        ("paid-from", " AND t.payment_date>=?"),
        ("paid-to", " AND t.payment_date<=?"),
    ] {
        if let Some(raw) = sub.get_one::<String>(arg) {
            sql.push_str(clause);
            params_vec.push(parse_date(raw)?.to_string());
        }
    }
    sql.push_str(" ORDER BY t.date DESC, t.id DESC");
    if let Some(limit) = sub.get_one::<usize>("limit") {
        sql.push_str(" LIMIT ?");
        params_vec.push(limit.to_string());
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(rusqlite::params_from_iter(params_vec.iter()))?;

    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        let amount: String = r.get(4)?;
        let category: Option<String> = r.get(5)?;
        let project: Option<String> = r.get(6)?;
        let payment_date: Option<String> = r.get(9)?;
        data.push(TransactionRow {
            id: r.get(0)?,
            date: r.get(1)?,
            kind: r.get(2)?,
            label: r.get(3)?,
            amount: crate::utils::decimal_column(&amount, "transaction amount")?,
            category: category.unwrap_or_default(),
            project: project.unwrap_or_default(),
            included_in_calc: r.get(7)?,
            paid: r.get(8)?,
            payment_date: payment_date.unwrap_or_default(),
        });
    }
    Ok(data)
}
