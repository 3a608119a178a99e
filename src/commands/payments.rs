// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::LedgerError;
use crate::utils::{
    currency_suffix, date_column, decimal_column, fmt_money, id_for_partner, maybe_print_json,
    page_bounds, parse_amount, parse_date, parse_id, pretty_table, today,
};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let partner = sub.get_one::<String>("partner").unwrap().trim();
            let amount = parse_amount(sub.get_one::<String>("amount").unwrap())?;
            let date = match sub.get_one::<String>("date") {
                Some(raw) => parse_date(raw)?,
                None => today(),
            };
            let description = sub
                .get_one::<String>("description")
                .map(|s| s.trim())
                .filter(|s| !s.is_empty());
            let id = add_payment(conn, partner, amount, date, description)?;
            println!(
                "Recorded payment {} of {} to '{}' on {}",
                id,
                fmt_money(&amount, &currency_suffix(conn)?),
                partner,
                date
            );
        }
        Some(("list", sub)) => list(conn, sub)?,
        Some(("rm", sub)) => {
            let id = parse_id(sub.get_one::<String>("id").unwrap())?;
            remove_payment(conn, id)?;
            println!("Removed payment {}", id);
        }
        _ => {}
    }
    Ok(())
}

pub fn add_payment(
    conn: &Connection,
    partner: &str,
    amount: Decimal,
    date: NaiveDate,
    description: Option<&str>,
) -> Result<i64> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation("Amount must be greater than 0").into());
    }
    let partner_id = id_for_partner(conn, partner)?;
    conn.execute(
        "INSERT INTO partner_payments(partner_id, amount, date, description) VALUES (?1, ?2, ?3, ?4)",
        params![partner_id, amount.to_string(), date.to_string(), description],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(id, partner_id, %amount, "partner payment recorded");
    Ok(id)
}

pub fn remove_payment(conn: &Connection, id: i64) -> Result<()> {
    let n = conn.execute("DELETE FROM partner_payments WHERE id=?1", params![id])?;
    if n == 0 {
        return Err(LedgerError::not_found("Payment", id.to_string()).into());
    }
    tracing::info!(id, "partner payment removed");
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct PaymentRow {
    pub id: i64,
    pub partner: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub description: String,
}

/// Payments newest first, optionally for one partner.
pub fn list_payments(conn: &Connection, partner: Option<&str>) -> Result<Vec<PaymentRow>> {
    let mut sql = String::from(
        "SELECT pp.id, p.name, pp.amount, pp.date, pp.description
         FROM partner_payments pp JOIN partners p ON pp.partner_id=p.id",
    );
    let mut params_vec: Vec<String> = Vec::new();
    if let Some(name) = partner {
        sql.push_str(" WHERE p.name=?");
        params_vec.push(name.trim().to_string());
    }
    sql.push_str(" ORDER BY pp.date DESC, pp.id DESC");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(rusqlite::params_from_iter(params_vec.iter()))?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        let amount: String = r.get(2)?;
        let date: String = r.get(3)?;
        out.push(PaymentRow {
            id: r.get(0)?,
            partner: r.get(1)?,
            amount: decimal_column(&amount, "payment amount")?,
            date: date_column(&date, "payment date")?,
            description: r.get::<_, Option<String>>(4)?.unwrap_or_default(),
        });
    }
    Ok(out)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let all = list_payments(conn, sub.get_one::<String>("partner").map(|s| s.as_str()))?;
    let per_page = *sub.get_one::<usize>("limit").unwrap_or(&0);
    let page = *sub.get_one::<usize>("page").unwrap_or(&1);
    let (start, end) = page_bounds(all.len(), per_page, page);
    let data = &all[start..end];
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let suffix = currency_suffix(conn)?;
        let rows = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.date.to_string(),
                    r.partner.clone(),
                    fmt_money(&r.amount, &suffix),
                    r.description.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["ID", "Date", "Partner", "Amount", "Description"], rows)
        );
        if per_page > 0 {
            let pages = all.len().div_ceil(per_page).max(1);
            println!("Page {}/{} ({} payment(s))", page.max(1), pages, all.len());
        }
    }
    Ok(())
}
