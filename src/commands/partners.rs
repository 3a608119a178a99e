// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::LedgerError;
use crate::models::Partner;
use crate::utils::{
    currency_suffix, decimal_column, fmt_money, id_for_partner, maybe_print_json,
    parse_percentage, pretty_table, require_text,
};
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = require_text("Partner name", sub.get_one::<String>("name").unwrap())?;
            let share = parse_percentage(sub.get_one::<String>("share").unwrap())?;
            add_partner(conn, &name, share)?;
            println!("Added partner '{}' with {}%", name, share);
            warn_if_unallocated(conn)?;
        }
        Some(("list", sub)) => list(conn, sub)?,
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            remove_partner(conn, name)?;
            println!("Removed partner '{}'", name);
            warn_if_unallocated(conn)?;
        }
        Some(("set-share", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let share = parse_percentage(sub.get_one::<String>("share").unwrap())?;
            set_share(conn, name, share)?;
            println!("Partner '{}' now holds {}%", name, share);
            warn_if_unallocated(conn)?;
        }
        _ => {}
    }
    Ok(())
}

pub fn list_partners(conn: &Connection) -> Result<Vec<Partner>> {
    let mut stmt = conn.prepare("SELECT id, name, share_percentage FROM partners ORDER BY name")?;
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        let share: String = r.get(2)?;
        out.push(Partner {
            id: r.get(0)?,
            name: r.get(1)?,
            share_percentage: decimal_column(&share, "share percentage")?,
        });
    }
    Ok(out)
}

/// Sum of every partner's share, optionally leaving one partner out.
pub fn share_total(conn: &Connection, except: Option<i64>) -> Result<Decimal> {
    Ok(list_partners(conn)?
        .iter()
        .filter(|p| Some(p.id) != except)
        .map(|p| p.share_percentage)
        .sum())
}

fn ensure_within_hundred(conn: &Connection, except: Option<i64>, share: Decimal) -> Result<()> {
    let others = share_total(conn, except)?;
    if others + share > Decimal::ONE_HUNDRED {
        return Err(LedgerError::validation(format!(
            "Shares would total {}% (others hold {}%), which exceeds 100%",
            others + share,
            others
        ))
        .into());
    }
    Ok(())
}

pub fn add_partner(conn: &Connection, name: &str, share: Decimal) -> Result<i64> {
    if share <= Decimal::ZERO || share > Decimal::ONE_HUNDRED {
        return Err(LedgerError::validation("Share percentage must be in (0, 100]").into());
    }
    let exists: Option<i64> = conn
        .query_row("SELECT id FROM partners WHERE name=?1", params![name], |r| {
            r.get(0)
        })
        .optional()?;
    if exists.is_some() {
        return Err(LedgerError::validation(format!("Partner '{}' already exists", name)).into());
    }
    ensure_within_hundred(conn, None, share)?;
    conn.execute(
        "INSERT INTO partners(name, share_percentage) VALUES (?1, ?2)",
        params![name, share.to_string()],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(id, name, %share, "partner added");
    Ok(id)
}

pub fn set_share(conn: &Connection, name: &str, share: Decimal) -> Result<()> {
    if share <= Decimal::ZERO || share > Decimal::ONE_HUNDRED {
        return Err(LedgerError::validation("Share percentage must be in (0, 100]").into());
    }
    let id = id_for_partner(conn, name)?;
    ensure_within_hundred(conn, Some(id), share)?;
    conn.execute(
        "UPDATE partners SET share_percentage=?1 WHERE id=?2",
        params![share.to_string(), id],
    )?;
    tracing::info!(id, name, %share, "partner share updated");
    Ok(())
}

pub fn remove_partner(conn: &Connection, name: &str) -> Result<()> {
    let id = id_for_partner(conn, name)?;
    let payments: i64 = conn.query_row(
        "SELECT COUNT(*) FROM partner_payments WHERE partner_id=?1",
        params![id],
        |r| r.get(0),
    )?;
    if payments > 0 {
        return Err(LedgerError::in_use("Partner", name, payments, "payment(s)").into());
    }
    let investments: i64 = conn.query_row(
        "SELECT COUNT(*) FROM investment_transactions WHERE partner_id=?1",
        params![id],
        |r| r.get(0),
    )?;
    if investments > 0 {
        return Err(LedgerError::in_use("Partner", name, investments, "investment(s)").into());
    }
    conn.execute("DELETE FROM partners WHERE id=?1", params![id])?;
    tracing::info!(id, name, "partner removed");
    Ok(())
}

fn warn_if_unallocated(conn: &Connection) -> Result<()> {
    let total = share_total(conn, None)?;
    if total != Decimal::ONE_HUNDRED {
        tracing::warn!(%total, "partner shares do not total 100%");
        println!("Warning: partner shares total {}% (expected 100%)", total);
    }
    Ok(())
}

#[derive(Serialize)]
struct PartnerRow {
    #[serde(flatten)]
    partner: Partner,
    total_paid_out: Decimal,
    total_invested: Decimal,
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let snapshot = crate::commands::settlement::load_snapshot(conn)?;
    let data: Vec<PartnerRow> = snapshot
        .partners
        .iter()
        .map(|p| PartnerRow {
            partner: Partner {
                id: p.id,
                name: p.name.clone(),
                share_percentage: p.share_percentage,
            },
            total_paid_out: p.total_paid_out,
            total_invested: p.total_invested,
        })
        .collect();
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let suffix = currency_suffix(conn)?;
        let rows = data
            .iter()
            .map(|r| {
                vec![
                    r.partner.name.clone(),
                    format!("{}%", r.partner.share_percentage),
                    fmt_money(&r.total_paid_out, &suffix),
                    fmt_money(&r.total_invested, &suffix),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Partner", "Share", "Paid out", "Invested"], rows)
        );
        if !snapshot.is_fully_allocated() {
            println!(
                "Warning: partner shares total {}% (expected 100%)",
                snapshot.share_total()
            );
        }
    }
    Ok(())
}
