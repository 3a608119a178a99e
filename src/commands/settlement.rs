// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::exporter::{write_rows, ExportFormat};
use crate::commands::partners::list_partners;
use crate::models::TxKind;
use crate::settlement::{
    payout_distribution, settle, settle_legacy, LedgerTotals, LegacyReferences,
    LegacySettlement, PartnerPosition, PayoutDistribution, Settlement, Snapshot,
};
use crate::utils::{currency_suffix, decimal_column, fmt_money, get_setting, pretty_table};
use anyhow::Result;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::Path;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("show", sub)) => show(conn, sub)?,
        Some(("legacy", sub)) => {
            let snapshot = load_snapshot(conn)?;
            let legacy = settle_legacy(&snapshot, &legacy_references(conn)?);
            warn_unmatched(&legacy);
            if !crate::utils::maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &legacy)? {
                print_legacy(&legacy, &currency_suffix(conn)?);
            }
        }
        Some(("export", sub)) => {
            let table = sub.get_one::<String>("table").unwrap();
            let fmt: ExportFormat = sub.get_one::<String>("format").unwrap().parse()?;
            let out = sub.get_one::<String>("out").unwrap();
            let n = export_settlement(conn, table, fmt, Path::new(out))?;
            println!("Exported {} {} settlement row(s) to {}", n, table, out);
        }
        _ => {}
    }
    Ok(())
}

/// Sums transactions by kind and paid flag. With `included_only` the
/// transactions of projects excluded from calculations are left out;
/// transactions without a project always count.
pub fn load_totals(conn: &Connection, included_only: bool) -> Result<LedgerTotals> {
    let mut sql = String::from(
        "SELECT t.kind, t.paid, t.amount
         FROM transactions t LEFT JOIN projects p ON t.project_id=p.id",
    );
    if included_only {
        sql.push_str(" WHERE t.project_id IS NULL OR p.included_in_calc=1");
    }
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    let mut totals = LedgerTotals::default();
    while let Some(r) = rows.next()? {
        let kind: String = r.get(0)?;
        let paid: bool = r.get(1)?;
        let amount: String = r.get(2)?;
        let amount = decimal_column(&amount, "transaction amount")?;
        match (kind.parse::<TxKind>()?, paid) {
            (TxKind::Recette, true) => totals.paid_revenue += amount,
            (TxKind::Recette, false) => totals.unpaid_revenue += amount,
            (TxKind::Charge, _) => totals.total_expense += amount,
        }
    }
    Ok(totals)
}

fn sum_for_partner(conn: &Connection, sql: &str, partner_id: i64, what: &str) -> Result<Decimal> {
    let mut stmt = conn.prepare_cached(sql)?;
    let mut rows = stmt.query(params![partner_id])?;
    let mut total = Decimal::ZERO;
    while let Some(r) = rows.next()? {
        let raw: String = r.get(0)?;
        total += decimal_column(&raw, what)?;
    }
    Ok(total)
}

/// Reads everything the settlement needs inside one read transaction so the
/// figures are mutually consistent.
pub fn load_snapshot(conn: &Connection) -> Result<Snapshot> {
    let tx = conn.unchecked_transaction()?;
    let snapshot = read_snapshot(&tx)?;
    tx.commit()?;
    Ok(snapshot)
}

/// Unfiltered totals and the settlement snapshot, read in the same transaction.
pub fn load_with_global_totals(conn: &Connection) -> Result<(LedgerTotals, Snapshot)> {
    let tx = conn.unchecked_transaction()?;
    let global = load_totals(&tx, false)?;
    let snapshot = read_snapshot(&tx)?;
    tx.commit()?;
    Ok((global, snapshot))
}

fn read_snapshot(conn: &Connection) -> Result<Snapshot> {
    let totals = load_totals(conn, true)?;
    let mut partners = Vec::new();
    for p in list_partners(conn)? {
        let total_invested = sum_for_partner(
            conn,
            "SELECT amount FROM investment_transactions WHERE partner_id=?1",
            p.id,
            "investment amount",
        )?;
        let total_paid_out = sum_for_partner(
            conn,
            "SELECT amount FROM partner_payments WHERE partner_id=?1",
            p.id,
            "payment amount",
        )?;
        partners.push(PartnerPosition {
            id: p.id,
            name: p.name,
            share_percentage: p.share_percentage,
            total_invested,
            total_paid_out,
        });
    }
    tracing::debug!(partners = partners.len(), "settlement snapshot loaded");
    Ok(Snapshot { totals, partners })
}

pub fn legacy_references(conn: &Connection) -> Result<LegacyReferences> {
    Ok(LegacyReferences {
        first: get_setting(conn, "legacy_first_partner")?,
        second: get_setting(conn, "legacy_second_partner")?,
    })
}

fn warn_unmatched(legacy: &LegacySettlement) {
    for row in [&legacy.first, &legacy.second] {
        if !row.matched {
            tracing::warn!(partner = %row.partner, "legacy reference partner not found");
            eprintln!(
                "Warning: legacy reference partner '{}' not found, row is zero-filled",
                row.partner
            );
        }
    }
}

#[derive(Serialize)]
struct SettlementReport {
    global_totals: LedgerTotals,
    effective_totals: LedgerTotals,
    share_total: Decimal,
    fully_allocated: bool,
    primary: Settlement,
    distribution: PayoutDistribution,
    legacy: Option<LegacySettlement>,
    errors: Vec<String>,
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let (global, snapshot) = load_with_global_totals(conn)?;
    let mut errors = Vec::new();

    let primary = settle(&snapshot);
    let distribution = payout_distribution(&snapshot);
    if !snapshot.is_fully_allocated() {
        tracing::warn!(total = %snapshot.share_total(), "partner shares do not total 100%");
    }

    // Legacy failures are reported inline; the primary block still renders.
    let legacy = match legacy_references(conn) {
        Ok(refs) => {
            let legacy = settle_legacy(&snapshot, &refs);
            warn_unmatched(&legacy);
            Some(legacy)
        }
        Err(e) => {
            tracing::warn!(error = %e, "legacy settlement unavailable");
            errors.push(format!("legacy settlement unavailable: {:#}", e));
            None
        }
    };

    let report = SettlementReport {
        global_totals: global,
        effective_totals: snapshot.totals,
        share_total: snapshot.share_total(),
        fully_allocated: snapshot.is_fully_allocated(),
        primary,
        distribution,
        legacy,
        errors,
    };
    if crate::utils::maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &report)? {
        return Ok(());
    }

    let suffix = match currency_suffix(conn) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "currency suffix unavailable");
            String::new()
        }
    };
    print_totals(&report.global_totals, &report.effective_totals, &suffix);
    print_primary(&report.primary, &suffix);
    print_distribution(&report.distribution, &suffix);
    if !report.fully_allocated {
        println!(
            "Warning: partner shares total {}% (expected 100%)",
            report.share_total
        );
    }
    match &report.legacy {
        Some(legacy) => {
            println!("\nLegacy method");
            print_legacy(legacy, &suffix);
        }
        None => {
            for e in &report.errors {
                println!("\n{}", e);
            }
        }
    }
    Ok(())
}

fn print_totals(global: &LedgerTotals, effective: &LedgerTotals, suffix: &str) {
    let row = |label: &str, f: fn(&LedgerTotals) -> Decimal| {
        vec![
            label.to_string(),
            fmt_money(&f(global), suffix),
            fmt_money(&f(effective), suffix),
        ]
    };
    let rows = vec![
        row("Paid revenue", |t| t.paid_revenue),
        row("Unpaid revenue", |t| t.unpaid_revenue),
        row("Total expense", |t| t.total_expense),
        row("Net balance", LedgerTotals::net_balance),
        row("Global balance", LedgerTotals::global_balance),
    ];
    println!("{}", pretty_table(&["", "All projects", "Counted"], rows));
}

fn print_primary(s: &Settlement, suffix: &str) {
    let mut rows: Vec<Vec<String>> = s
        .rows
        .iter()
        .map(|r| {
            vec![
                r.partner.clone(),
                format!("{}%", r.share_percentage),
                fmt_money(&r.paid_profit_share, suffix),
                fmt_money(&r.pending_profit_share, suffix),
                fmt_money(&r.total_profit_share, suffix),
                fmt_money(&r.total_invested, suffix),
                fmt_money(&r.total_paid_out, suffix),
                fmt_money(&r.remaining_to_pay, suffix),
                fmt_money(&r.remaining_treasury, suffix),
            ]
        })
        .collect();
    let sum = |f: fn(&crate::settlement::PartnerShare) -> Decimal| -> String {
        fmt_money(&s.rows.iter().map(f).sum::<Decimal>(), suffix)
    };
    if !s.rows.is_empty() {
        rows.push(vec![
            "TOTAL".to_string(),
            format!("{}%", s.share_total),
            sum(|r| r.paid_profit_share),
            sum(|r| r.pending_profit_share),
            sum(|r| r.total_profit_share),
            sum(|r| r.total_invested),
            sum(|r| r.total_paid_out),
            sum(|r| r.remaining_to_pay),
            sum(|r| r.remaining_treasury),
        ]);
    }
    println!(
        "{}",
        pretty_table(
            &[
                "Partner",
                "Share",
                "Paid profit",
                "Pending profit",
                "Total profit",
                "Invested",
                "Paid out",
                "Remaining to pay",
                "Remaining treasury",
            ],
            rows,
        )
    );
}

fn print_distribution(d: &PayoutDistribution, suffix: &str) {
    let mut rows: Vec<Vec<String>> = d
        .slices
        .iter()
        .map(|s| vec![s.label.clone(), fmt_money(&s.amount, suffix)])
        .collect();
    rows.push(vec![
        "Remaining to distribute".to_string(),
        fmt_money(&d.remaining, suffix),
    ]);
    println!("{}", pretty_table(&["Payouts", "Amount"], rows));
}

fn print_legacy(l: &LegacySettlement, suffix: &str) {
    let rows = l
        .rows()
        .iter()
        .map(|r| {
            vec![
                r.partner.clone(),
                fmt_money(&r.investment, suffix),
                fmt_money(&r.balance_operations, suffix),
                fmt_money(&r.difference, suffix),
                fmt_money(&r.amount_paid, suffix),
                fmt_money(&r.disbursement, suffix),
                fmt_money(&r.encashment, suffix),
                fmt_money(&r.treasury_split, suffix),
                fmt_money(&r.remainder, suffix),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &[
                "Partner",
                "Investment",
                "Balance ops",
                "Difference",
                "Amount paid",
                "Disbursement",
                "Encashment",
                "Equal split",
                "Remainder",
            ],
            rows,
        )
    );
}

/// Writes the primary or legacy table as computed, one row per partner (plus
/// the TOTAL row for the legacy table).
pub fn export_settlement(
    conn: &Connection,
    table: &str,
    fmt: ExportFormat,
    out: &Path,
) -> Result<usize> {
    let snapshot = load_snapshot(conn)?;
    let n = match table {
        "primary" => {
            let s = settle(&snapshot);
            write_rows(fmt, out, &s.rows)?;
            s.rows.len()
        }
        "legacy" => {
            let l = settle_legacy(&snapshot, &legacy_references(conn)?);
            warn_unmatched(&l);
            let rows = l.rows();
            write_rows(fmt, out, &rows[..])?;
            rows.len()
        }
        other => {
            return Err(crate::error::LedgerError::validation(format!(
                "Unknown settlement table '{}' (use primary|legacy)",
                other
            ))
            .into());
        }
    };
    tracing::info!(table, rows = n, out = %out.display(), "settlement exported");
    Ok(n)
}
