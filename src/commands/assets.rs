// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::LedgerError;
use crate::models::Immobilisation;
use crate::settlement::investment_balance;
use crate::utils::{
    currency_suffix, date_column, decimal_column, fmt_money, id_for_immobilisation,
    id_for_partner, maybe_print_json, parse_amount, parse_date, parse_decimal, parse_id,
    pretty_table, require_text, today,
};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;

fn date_or_today(sub: &clap::ArgMatches) -> Result<NaiveDate> {
    match sub.get_one::<String>("date") {
        Some(raw) => parse_date(raw),
        None => Ok(today()),
    }
}

fn description_of(sub: &clap::ArgMatches) -> Option<String> {
    sub.get_one::<String>("description")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = require_text("Asset name", sub.get_one::<String>("name").unwrap())?;
            let price = parse_amount(sub.get_one::<String>("price").unwrap())?;
            let date = date_or_today(sub)?;
            let investors = sub
                .get_many::<String>("invest")
                .map(|vals| vals.map(|v| parse_investor(v)).collect::<Result<Vec<_>>>())
                .transpose()?
                .unwrap_or_default();
            let id = add_asset(
                conn,
                &name,
                price,
                date,
                description_of(sub).as_deref(),
                &investors,
            )?;
            println!(
                "Added asset '{}' (id {}) for {}",
                name,
                id,
                fmt_money(&price, &currency_suffix(conn)?)
            );
        }
        Some(("list", sub)) => list(conn, sub)?,
        Some(("rm", sub)) => {
            let id = parse_id(sub.get_one::<String>("id").unwrap())?;
            remove_asset(conn, id)?;
            println!("Removed asset {} and its investments", id);
        }
        Some(("balance", sub)) => balance(conn, sub)?,
        _ => {}
    }
    Ok(())
}

pub fn handle_invest(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let partner = sub.get_one::<String>("partner").unwrap().trim();
            let asset = sub.get_one::<String>("asset").unwrap().trim();
            let amount = parse_amount(sub.get_one::<String>("amount").unwrap())?;
            let date = date_or_today(sub)?;
            let id = add_investment(
                conn,
                partner,
                asset,
                amount,
                date,
                description_of(sub).as_deref(),
            )?;
            println!(
                "Recorded investment {} of {} by '{}' in '{}'",
                id,
                fmt_money(&amount, &currency_suffix(conn)?),
                partner,
                asset
            );
        }
        Some(("list", sub)) => {
            let data = list_investments(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let suffix = currency_suffix(conn)?;
                let rows = data
                    .iter()
                    .map(|r| {
                        vec![
                            r.id.to_string(),
                            r.date.to_string(),
                            r.partner.clone(),
                            r.asset.clone(),
                            fmt_money(&r.amount, &suffix),
                            r.description.clone(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(
                        &["ID", "Date", "Partner", "Asset", "Amount", "Description"],
                        rows
                    )
                );
            }
        }
        Some(("rm", sub)) => {
            let id = parse_id(sub.get_one::<String>("id").unwrap())?;
            let n = conn.execute(
                "DELETE FROM investment_transactions WHERE id=?1",
                params![id],
            )?;
            if n == 0 {
                return Err(LedgerError::not_found("Investment", id.to_string()).into());
            }
            tracing::info!(id, "investment removed");
            println!("Removed investment {}", id);
        }
        _ => {}
    }
    Ok(())
}

/// `PARTNER=AMOUNT`; a zero amount is accepted and skipped on insert.
pub fn parse_investor(raw: &str) -> Result<(String, Decimal)> {
    let (name, amount) = raw.rsplit_once('=').ok_or_else(|| {
        LedgerError::validation(format!("Invalid investor '{}', expected PARTNER=AMOUNT", raw))
    })?;
    let name = require_text("Investor name", name)?;
    let amount = parse_decimal(amount)?;
    if amount < Decimal::ZERO {
        return Err(
            LedgerError::validation(format!("Investment for '{}' cannot be negative", name)).into(),
        );
    }
    Ok((name, amount))
}

/// Creates the asset and its investor contributions together. When investors
/// are given their amounts must add up to the asset price exactly.
pub fn add_asset(
    conn: &mut Connection,
    name: &str,
    price: Decimal,
    date: NaiveDate,
    description: Option<&str>,
    investors: &[(String, Decimal)],
) -> Result<i64> {
    if price <= Decimal::ZERO {
        return Err(LedgerError::validation("Asset price must be greater than 0").into());
    }
    if !investors.is_empty() {
        let split: Decimal = investors.iter().map(|(_, a)| *a).sum();
        if split != price {
            return Err(LedgerError::validation(format!(
                "Investor amounts total {} but the asset costs {}",
                split, price
            ))
            .into());
        }
    }

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO immobilisations(name, description, total_price, acquisition_date)
         VALUES (?1, ?2, ?3, ?4)",
        params![name, description, price.to_string(), date.to_string()],
    )?;
    let asset_id = tx.last_insert_rowid();
    for (partner, amount) in investors.iter().filter(|(_, a)| !a.is_zero()) {
        let partner_id = id_for_partner(&tx, partner)?;
        tx.execute(
            "INSERT INTO investment_transactions(partner_id, immobilisation_id, amount, date, description)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                partner_id,
                asset_id,
                amount.to_string(),
                date.to_string(),
                format!("Investissement dans {}", name)
            ],
        )?;
    }
    tx.commit()?;
    tracing::info!(id = asset_id, name, %price, investors = investors.len(), "asset added");
    Ok(asset_id)
}

pub fn remove_asset(conn: &Connection, id: i64) -> Result<()> {
    // investment_transactions rows go with it (ON DELETE CASCADE)
    let n = conn.execute("DELETE FROM immobilisations WHERE id=?1", params![id])?;
    if n == 0 {
        return Err(LedgerError::not_found("Immobilisation", id.to_string()).into());
    }
    tracing::info!(id, "asset removed");
    Ok(())
}

pub fn add_investment(
    conn: &Connection,
    partner: &str,
    asset: &str,
    amount: Decimal,
    date: NaiveDate,
    description: Option<&str>,
) -> Result<i64> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation("Amount must be greater than 0").into());
    }
    let partner_id = id_for_partner(conn, partner)?;
    let asset_id = id_for_immobilisation(conn, asset)?;
    conn.execute(
        "INSERT INTO investment_transactions(partner_id, immobilisation_id, amount, date, description)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![partner_id, asset_id, amount.to_string(), date.to_string(), description],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(id, partner_id, asset_id, %amount, "investment recorded");
    Ok(id)
}

#[derive(Debug, Serialize)]
pub struct AssetRow {
    #[serde(flatten)]
    pub asset: Immobilisation,
    pub invested: Decimal,
    pub investors: Vec<String>,
}

pub fn list_assets(conn: &Connection) -> Result<Vec<AssetRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, total_price, acquisition_date
         FROM immobilisations ORDER BY acquisition_date DESC, id DESC",
    )?;
    let mut inv_stmt = conn.prepare(
        "SELECT p.name, it.amount FROM investment_transactions it
         JOIN partners p ON it.partner_id=p.id
         WHERE it.immobilisation_id=?1 ORDER BY p.name",
    )?;
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        let id: i64 = r.get(0)?;
        let price: String = r.get(3)?;
        let date: String = r.get(4)?;
        let mut invested = Decimal::ZERO;
        let mut investors: Vec<String> = Vec::new();
        let mut inv_rows = inv_stmt.query(params![id])?;
        while let Some(ir) = inv_rows.next()? {
            let name: String = ir.get(0)?;
            let amount: String = ir.get(1)?;
            invested += decimal_column(&amount, "investment amount")?;
            if !investors.contains(&name) {
                investors.push(name);
            }
        }
        out.push(AssetRow {
            asset: Immobilisation {
                id,
                name: r.get(1)?,
                description: r.get(2)?,
                total_price: decimal_column(&price, "asset price")?,
                acquisition_date: date_column(&date, "acquisition date")?,
            },
            invested,
            investors,
        });
    }
    Ok(out)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let data = list_assets(conn)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let suffix = currency_suffix(conn)?;
        let rows = data
            .iter()
            .map(|r| {
                vec![
                    r.asset.id.to_string(),
                    r.asset.acquisition_date.to_string(),
                    r.asset.name.clone(),
                    fmt_money(&r.asset.total_price, &suffix),
                    fmt_money(&r.invested, &suffix),
                    r.investors.join(", "),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Acquired", "Asset", "Price", "Invested", "Investors"],
                rows
            )
        );
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct InvestmentRow {
    pub id: i64,
    pub partner: String,
    pub asset: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub description: String,
}

pub fn list_investments(conn: &Connection) -> Result<Vec<InvestmentRow>> {
    let mut stmt = conn.prepare(
        "SELECT it.id, p.name, i.name, it.amount, it.date, it.description
         FROM investment_transactions it
         JOIN partners p ON it.partner_id=p.id
         JOIN immobilisations i ON it.immobilisation_id=i.id
         ORDER BY it.date DESC, it.id DESC",
    )?;
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        let amount: String = r.get(3)?;
        let date: String = r.get(4)?;
        out.push(InvestmentRow {
            id: r.get(0)?,
            partner: r.get(1)?,
            asset: r.get(2)?,
            amount: decimal_column(&amount, "investment amount")?,
            date: date_column(&date, "investment date")?,
            description: r.get::<_, Option<String>>(5)?.unwrap_or_default(),
        });
    }
    Ok(out)
}

fn balance(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let snapshot = crate::commands::settlement::load_snapshot(conn)?;
    let b = investment_balance(&snapshot.partners);
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &b)? {
        let suffix = currency_suffix(conn)?;
        println!("Total invested: {}", fmt_money(&b.total_invested, &suffix));
        println!(
            "Average per partner: {}",
            fmt_money(&b.average_per_partner, &suffix)
        );
        let rows = b
            .partners
            .iter()
            .map(|g| {
                let status = if g.difference < Decimal::ZERO {
                    format!("must invest {} to balance", fmt_money(&-g.difference, &suffix))
                } else if g.difference > Decimal::ZERO {
                    format!("over-invested by {}", fmt_money(&g.difference, &suffix))
                } else {
                    "balanced".to_string()
                };
                vec![
                    g.partner.clone(),
                    fmt_money(&g.total_invested, &suffix),
                    status,
                ]
            })
            .collect();
        println!("{}", pretty_table(&["Partner", "Invested", "Status"], rows));
    }
    Ok(())
}
