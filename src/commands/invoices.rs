// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::exporter::{write_rows, ExportFormat};
use crate::error::LedgerError;
use crate::models::{ClientInfo, Invoice, InvoiceLine, InvoiceTotals};
use crate::utils::{
    currency_suffix, date_column, fmt_money, get_setting, maybe_print_json, parse_date,
    parse_decimal, pretty_table, require_text, today,
};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::Path;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("create", sub)) => create(conn, sub)?,
        Some(("list", sub)) => {
            let data = list_invoices(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let suffix = currency_suffix(conn)?;
                let rows = data
                    .iter()
                    .map(|i| {
                        vec![
                            i.number.clone(),
                            i.date.to_string(),
                            i.client.name.clone(),
                            fmt_money(&i.totals.total_ht, &suffix),
                            fmt_money(&i.totals.total_ttc, &suffix),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Number", "Date", "Client", "Total HT", "Total TTC"], rows)
                );
            }
        }
        Some(("show", sub)) => {
            let invoice = get_invoice(conn, sub.get_one::<String>("number").unwrap().trim())?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &invoice)? {
                print_invoice(&invoice, &currency_suffix(conn)?);
            }
        }
        Some(("rm", sub)) => {
            let number = sub.get_one::<String>("number").unwrap().trim();
            let n = conn.execute(
                "DELETE FROM invoices WHERE invoice_number=?1",
                params![number],
            )?;
            if n == 0 {
                return Err(LedgerError::not_found("Invoice", number).into());
            }
            tracing::info!(number, "invoice removed");
            println!("Removed invoice {}", number);
        }
        Some(("export", sub)) => {
            let number = sub.get_one::<String>("number").unwrap().trim();
            let fmt: ExportFormat = sub.get_one::<String>("format").unwrap().parse()?;
            let out = sub.get_one::<String>("out").unwrap();
            export_invoice(conn, number, fmt, Path::new(out))?;
            println!("Exported invoice {} to {}", number, out);
        }
        _ => {}
    }
    Ok(())
}

/// `description;quantity;unit_price[;vat]`
pub fn parse_line(raw: &str, default_vat: Decimal) -> Result<InvoiceLine> {
    let parts: Vec<&str> = raw.split(';').map(|p| p.trim()).collect();
    if parts.len() < 3 || parts.len() > 4 {
        return Err(LedgerError::validation(format!(
            "Invalid invoice line '{}', expected description;quantity;unit_price[;vat]",
            raw
        ))
        .into());
    }
    let description = require_text("Line description", parts[0])?;
    let quantity = parse_decimal(parts[1])?;
    if quantity < Decimal::ONE {
        return Err(LedgerError::validation(format!(
            "Quantity must be at least 1 (got {})",
            parts[1]
        ))
        .into());
    }
    let unit_price = parse_decimal(parts[2])?;
    if unit_price < Decimal::ZERO {
        return Err(LedgerError::validation("Unit price cannot be negative").into());
    }
    let vat_rate = match parts.get(3).filter(|v| !v.is_empty()) {
        Some(v) => parse_decimal(v.trim_end_matches('%'))?,
        None => default_vat,
    };
    if vat_rate < Decimal::ZERO {
        return Err(LedgerError::validation("VAT rate cannot be negative").into());
    }
    Ok(InvoiceLine {
        description,
        quantity,
        unit_price,
        vat_rate,
    })
}

/// Bumps the invoice sequence and formats `prefix + ddmmyy + NNNN`.
pub fn next_invoice_number(conn: &Connection, date: NaiveDate) -> Result<String> {
    conn.execute(
        "INSERT INTO invoice_sequence(id, current_value) VALUES (1, 1)
         ON CONFLICT(id) DO UPDATE SET current_value = current_value + 1",
        [],
    )?;
    let seq: i64 = conn.query_row(
        "SELECT current_value FROM invoice_sequence WHERE id=1",
        [],
        |r| r.get(0),
    )?;
    let prefix = get_setting(conn, "invoice_prefix")?;
    Ok(format!("{}{}{:04}", prefix, date.format("%d%m%y"), seq))
}

pub struct InvoiceDraft {
    pub number: Option<String>,
    pub date: NaiveDate,
    pub client: ClientInfo,
    pub period_from: Option<NaiveDate>,
    pub period_to: Option<NaiveDate>,
    pub lines: Vec<InvoiceLine>,
}

pub fn create_invoice(conn: &mut Connection, draft: InvoiceDraft) -> Result<Invoice> {
    if draft.lines.is_empty() {
        return Err(LedgerError::validation("An invoice needs at least one line").into());
    }
    if draft.client.name.trim().is_empty() {
        return Err(LedgerError::validation("Client name is required").into());
    }
    if let (Some(from), Some(to)) = (draft.period_from, draft.period_to) {
        if from > to {
            return Err(LedgerError::validation("Billing period ends before it starts").into());
        }
    }
    let totals = InvoiceTotals::from_lines(&draft.lines);

    let tx = conn.transaction()?;
    let number = match draft.number.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
        Some(n) => n,
        None => next_invoice_number(&tx, draft.date)?,
    };
    let taken: Option<i64> = tx
        .query_row(
            "SELECT id FROM invoices WHERE invoice_number=?1",
            params![number],
            |r| r.get(0),
        )
        .optional()?;
    if taken.is_some() {
        return Err(LedgerError::validation(format!("Invoice {} already exists", number)).into());
    }
    tx.execute(
        "INSERT INTO invoices(invoice_number, date, client_info, period_from, period_to, lines, totals_info)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            number,
            draft.date.to_string(),
            serde_json::to_string(&draft.client)?,
            draft.period_from.map(|d| d.to_string()),
            draft.period_to.map(|d| d.to_string()),
            serde_json::to_string(&draft.lines)?,
            serde_json::to_string(&totals)?,
        ],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;
    tracing::info!(id, number = %number, total_ttc = %totals.total_ttc, "invoice created");
    Ok(Invoice {
        id,
        number,
        date: draft.date,
        client: draft.client,
        period_from: draft.period_from,
        period_to: draft.period_to,
        lines: draft.lines,
        totals,
    })
}

fn optional_date(sub: &clap::ArgMatches, name: &str) -> Result<Option<NaiveDate>> {
    sub.get_one::<String>(name).map(|raw| parse_date(raw)).transpose()
}

fn create(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let default_vat = parse_decimal(&get_setting(conn, "default_vat_rate")?)?;
    let lines = sub
        .get_many::<String>("line")
        .into_iter()
        .flatten()
        .map(|raw| parse_line(raw, default_vat))
        .collect::<Result<Vec<_>>>()?;
    let text = |name: &str| {
        sub.get_one::<String>(name)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };
    let draft = InvoiceDraft {
        number: sub.get_one::<String>("number").cloned(),
        date: optional_date(sub, "date")?.unwrap_or_else(today),
        client: ClientInfo {
            name: require_text("Client name", &text("client"))?,
            ice: text("ice"),
            address: text("address"),
        },
        period_from: optional_date(sub, "from")?,
        period_to: optional_date(sub, "to")?,
        lines,
    };
    let invoice = create_invoice(conn, draft)?;
    println!(
        "Created invoice {} for {} ({} TTC)",
        invoice.number,
        invoice.client.name,
        fmt_money(&invoice.totals.total_ttc, &currency_suffix(conn)?)
    );
    Ok(())
}

fn invoice_from_row(r: &rusqlite::Row<'_>) -> Result<Invoice> {
    let date: String = r.get(2)?;
    let client: String = r.get(3)?;
    let from: Option<String> = r.get(4)?;
    let to: Option<String> = r.get(5)?;
    let lines: String = r.get(6)?;
    let totals: String = r.get(7)?;
    let number: String = r.get(1)?;
    Ok(Invoice {
        id: r.get(0)?,
        date: date_column(&date, "invoice date")?,
        client: serde_json::from_str(&client)
            .with_context(|| format!("Invalid client info for invoice {}", number))?,
        period_from: from.map(|d| date_column(&d, "billing period")).transpose()?,
        period_to: to.map(|d| date_column(&d, "billing period")).transpose()?,
        lines: serde_json::from_str(&lines)
            .with_context(|| format!("Invalid lines for invoice {}", number))?,
        totals: serde_json::from_str(&totals)
            .with_context(|| format!("Invalid totals for invoice {}", number))?,
        number,
    })
}

const INVOICE_COLUMNS: &str =
    "id, invoice_number, date, client_info, period_from, period_to, lines, totals_info";

pub fn list_invoices(conn: &Connection) -> Result<Vec<Invoice>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM invoices ORDER BY date DESC, id DESC",
        INVOICE_COLUMNS
    ))?;
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        out.push(invoice_from_row(r)?);
    }
    Ok(out)
}

pub fn get_invoice(conn: &Connection, number: &str) -> Result<Invoice> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM invoices WHERE invoice_number=?1",
        INVOICE_COLUMNS
    ))?;
    let mut rows = stmt.query(params![number])?;
    match rows.next()? {
        Some(r) => invoice_from_row(r),
        None => Err(LedgerError::not_found("Invoice", number).into()),
    }
}

fn print_invoice(i: &Invoice, suffix: &str) {
    println!("Invoice {}  ({})", i.number, i.date.format("%d/%m/%Y"));
    println!("Client: {}", i.client.name);
    if !i.client.ice.is_empty() {
        println!("ICE: {}", i.client.ice);
    }
    if !i.client.address.is_empty() {
        println!("Address: {}", i.client.address);
    }
    if let (Some(from), Some(to)) = (i.period_from, i.period_to) {
        println!(
            "Billing period: {} to {}",
            from.format("%d/%m/%Y"),
            to.format("%d/%m/%Y")
        );
    }
    let rows = i
        .lines
        .iter()
        .map(|l| {
            vec![
                l.description.clone(),
                l.quantity.to_string(),
                fmt_money(&l.unit_price, suffix),
                format!("{}%", l.vat_rate),
                fmt_money(&l.total_ht(), suffix),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Description", "Quantity", "Unit price HT", "VAT", "Total HT"],
            rows
        )
    );
    println!("Total HT:  {}", fmt_money(&i.totals.total_ht, suffix));
    println!("Total TVA: {}", fmt_money(&i.totals.total_tva, suffix));
    println!("Total TTC: {}", fmt_money(&i.totals.total_ttc, suffix));
}

#[derive(Serialize)]
struct InvoiceLineRow<'a> {
    invoice_number: &'a str,
    description: &'a str,
    quantity: Decimal,
    unit_price: Decimal,
    vat_rate: Decimal,
    total_ht: Decimal,
    vat: Decimal,
}

/// JSON gets the whole invoice; CSV gets one row per line.
pub fn export_invoice(conn: &Connection, number: &str, fmt: ExportFormat, out: &Path) -> Result<()> {
    let invoice = get_invoice(conn, number)?;
    match fmt {
        ExportFormat::Json => {
            std::fs::write(out, serde_json::to_string_pretty(&invoice)?)
                .with_context(|| format!("Write {}", out.display()))?;
        }
        ExportFormat::Csv => {
            let rows: Vec<InvoiceLineRow<'_>> = invoice
                .lines
                .iter()
                .map(|l| InvoiceLineRow {
                    invoice_number: &invoice.number,
                    description: &l.description,
                    quantity: l.quantity,
                    unit_price: l.unit_price,
                    vat_rate: l.vat_rate,
                    total_ht: l.total_ht(),
                    vat: l.vat(),
                })
                .collect();
            write_rows(fmt, out, &rows)?;
        }
    }
    tracing::info!(number, out = %out.display(), "invoice exported");
    Ok(())
}
