// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::LedgerError;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;

/// Settings keys with their defaults.
pub const SETTINGS: &[(&str, &str)] = &[
    ("currency_suffix", "DH"),
    ("legacy_first_partner", "EL AZZAOUY ABDERRAHIM"),
    ("legacy_second_partner", "MOHAMED LAHBIB"),
    ("invoice_prefix", "297002"),
    ("default_vat_rate", "20"),
];

static AMOUNT_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\u{a0}\u{202f}]|(?i)(dh|mad)$").unwrap());

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .map_err(|_| {
            LedgerError::validation(format!(
                "Invalid date '{}', expected YYYY-MM-DD or DD/MM/YYYY",
                s
            ))
            .into()
        })
}

/// The right-most of `.`/`,` is the decimal mark when both appear
/// (`1.234,56`, `1,234.56`); a separator repeated on its own groups
/// thousands (`1.234.567`); a single `,` is a decimal comma.
fn normalize_separators(s: &str) -> String {
    match (s.rfind('.'), s.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) if s.matches('.').count() > 1 => s.replace('.', ""),
        (None, Some(_)) if s.matches(',').count() > 1 => s.replace(',', ""),
        (None, Some(_)) => s.replace(',', "."),
        _ => s.to_string(),
    }
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    let stripped = AMOUNT_NOISE.replace_all(s.trim(), "");
    let cleaned = normalize_separators(&stripped);
    cleaned
        .parse::<Decimal>()
        .map_err(|_| LedgerError::validation(format!("Invalid decimal '{}'", s.trim())).into())
}

/// Parses a strictly positive amount.
pub fn parse_amount(s: &str) -> Result<Decimal> {
    let d = parse_decimal(s)?;
    if d <= Decimal::ZERO {
        return Err(LedgerError::validation(format!(
            "Amount must be greater than 0 (got {})",
            s.trim()
        ))
        .into());
    }
    Ok(d)
}

pub fn parse_percentage(s: &str) -> Result<Decimal> {
    let d = parse_decimal(s)?;
    if d <= Decimal::ZERO || d > Decimal::ONE_HUNDRED {
        return Err(LedgerError::validation(format!(
            "Share percentage must be in (0, 100] (got {})",
            s.trim()
        ))
        .into());
    }
    Ok(d)
}

pub fn parse_yes_no(s: &str) -> Result<bool> {
    match s.trim().to_lowercase().as_str() {
        "oui" | "yes" | "y" | "true" | "1" => Ok(true),
        "non" | "no" | "n" | "false" | "0" | "" => Ok(false),
        other => Err(LedgerError::validation(format!(
            "Invalid paid flag '{}', expected oui/non",
            other
        ))
        .into()),
    }
}

pub fn require_text(field: &str, value: &str) -> Result<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(LedgerError::validation(format!("{} is required", field)).into());
    }
    Ok(v.to_string())
}

/// Decimals are stored as TEXT; a corrupt cell is reported with its origin.
pub fn decimal_column(raw: &str, what: &str) -> Result<Decimal> {
    raw.parse::<Decimal>()
        .with_context(|| format!("Invalid {} '{}' in store", what, raw))
}

pub fn date_column(raw: &str, what: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("Invalid {} '{}' in store", what, raw))
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// `1234567.891` -> `1,234,567.89 DH`
pub fn fmt_money(d: &Decimal, suffix: &str) -> String {
    let rounded = d.round_dp(2);
    let rounded = if rounded.is_zero() { Decimal::ZERO } else { rounded };
    let s = format!("{:.2}", rounded);
    let (sign, body) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s.as_str()),
    };
    let (int_part, frac) = body.split_once('.').unwrap_or((body, "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if suffix.is_empty() {
        format!("{}{}.{}", sign, grouped, frac)
    } else {
        format!("{}{}.{} {}", sign, grouped, frac, suffix)
    }
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

fn id_for(conn: &Connection, sql: &str, entity: &'static str, name: &str) -> Result<i64> {
    let id: Option<i64> = conn
        .query_row(sql, params![name.trim()], |r| r.get(0))
        .optional()?;
    id.ok_or_else(|| LedgerError::not_found(entity, name.trim()).into())
}

pub fn id_for_category(conn: &Connection, name: &str) -> Result<i64> {
    id_for(conn, "SELECT id FROM categories WHERE name=?1", "Category", name)
}

pub fn id_for_project(conn: &Connection, name: &str) -> Result<i64> {
    id_for(conn, "SELECT id FROM projects WHERE name=?1", "Project", name)
}

pub fn id_for_partner(conn: &Connection, name: &str) -> Result<i64> {
    id_for(conn, "SELECT id FROM partners WHERE name=?1", "Partner", name)
}

pub fn id_for_immobilisation(conn: &Connection, name: &str) -> Result<i64> {
    id_for(
        conn,
        "SELECT id FROM immobilisations WHERE name=?1 ORDER BY id DESC LIMIT 1",
        "Immobilisation",
        name,
    )
}

pub fn parse_id(raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| LedgerError::validation(format!("Invalid id '{}'", raw.trim())).into())
}

fn setting_default(key: &str) -> Option<&'static str> {
    SETTINGS.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

pub fn get_setting(conn: &Connection, key: &str) -> Result<String> {
    let default = setting_default(key)
        .ok_or_else(|| LedgerError::validation(format!("Unknown setting '{}'", key)))?;
    let v: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key=?1",
            params![key],
            |r| r.get(0),
        )
        .optional()?;
    Ok(v.unwrap_or_else(|| default.to_string()))
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    if setting_default(key).is_none() {
        return Err(LedgerError::validation(format!("Unknown setting '{}'", key)).into());
    }
    if matches!(key, "legacy_first_partner" | "legacy_second_partner") {
        require_text(key, value)?;
    }
    if key == "default_vat_rate" {
        let rate = parse_decimal(value)?;
        if rate < Decimal::ZERO {
            return Err(LedgerError::validation("VAT rate cannot be negative").into());
        }
    }
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value.trim()],
    )?;
    Ok(())
}

pub fn currency_suffix(conn: &Connection) -> Result<String> {
    get_setting(conn, "currency_suffix")
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

/// Page slice for `--limit/--page` style listings (page is 1-based).
pub fn page_bounds(total: usize, per_page: usize, page: usize) -> (usize, usize) {
    if per_page == 0 {
        return (0, total);
    }
    let start = per_page.saturating_mul(page.saturating_sub(1)).min(total);
    (start, start.saturating_add(per_page).min(total))
}
