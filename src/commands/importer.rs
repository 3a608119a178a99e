// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::transactions::insert_transaction;
use crate::error::LedgerError;
use crate::models::{Transaction, TxKind};
use crate::utils::{id_for_project, parse_amount, parse_date, parse_yes_no, require_text};
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use rusqlite::Connection;
use std::collections::{HashMap, hash_map::Entry};
use std::path::Path;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => {
            let path = sub.get_one::<String>("path").unwrap().trim();
            let n = import_transactions(conn, Path::new(path))?;
            println!("Imported {} transaction(s) from {}", n, path);
            Ok(())
        }
        _ => Ok(()),
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum Column {
    Date,
    Amount,
    Label,
    Kind,
    Project,
    Category,
    Paid,
    PaymentDate,
}

const REQUIRED: [Column; 7] = [
    Column::Date,
    Column::Amount,
    Column::Label,
    Column::Kind,
    Column::Project,
    Column::Category,
    Column::Paid,
];

fn fold_accents(c: char) -> char {
    match c {
        'à' | 'â' | 'ä' | 'á' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'î' | 'ï' | 'í' => 'i',
        'ô' | 'ö' | 'ó' => 'o',
        'ù' | 'û' | 'ü' | 'ú' => 'u',
        'ç' => 'c',
        ' ' | '-' => '_',
        other => other,
    }
}

fn column_for(header: &str) -> Option<Column> {
    let key: String = header
        .trim()
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .chars()
        .map(fold_accents)
        .collect();
    match key.as_str() {
        "date" => Some(Column::Date),
        "amount" | "montant" => Some(Column::Amount),
        "label" | "libelle" => Some(Column::Label),
        "kind" | "type" => Some(Column::Kind),
        "project" | "projet" => Some(Column::Project),
        "category" | "categorie" => Some(Column::Category),
        "paid" | "payer" | "paye" => Some(Column::Paid),
        "payment_date" | "date_paiement" => Some(Column::PaymentDate),
        _ => None,
    }
}

fn field_of<'r>(rec: &'r csv::StringRecord, columns: &HashMap<Column, usize>, c: Column) -> &'r str {
    columns.get(&c).and_then(|idx| rec.get(*idx)).unwrap_or("")
}

/// Category ids keyed by Unicode-lowercased name (SQLite `lower()` folds ASCII only).
fn category_index(conn: &Connection) -> Result<HashMap<String, i64>> {
    let mut stmt = conn.prepare("SELECT id, name FROM categories")?;
    let rows = stmt.query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)))?;
    let mut index = HashMap::new();
    for row in rows {
        let (id, name) = row?;
        index.insert(name.to_lowercase(), id);
    }
    Ok(index)
}

/// Imports every row of `path` or nothing: the rows are validated and written
/// inside one transaction that is only committed once the whole file passed.
pub fn import_transactions(conn: &mut Connection, path: &Path) -> Result<usize> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Open CSV {}", path.display()))?;

    let mut columns: HashMap<Column, usize> = HashMap::new();
    for (idx, h) in rdr.headers()?.iter().enumerate() {
        if let Some(col) = column_for(h) {
            columns.entry(col).or_insert(idx);
        }
    }
    let missing: Vec<String> = REQUIRED
        .iter()
        .filter(|c| !columns.contains_key(c))
        .map(|c| format!("{:?}", c).to_lowercase())
        .collect();
    if !missing.is_empty() {
        return Err(LedgerError::validation(format!(
            "Missing column(s): {}",
            missing.join(", ")
        ))
        .into());
    }

    let tx = conn.transaction()?;
    let categories = category_index(&tx)?;
    let mut project_cache: HashMap<String, i64> = HashMap::new();
    let mut count = 0usize;

    for (i, result) in rdr.records().enumerate() {
        let line = i + 2;
        let rec = result.with_context(|| format!("Read CSV line {}", line))?;
        let field = |c: Column| field_of(&rec, &columns, c);

        let date = parse_date(field(Column::Date)).with_context(|| format!("line {}", line))?;
        let amount =
            parse_amount(field(Column::Amount)).with_context(|| format!("line {}", line))?;
        let label =
            require_text("Label", field(Column::Label)).with_context(|| format!("line {}", line))?;
        let kind: TxKind = field(Column::Kind)
            .parse()
            .with_context(|| format!("line {}", line))?;
        let paid = parse_yes_no(field(Column::Paid)).with_context(|| format!("line {}", line))?;

        let category = field(Column::Category).to_lowercase();
        if category.is_empty() {
            return Err(LedgerError::validation(format!("line {}: category is required", line)).into());
        }
        let category_id = *categories
            .get(&category)
            .ok_or_else(|| LedgerError::not_found("Category", field(Column::Category)))
            .with_context(|| format!("line {}", line))?;

        let project = field(Column::Project);
        let project_id = if project.is_empty() {
            None
        } else {
            let id = match project_cache.entry(project.to_string()) {
                Entry::Occupied(e) => *e.get(),
                Entry::Vacant(e) => {
                    let id = id_for_project(&tx, project).with_context(|| format!("line {}", line))?;
                    *e.insert(id)
                }
            };
            Some(id)
        };

        let payment_date = match field(Column::PaymentDate) {
            "" if paid => Some(date),
            "" => None,
            raw if paid => Some(parse_date(raw).with_context(|| format!("line {}", line))?),
            _ => None,
        };

        insert_transaction(
            &tx,
            &Transaction {
                id: 0,
                date,
                amount,
                label,
                category_id,
                kind,
                project_id,
                paid,
                payment_date,
            },
        )?;
        count += 1;
    }
    tx.commit()?;
    tracing::info!(count, path = %path.display(), "transactions imported");
    Ok(count)
}
