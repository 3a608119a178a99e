// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{Period, TxKind};
use crate::utils::{currency_suffix, decimal_column, fmt_money, maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("summary", sub)) => summary(conn, sub)?,
        Some(("projects", sub)) => grouped(conn, sub, Grouping::Project)?,
        Some(("categories", sub)) => grouped(conn, sub, Grouping::Category)?,
        Some(("dashboard", sub)) => dashboard(conn, sub)?,
        _ => {}
    }
    Ok(())
}

struct Entry {
    date: String,
    kind: TxKind,
    amount: Decimal,
    paid: bool,
    project: Option<String>,
    category: String,
}

fn load_entries(conn: &Connection, all_projects: bool) -> Result<Vec<Entry>> {
    let mut sql = String::from(
        "SELECT t.date, t.kind, t.amount, t.paid, p.name, c.name
         FROM transactions t
         LEFT JOIN projects p ON t.project_id=p.id
         LEFT JOIN categories c ON t.category_id=c.id",
    );
    if !all_projects {
        sql.push_str(" WHERE (t.project_id IS NULL OR p.included_in_calc=1)");
    }
    sql.push_str(" ORDER BY t.date, t.id");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        let kind: String = r.get(1)?;
        let amount: String = r.get(2)?;
        out.push(Entry {
            date: r.get(0)?,
            kind: kind.parse()?,
            amount: decimal_column(&amount, "transaction amount")?,
            paid: r.get(3)?,
            project: r.get(4)?,
            category: r.get::<_, Option<String>>(5)?.unwrap_or_default(),
        });
    }
    Ok(out)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Flows {
    pub charges: Decimal,
    pub recettes: Decimal,
    pub balance: Decimal,
}

impl Flows {
    fn add(&mut self, kind: TxKind, amount: Decimal) {
        match kind {
            TxKind::Charge => self.charges += amount,
            TxKind::Recette => self.recettes += amount,
        }
        self.balance = self.recettes - self.charges;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodRow {
    pub period: String,
    #[serde(flatten)]
    pub flows: Flows,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRow {
    pub period: String,
    pub group: String,
    #[serde(flatten)]
    pub flows: Flows,
}

#[derive(Debug, Clone, Copy)]
pub enum Grouping {
    Project,
    Category,
}

pub const NO_PROJECT: &str = "(no project)";

/// Charges, recettes and balance per period, oldest first.
pub fn period_summary(conn: &Connection, period: Period, all_projects: bool) -> Result<Vec<PeriodRow>> {
    let mut map: BTreeMap<String, Flows> = BTreeMap::new();
    for e in load_entries(conn, all_projects)? {
        map.entry(period.key(&e.date).to_string())
            .or_default()
            .add(e.kind, e.amount);
    }
    Ok(map
        .into_iter()
        .map(|(period, flows)| PeriodRow { period, flows })
        .collect())
}

pub fn grouped_summary(
    conn: &Connection,
    period: Period,
    grouping: Grouping,
    all_projects: bool,
) -> Result<Vec<GroupRow>> {
    let mut map: BTreeMap<(String, String), Flows> = BTreeMap::new();
    for e in load_entries(conn, all_projects)? {
        let group = match grouping {
            Grouping::Project => e.project.unwrap_or_else(|| NO_PROJECT.to_string()),
            Grouping::Category => e.category,
        };
        map.entry((period.key(&e.date).to_string(), group))
            .or_default()
            .add(e.kind, e.amount);
    }
    Ok(map
        .into_iter()
        .map(|((period, group), flows)| GroupRow {
            period,
            group,
            flows,
        })
        .collect())
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub charges_paid: Decimal,
    pub charges_unpaid: Decimal,
    pub recettes_paid: Decimal,
    pub recettes_unpaid: Decimal,
    pub total_charges: Decimal,
    pub total_recettes: Decimal,
    pub balance: Decimal,
}

pub fn dashboard_totals(conn: &Connection, all_projects: bool) -> Result<Dashboard> {
    let mut d = Dashboard::default();
    for e in load_entries(conn, all_projects)? {
        match (e.kind, e.paid) {
            (TxKind::Charge, true) => d.charges_paid += e.amount,
            (TxKind::Charge, false) => d.charges_unpaid += e.amount,
            (TxKind::Recette, true) => d.recettes_paid += e.amount,
            (TxKind::Recette, false) => d.recettes_unpaid += e.amount,
        }
    }
    d.total_charges = d.charges_paid + d.charges_unpaid;
    d.total_recettes = d.recettes_paid + d.recettes_unpaid;
    d.balance = d.total_recettes - d.total_charges;
    Ok(d)
}

fn period_of(sub: &clap::ArgMatches) -> Result<Period> {
    Ok(sub.get_one::<String>("period").unwrap().parse()?)
}

fn summary(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let data = period_summary(conn, period_of(sub)?, sub.get_flag("all-projects"))?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let suffix = currency_suffix(conn)?;
        let rows = data
            .iter()
            .map(|r| {
                vec![
                    r.period.clone(),
                    fmt_money(&r.flows.charges, &suffix),
                    fmt_money(&r.flows.recettes, &suffix),
                    fmt_money(&r.flows.balance, &suffix),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Period", "Charges", "Recettes", "Balance"], rows)
        );
    }
    Ok(())
}

fn grouped(conn: &Connection, sub: &clap::ArgMatches, grouping: Grouping) -> Result<()> {
    let data = grouped_summary(conn, period_of(sub)?, grouping, sub.get_flag("all-projects"))?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let suffix = currency_suffix(conn)?;
        let label = match grouping {
            Grouping::Project => "Project",
            Grouping::Category => "Category",
        };
        let rows = data
            .iter()
            .map(|r| {
                vec![
                    r.period.clone(),
                    r.group.clone(),
                    fmt_money(&r.flows.charges, &suffix),
                    fmt_money(&r.flows.recettes, &suffix),
                    fmt_money(&r.flows.balance, &suffix),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Period", label, "Charges", "Recettes", "Balance"], rows)
        );
    }
    Ok(())
}

fn dashboard(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let d = dashboard_totals(conn, sub.get_flag("all-projects"))?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &d)? {
        let suffix = currency_suffix(conn)?;
        let rows = vec![
            vec![
                "Charges".to_string(),
                fmt_money(&d.charges_paid, &suffix),
                fmt_money(&d.charges_unpaid, &suffix),
                fmt_money(&d.total_charges, &suffix),
            ],
            vec![
                "Recettes".to_string(),
                fmt_money(&d.recettes_paid, &suffix),
                fmt_money(&d.recettes_unpaid, &suffix),
                fmt_money(&d.total_recettes, &suffix),
            ],
        ];
        println!("{}", pretty_table(&["", "Paid", "Unpaid", "Total"], rows));
        println!("Balance: {}", fmt_money(&d.balance, &suffix));
    }
    Ok(())
}
