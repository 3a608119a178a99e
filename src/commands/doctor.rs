// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::assets::list_assets;
use crate::commands::settlement::{legacy_references, load_snapshot};
use crate::settlement::{settle, settle_legacy};
use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub kind: &'static str,
    pub detail: String,
}

fn issue(kind: &'static str, detail: String) -> Issue {
    Issue { kind, detail }
}

pub fn diagnose(conn: &Connection) -> Result<Vec<Issue>> {
    let mut issues = Vec::new();
    let snapshot = load_snapshot(conn)?;

    // 1) Shares
    if !snapshot.partners.is_empty() && !snapshot.is_fully_allocated() {
        issues.push(issue(
            "share_total",
            format!("partner shares total {}%", snapshot.share_total()),
        ));
    }

    // 2) Legacy reference partners
    let legacy = settle_legacy(&snapshot, &legacy_references(conn)?);
    for row in [&legacy.first, &legacy.second] {
        if !row.matched {
            issues.push(issue("legacy_partner_missing", row.partner.clone()));
        }
    }

    // 3) Paid without a payment date
    let mut stmt = conn.prepare(
        "SELECT id, date, label FROM transactions
         WHERE paid=1 AND (payment_date IS NULL OR payment_date='') ORDER BY date, id",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let date: String = r.get(1)?;
        let label: String = r.get(2)?;
        issues.push(issue(
            "paid_without_payment_date",
            format!("#{} {} {}", id, date, label),
        ));
    }

    // 4) Overpaid partners
    for row in settle(&snapshot).rows {
        if row.total_paid_out > row.paid_profit_share {
            issues.push(issue(
                "overpaid_partner",
                format!(
                    "{} received {} against a paid profit share of {}",
                    row.partner,
                    row.total_paid_out,
                    row.paid_profit_share.round_dp(2)
                ),
            ));
        }
    }

    // 5) Asset funding
    for a in list_assets(conn)? {
        if a.invested != a.asset.total_price {
            issues.push(issue(
                "asset_funding_mismatch",
                format!(
                    "#{} {}: invested {} of {}",
                    a.asset.id, a.asset.name, a.invested, a.asset.total_price
                ),
            ));
        }
    }

    tracing::debug!(count = issues.len(), "doctor finished");
    Ok(issues)
}

pub fn handle(conn: &Connection) -> Result<()> {
    let issues = diagnose(conn)?;
    if issues.is_empty() {
        println!("doctor: no issues found");
    } else {
        for i in &issues {
            tracing::warn!(kind = i.kind, detail = %i.detail, "doctor issue");
        }
        let rows = issues
            .into_iter()
            .map(|i| vec![i.kind.to_string(), i.detail])
            .collect();
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
