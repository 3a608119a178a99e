// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::LedgerError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Charge,
    Recette,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Charge => "charge",
            TxKind::Recette => "recette",
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "charge" | "expense" => Ok(TxKind::Charge),
            "recette" | "revenue" => Ok(TxKind::Recette),
            other => Err(LedgerError::validation(format!(
                "Invalid kind '{}', expected 'charge' or 'recette'",
                other
            ))),
        }
    }
}

/// Reporting granularity; keys are prefixes of the ISO date column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Month,
    Year,
}

impl Period {
    pub fn key<'a>(&self, iso_date: &'a str) -> &'a str {
        let n = match self {
            Period::Day => 10,
            Period::Month => 7,
            Period::Year => 4,
        };
        iso_date.get(..n).unwrap_or(iso_date)
    }
}

impl FromStr for Period {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" => Ok(Period::Day),
            "month" => Ok(Period::Month),
            "year" => Ok(Period::Year),
            other => Err(LedgerError::validation(format!(
                "Invalid period '{}', expected day|month|year",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub included_in_calc: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub label: String,
    pub category_id: i64,
    pub kind: TxKind,
    pub project_id: Option<i64>,
    pub paid: bool,
    pub payment_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partner {
    pub id: i64,
    pub name: String,
    pub share_percentage: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerPayment {
    pub id: i64,
    pub partner_id: i64,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Immobilisation {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub total_price: Decimal,
    pub acquisition_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentTransaction {
    pub id: i64,
    pub partner_id: i64,
    pub immobilisation_id: i64,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub ice: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub vat_rate: Decimal, // percent
}

impl InvoiceLine {
    pub fn total_ht(&self) -> Decimal {
        self.quantity * self.unit_price
    }

    pub fn vat(&self) -> Decimal {
        self.total_ht() * self.vat_rate / Decimal::ONE_HUNDRED
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub total_ht: Decimal,
    pub total_tva: Decimal,
    pub total_ttc: Decimal,
}

impl InvoiceTotals {
    pub fn from_lines(lines: &[InvoiceLine]) -> Self {
        let total_ht: Decimal = lines.iter().map(InvoiceLine::total_ht).sum();
        let total_tva: Decimal = lines.iter().map(InvoiceLine::vat).sum();
        Self {
            total_ht,
            total_tva,
            total_ttc: total_ht + total_tva,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub number: String,
    pub date: NaiveDate,
    pub client: ClientInfo,
    pub period_from: Option<NaiveDate>,
    pub period_to: Option<NaiveDate>,
    pub lines: Vec<InvoiceLine>,
    pub totals: InvoiceTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoStep {
    pub label: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoTask {
    pub id: i64,
    pub project_name: String,
    pub due_date: NaiveDate,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub steps: Vec<TodoStep>,
}

impl TodoTask {
    pub fn is_complete(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|s| s.completed)
    }
}
