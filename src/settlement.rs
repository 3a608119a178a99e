// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Partner profit settlement.
//!
//! Everything here is pure: the caller loads a [`Snapshot`] from the store
//! (see `commands::settlement::load_snapshot`) and the functions below derive
//! the per-partner figures from it without touching I/O. Running any of them
//! twice on the same snapshot yields identical output.

use rust_decimal::Decimal;
use serde::Serialize;

/// Ledger aggregates restricted to transactions that count toward settlement
/// (no project, or a project included in calculations).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerTotals {
    pub paid_revenue: Decimal,
    pub unpaid_revenue: Decimal,
    pub total_expense: Decimal,
}

impl LedgerTotals {
    /// Realized profit: paid revenue minus every charge.
    pub fn net_balance(&self) -> Decimal {
        self.paid_revenue - self.total_expense
    }

    pub fn global_revenue(&self) -> Decimal {
        self.paid_revenue + self.unpaid_revenue
    }

    /// Profit including revenue not yet collected.
    pub fn global_balance(&self) -> Decimal {
        self.global_revenue() - self.total_expense
    }
}

/// One partner as seen by the calculator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartnerPosition {
    pub id: i64,
    pub name: String,
    pub share_percentage: Decimal,
    pub total_invested: Decimal,
    pub total_paid_out: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub totals: LedgerTotals,
    /// Ordered by name.
    pub partners: Vec<PartnerPosition>,
}

impl Snapshot {
    pub fn share_total(&self) -> Decimal {
        self.partners.iter().map(|p| p.share_percentage).sum()
    }

    pub fn is_fully_allocated(&self) -> bool {
        self.share_total() == Decimal::ONE_HUNDRED
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartnerShare {
    pub partner: String,
    pub share_percentage: Decimal,
    pub paid_profit_share: Decimal,
    pub pending_profit_share: Decimal,
    pub total_profit_share: Decimal,
    pub total_invested: Decimal,
    pub total_paid_out: Decimal,
    pub remaining_to_pay: Decimal,
    pub remaining_treasury: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub totals: LedgerTotals,
    pub net_balance: Decimal,
    pub global_balance: Decimal,
    pub share_total: Decimal,
    pub rows: Vec<PartnerShare>,
}

impl Settlement {
    pub fn paid_profit_total(&self) -> Decimal {
        self.rows.iter().map(|r| r.paid_profit_share).sum()
    }

    pub fn remaining_to_pay_total(&self) -> Decimal {
        self.rows.iter().map(|r| r.remaining_to_pay).sum()
    }

    pub fn is_fully_allocated(&self) -> bool {
        self.share_total == Decimal::ONE_HUNDRED
    }
}

/// Current settlement method: each partner receives `share_percentage` of the
/// realized balance and of the revenue still to be collected.
///
/// When the shares sum to 100 the paid profit shares add up to the net
/// balance exactly.
pub fn settle(snapshot: &Snapshot) -> Settlement {
    let net_balance = snapshot.totals.net_balance();
    let unpaid = snapshot.totals.unpaid_revenue;

    let rows = snapshot
        .partners
        .iter()
        .map(|p| {
            let ratio = p.share_percentage / Decimal::ONE_HUNDRED;
            let paid_profit_share = net_balance * ratio;
            let pending_profit_share = unpaid * ratio;
            PartnerShare {
                partner: p.name.clone(),
                share_percentage: p.share_percentage,
                paid_profit_share,
                pending_profit_share,
                total_profit_share: paid_profit_share + pending_profit_share,
                total_invested: p.total_invested,
                total_paid_out: p.total_paid_out,
                remaining_to_pay: paid_profit_share - p.total_paid_out,
                remaining_treasury: paid_profit_share + p.total_invested - p.total_paid_out,
            }
        })
        .collect();

    Settlement {
        totals: snapshot.totals,
        net_balance,
        global_balance: snapshot.totals.global_balance(),
        share_total: snapshot.share_total(),
        rows,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayoutSlice {
    pub label: String,
    pub amount: Decimal,
}

/// What has been paid to each partner against the realized balance, and what
/// is left to hand out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayoutDistribution {
    pub net_balance: Decimal,
    pub distributed: Decimal,
    pub remaining: Decimal,
    pub slices: Vec<PayoutSlice>,
}

pub fn payout_distribution(snapshot: &Snapshot) -> PayoutDistribution {
    let net_balance = snapshot.totals.net_balance();
    let slices: Vec<PayoutSlice> = snapshot
        .partners
        .iter()
        .map(|p| PayoutSlice {
            label: p.name.clone(),
            amount: p.total_paid_out,
        })
        .collect();
    let distributed: Decimal = slices.iter().map(|s| s.amount).sum();
    PayoutDistribution {
        net_balance,
        distributed,
        remaining: net_balance - distributed,
        slices,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvestmentGap {
    pub partner: String,
    pub total_invested: Decimal,
    /// Positive: invested above the average. Negative: owes that much to even out.
    pub difference: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvestmentBalance {
    pub total_invested: Decimal,
    pub average_per_partner: Decimal,
    pub partners: Vec<InvestmentGap>,
}

pub fn investment_balance(partners: &[PartnerPosition]) -> InvestmentBalance {
    let total_invested: Decimal = partners.iter().map(|p| p.total_invested).sum();
    let average_per_partner = if partners.is_empty() {
        Decimal::ZERO
    } else {
        total_invested / Decimal::from(partners.len())
    };
    InvestmentBalance {
        total_invested,
        average_per_partner,
        partners: partners
            .iter()
            .map(|p| InvestmentGap {
                partner: p.name.clone(),
                total_invested: p.total_invested,
                difference: p.total_invested - average_per_partner,
            })
            .collect(),
    }
}

/// Names identifying the two partners of the legacy method. The first is
/// compared for equality, the second as a substring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyReferences {
    pub first: String,
    pub second: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LegacyRow {
    pub partner: String,
    pub matched: bool,
    pub investment: Decimal,
    pub balance_operations: Decimal,
    pub difference: Decimal,
    pub amount_paid: Decimal,
    pub disbursement: Decimal,
    pub encashment: Decimal,
    pub treasury_split: Decimal,
    pub remainder: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegacySettlement {
    pub first: LegacyRow,
    pub second: LegacyRow,
    pub total: LegacyRow,
}

impl LegacySettlement {
    pub fn rows(&self) -> [&LegacyRow; 3] {
        [&self.first, &self.second, &self.total]
    }
}

struct LegacyMatch {
    display: String,
    matched: bool,
    investment: Decimal,
    amount_paid: Decimal,
}

// Investment comes from the first partner matching in name order, payouts are
// summed over every matching partner.
fn legacy_match<F>(partners: &[PartnerPosition], reference: &str, is_match: F) -> LegacyMatch
where
    F: Fn(&str) -> bool,
{
    let mut hits = partners.iter().filter(|p| is_match(&p.name)).peekable();
    let Some(first) = hits.peek().map(|p| (*p).clone()) else {
        return LegacyMatch {
            display: reference.to_string(),
            matched: false,
            investment: Decimal::ZERO,
            amount_paid: Decimal::ZERO,
        };
    };
    let amount_paid = hits.map(|p| p.total_paid_out).sum();
    LegacyMatch {
        display: first.name,
        matched: true,
        investment: first.total_invested,
        amount_paid,
    }
}

/// Historical two-partner settlement kept for audit parity.
///
/// The first partner's operations balance is fixed at 0 and the second
/// carries the whole net balance; each side's disbursement is the other
/// side's payout. A reference partner that cannot be found contributes a
/// zero row (`matched == false`) instead of failing the report.
pub fn settle_legacy(snapshot: &Snapshot, refs: &LegacyReferences) -> LegacySettlement {
    let net_balance = snapshot.totals.net_balance();
    let a = legacy_match(&snapshot.partners, &refs.first, |n| n == refs.first);
    let b = legacy_match(&snapshot.partners, &refs.second, |n| {
        n.contains(refs.second.as_str())
    });

    let total_investment = a.investment + b.investment;
    let total_paid = a.amount_paid + b.amount_paid;

    let diff_a = Decimal::ZERO - a.investment;
    let diff_b = net_balance - b.investment;
    let total_diff = net_balance - total_investment;

    let disb_a = -b.amount_paid;
    let disb_b = -a.amount_paid;
    let total_disb = -(a.amount_paid + b.amount_paid);

    let enc_a = diff_a + a.amount_paid + disb_a;
    let enc_b = diff_b + b.amount_paid + disb_b;
    let total_enc = total_diff + total_paid + total_disb;

    let split = (net_balance - total_investment) / Decimal::TWO;

    let first = LegacyRow {
        partner: a.display,
        matched: a.matched,
        investment: a.investment,
        balance_operations: Decimal::ZERO,
        difference: diff_a,
        amount_paid: a.amount_paid,
        disbursement: disb_a,
        encashment: enc_a,
        treasury_split: split,
        remainder: split - enc_a,
    };
    let second = LegacyRow {
        partner: b.display,
        matched: b.matched,
        investment: b.investment,
        balance_operations: net_balance,
        difference: diff_b,
        amount_paid: b.amount_paid,
        disbursement: disb_b,
        encashment: enc_b,
        treasury_split: split,
        remainder: split - enc_b,
    };
    let total = LegacyRow {
        partner: "TOTAL".to_string(),
        matched: a.matched && b.matched,
        investment: total_investment,
        balance_operations: net_balance,
        difference: total_diff,
        amount_paid: total_paid,
        disbursement: total_disb,
        encashment: total_enc,
        treasury_split: split * Decimal::TWO,
        remainder: split * Decimal::TWO - total_enc,
    };

    LegacySettlement {
        first,
        second,
        total,
    }
}
