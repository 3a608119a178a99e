// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use partnerbook::settlement::{
    investment_balance, payout_distribution, settle, settle_legacy, LedgerTotals,
    LegacyReferences, PartnerPosition, Snapshot,
};
use rust_decimal::Decimal;
use std::str::FromStr;

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn partner(id: i64, name: &str, share: &str, invested: &str, paid_out: &str) -> PartnerPosition {
    PartnerPosition {
        id,
        name: name.to_string(),
        share_percentage: d(share),
        total_invested: d(invested),
        total_paid_out: d(paid_out),
    }
}

fn snapshot(paid: &str, unpaid: &str, expense: &str, partners: Vec<PartnerPosition>) -> Snapshot {
    Snapshot {
        totals: LedgerTotals {
            paid_revenue: d(paid),
            unpaid_revenue: d(unpaid),
            total_expense: d(expense),
        },
        partners,
    }
}

fn refs() -> LegacyReferences {
    LegacyReferences {
        first: "EL AZZAOUY ABDERRAHIM".to_string(),
        second: "MOHAMED LAHBIB".to_string(),
    }
}

#[test]
fn sixty_forty_split_of_realized_profit() {
    let snap = snapshot(
        "15000",
        "0",
        "5000",
        vec![
            partner(1, "A", "60", "0", "3000"),
            partner(2, "B", "40", "0", "1000"),
        ],
    );
    let s = settle(&snap);
    assert_eq!(s.net_balance, d("10000"));
    assert_eq!(s.rows[0].paid_profit_share, d("6000"));
    assert_eq!(s.rows[1].paid_profit_share, d("4000"));
    assert_eq!(s.rows[0].remaining_to_pay, d("3000"));
    assert_eq!(s.rows[1].remaining_to_pay, d("3000"));
    assert_eq!(s.remaining_to_pay_total(), d("6000"));
}

#[test]
fn pending_revenue_is_split_on_top() {
    let snap = snapshot(
        "10000",
        "5000",
        "0",
        vec![
            partner(1, "A", "60", "0", "0"),
            partner(2, "B", "40", "0", "0"),
        ],
    );
    let s = settle(&snap);
    assert_eq!(s.rows[0].pending_profit_share, d("3000"));
    assert_eq!(s.rows[1].pending_profit_share, d("2000"));
    assert_eq!(s.rows[0].total_profit_share, d("9000"));
    assert_eq!(s.rows[1].total_profit_share, d("6000"));
    assert_eq!(s.global_balance, d("15000"));
}

#[test]
fn remaining_treasury_adds_investment() {
    let snap = snapshot("1000", "0", "0", vec![partner(1, "A", "100", "250", "400")]);
    let row = &settle(&snap).rows[0];
    assert_eq!(row.remaining_treasury, d("850"));
    assert_eq!(row.remaining_to_pay, d("600"));
}

#[test]
fn paid_shares_sum_to_net_balance_when_fully_allocated() {
    let share_lists: Vec<Vec<&str>> = vec![
        vec!["100"],
        vec!["50", "50"],
        vec!["33.33", "33.33", "33.34"],
        vec!["12.5", "87.5"],
        vec!["10"; 10],
        vec!["0.01", "99.99"],
        vec!["14.2857", "14.2857", "14.2857", "14.2857", "14.2857", "14.2857", "14.2858"],
    ];
    let balances = [
        ("10000", "0"),
        ("12345.67", "2345.6"),
        ("0.03", "7"),
        ("999999.99", "1000000"),
        ("100", "250.5"),
    ];
    let tolerance = Decimal::new(1, 6);
    for shares in &share_lists {
        for (paid, expense) in balances {
            let partners = shares
                .iter()
                .enumerate()
                .map(|(i, s)| partner(i as i64, &format!("P{:02}", i), s, "0", "0"))
                .collect();
            let snap = snapshot(paid, "0", expense, partners);
            assert!(snap.is_fully_allocated(), "{:?}", shares);
            let s = settle(&snap);
            let diff = (s.paid_profit_total() - s.net_balance).abs();
            assert!(
                diff <= tolerance,
                "shares {:?} on {} - {}: off by {}",
                shares,
                paid,
                expense,
                diff
            );
        }
    }
}

#[test]
fn settlement_is_idempotent() {
    let snap = snapshot(
        "8200.5",
        "1200",
        "3100.25",
        vec![
            partner(1, "A", "70", "300", "100"),
            partner(2, "B", "30", "50", "20"),
        ],
    );
    assert_eq!(settle(&snap), settle(&snap));
    assert_eq!(settle_legacy(&snap, &refs()), settle_legacy(&snap, &refs()));
    assert_eq!(payout_distribution(&snap), payout_distribution(&snap));
}

#[test]
fn zero_partners_yield_empty_rows_and_zero_average() {
    let snap = snapshot("500", "100", "200", Vec::new());
    let s = settle(&snap);
    assert!(s.rows.is_empty());
    assert_eq!(s.paid_profit_total(), Decimal::ZERO);
    assert_eq!(s.share_total, Decimal::ZERO);
    assert!(!s.is_fully_allocated());

    let b = investment_balance(&snap.partners);
    assert_eq!(b.total_invested, Decimal::ZERO);
    assert_eq!(b.average_per_partner, Decimal::ZERO);
    assert!(b.partners.is_empty());

    let dist = payout_distribution(&snap);
    assert_eq!(dist.distributed, Decimal::ZERO);
    assert_eq!(dist.remaining, d("300"));
}

#[test]
fn legacy_two_partner_table() {
    let snap = snapshot(
        "10000",
        "0",
        "0",
        vec![
            partner(1, "EL AZZAOUY ABDERRAHIM", "50", "2000", "1000"),
            partner(2, "EL AZZOUY MOHAMED LAHBIB ET STE", "50", "8000", "4000"),
        ],
    );
    let l = settle_legacy(&snap, &refs());

    assert!(l.first.matched && l.second.matched && l.total.matched);
    assert_eq!(l.second.partner, "EL AZZOUY MOHAMED LAHBIB ET STE");

    assert_eq!(l.first.balance_operations, d("0"));
    assert_eq!(l.second.balance_operations, d("10000"));
    assert_eq!(l.first.difference, d("-2000"));
    assert_eq!(l.second.difference, d("2000"));
    assert_eq!(l.first.disbursement, d("-4000"));
    assert_eq!(l.second.disbursement, d("-1000"));
    assert_eq!(l.first.encashment, d("-5000"));
    assert_eq!(l.second.encashment, d("5000"));
    assert_eq!(l.first.treasury_split, d("0"));
    assert_eq!(l.first.remainder, d("5000"));
    assert_eq!(l.second.remainder, d("-5000"));

    assert_eq!(l.total.partner, "TOTAL");
    assert_eq!(l.total.investment, d("10000"));
    assert_eq!(l.total.balance_operations, d("10000"));
    assert_eq!(l.total.difference, d("0"));
    assert_eq!(l.total.amount_paid, d("5000"));
    assert_eq!(l.total.disbursement, d("-5000"));
    assert_eq!(l.total.encashment, d("0"));
    assert_eq!(l.total.remainder, d("0"));
}

#[test]
fn legacy_totals_use_doubled_split() {
    let snap = snapshot(
        "13000",
        "0",
        "1000",
        vec![
            partner(1, "EL AZZAOUY ABDERRAHIM", "50", "1000", "500"),
            partner(2, "MOHAMED LAHBIB", "50", "1000", "0"),
        ],
    );
    let l = settle_legacy(&snap, &refs());
    // (12000 - 2000) / 2
    assert_eq!(l.first.treasury_split, d("5000"));
    assert_eq!(l.total.treasury_split, d("10000"));
    assert_eq!(l.total.remainder, d("10000") - l.total.encashment);
}

#[test]
fn legacy_first_partner_needs_exact_name() {
    let snap = snapshot(
        "100",
        "0",
        "0",
        vec![
            partner(1, "EL AZZAOUY ABDERRAHIM JR", "50", "10", "10"),
            partner(2, "MOHAMED LAHBIB", "50", "20", "5"),
        ],
    );
    let l = settle_legacy(&snap, &refs());
    assert!(!l.first.matched);
    assert_eq!(l.first.partner, "EL AZZAOUY ABDERRAHIM");
    assert_eq!(l.first.investment, Decimal::ZERO);
    assert_eq!(l.first.amount_paid, Decimal::ZERO);
    assert!(l.second.matched);
    assert!(!l.total.matched);
}

#[test]
fn legacy_missing_partners_still_render() {
    let snap = snapshot(
        "4000",
        "0",
        "1000",
        vec![
            partner(1, "ALICE", "50", "100", "50"),
            partner(2, "BOB", "50", "100", "50"),
        ],
    );
    let l = settle_legacy(&snap, &refs());
    assert!(!l.first.matched);
    assert!(!l.second.matched);
    assert_eq!(l.total.investment, Decimal::ZERO);
    assert_eq!(l.total.amount_paid, Decimal::ZERO);
    assert_eq!(l.second.balance_operations, d("3000"));
    assert_eq!(l.first.treasury_split, d("1500"));
}

#[test]
fn legacy_substring_match_sums_every_hit() {
    let snap = snapshot(
        "0",
        "0",
        "0",
        vec![
            partner(1, "EL AZZAOUY ABDERRAHIM", "40", "0", "0"),
            partner(2, "MOHAMED LAHBIB", "30", "700", "100"),
            partner(3, "MOHAMED LAHBIB ET STE", "30", "900", "250"),
        ],
    );
    let l = settle_legacy(&snap, &refs());
    // investment from the first hit in name order, payouts from all hits
    assert_eq!(l.second.investment, d("700"));
    assert_eq!(l.second.amount_paid, d("350"));
    assert_eq!(l.first.disbursement, d("-350"));
}

#[test]
fn investment_balance_against_average() {
    let partners = vec![
        partner(1, "A", "50", "3000", "0"),
        partner(2, "B", "50", "1000", "0"),
    ];
    let b = investment_balance(&partners);
    assert_eq!(b.total_invested, d("4000"));
    assert_eq!(b.average_per_partner, d("2000"));
    assert_eq!(b.partners[0].difference, d("1000"));
    assert_eq!(b.partners[1].difference, d("-1000"));
}

#[test]
fn payout_distribution_remaining() {
    let snap = snapshot(
        "10000",
        "0",
        "2000",
        vec![
            partner(1, "A", "60", "0", "3000"),
            partner(2, "B", "40", "0", "1000"),
        ],
    );
    let dist = payout_distribution(&snap);
    assert_eq!(dist.net_balance, d("8000"));
    assert_eq!(dist.distributed, d("4000"));
    assert_eq!(dist.remaining, d("4000"));
    assert_eq!(dist.slices.len(), 2);
    assert_eq!(dist.slices[0].label, "A");
}
