// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use partnerbook::commands::{partners, payments};
use partnerbook::utils::page_bounds;
use partnerbook::{cli, db, LedgerError};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::str::FromStr;

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn
}

fn partner_cmd(conn: &Connection, args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["partnerbook", "partner"];
    argv.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(argv);
    let (_, m) = matches.subcommand().unwrap();
    partners::handle(conn, m)
}

#[test]
fn shares_cannot_exceed_one_hundred() {
    let conn = setup();
    partner_cmd(&conn, &["add", "--name", "A", "--share", "60"]).unwrap();
    partner_cmd(&conn, &["add", "--name", "B", "--share", "30"]).unwrap();

    let err = partner_cmd(&conn, &["add", "--name", "C", "--share", "10,5"]).unwrap_err();
    assert!(err.downcast_ref::<LedgerError>().unwrap().is_validation());

    partner_cmd(&conn, &["add", "--name", "C", "--share", "10"]).unwrap();
    assert_eq!(partners::share_total(&conn, None).unwrap(), d("100"));

    // moving share between partners must go through a decrease first
    assert!(partners::set_share(&conn, "B", d("40")).is_err());
    partners::set_share(&conn, "A", d("50")).unwrap();
    partners::set_share(&conn, "B", d("40")).unwrap();
    assert_eq!(partners::share_total(&conn, None).unwrap(), d("100"));
}

#[test]
fn share_must_be_positive_and_at_most_hundred() {
    let conn = setup();
    assert!(partner_cmd(&conn, &["add", "--name", "A", "--share", "0"]).is_err());
    assert!(partner_cmd(&conn, &["add", "--name", "A", "--share", "100.01"]).is_err());
    assert!(partners::add_partner(&conn, "A", d("-1")).is_err());
    assert!(partners::list_partners(&conn).unwrap().is_empty());
}

#[test]
fn duplicate_partner_is_rejected() {
    let conn = setup();
    partners::add_partner(&conn, "A", d("10")).unwrap();
    let err = partners::add_partner(&conn, "A", d("10")).unwrap_err();
    assert!(err.to_string().contains("already exists"));
}

#[test]
fn partner_with_history_cannot_be_removed() {
    let conn = setup();
    partners::add_partner(&conn, "A", d("50")).unwrap();
    partners::add_partner(&conn, "B", d("50")).unwrap();
    payments::add_payment(
        &conn,
        "A",
        d("100"),
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        Some("avance"),
    )
    .unwrap();

    let err = partners::remove_partner(&conn, "A").unwrap_err();
    match err.downcast_ref::<LedgerError>() {
        Some(LedgerError::InUse { count, referrer, .. }) => {
            assert_eq!(*count, 1);
            assert_eq!(*referrer, "payment(s)");
        }
        other => panic!("unexpected error {:?}", other),
    }
    partners::remove_partner(&conn, "B").unwrap();
    assert!(matches!(
        partners::remove_partner(&conn, "B")
            .unwrap_err()
            .downcast_ref::<LedgerError>(),
        Some(LedgerError::NotFound { .. })
    ));
}

#[test]
fn payments_list_newest_first_and_paginates() {
    let conn = setup();
    partners::add_partner(&conn, "A", d("50")).unwrap();
    partners::add_partner(&conn, "B", d("50")).unwrap();
    for day in 1..=5 {
        let date = NaiveDate::from_ymd_opt(2025, 3, day).unwrap();
        payments::add_payment(&conn, if day % 2 == 0 { "B" } else { "A" }, d("10"), date, None)
            .unwrap();
    }
    let all = payments::list_payments(&conn, None).unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(all[0].date.to_string(), "2025-03-05");

    let only_b = payments::list_payments(&conn, Some("B")).unwrap();
    assert_eq!(only_b.len(), 2);

    assert_eq!(page_bounds(all.len(), 2, 1), (0, 2));
    assert_eq!(page_bounds(all.len(), 2, 3), (4, 5));
    assert_eq!(page_bounds(all.len(), 2, 9), (5, 5));
    assert_eq!(page_bounds(all.len(), 0, 4), (0, 5));
}

#[test]
fn payment_validation() {
    let conn = setup();
    partners::add_partner(&conn, "A", d("50")).unwrap();
    let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    assert!(payments::add_payment(&conn, "A", Decimal::ZERO, day, None).is_err());
    assert!(payments::add_payment(&conn, "Ghost", d("5"), day, None).is_err());
    let id = payments::add_payment(&conn, "A", d("5"), day, None).unwrap();
    payments::remove_payment(&conn, id).unwrap();
    assert!(payments::remove_payment(&conn, id).is_err());
}

#[test]
fn payment_list_cli_paging_args() {
    let conn = setup();
    partners::add_partner(&conn, "A", d("100")).unwrap();
    let matches = cli::build_cli().get_matches_from([
        "partnerbook", "payment", "list", "--limit", "2", "--page", "2", "--json",
    ]);
    if let Some(("payment", m)) = matches.subcommand() {
        payments::handle(&conn, m).unwrap();
    } else {
        panic!("no payment subcommand");
    }
}
