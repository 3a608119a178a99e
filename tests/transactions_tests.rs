// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use partnerbook::{cli, commands::transactions, db, LedgerError};
use rusqlite::{params, Connection};

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn.execute("INSERT INTO categories(id, name) VALUES (1, 'Travaux')", [])
        .unwrap();
    conn.execute(
        "INSERT INTO projects(id, name, included_in_calc) VALUES (1, 'Villa', 1), (2, 'Side', 0)",
        [],
    )
    .unwrap();
    for i in 1..=3 {
        conn.execute(
            "INSERT INTO transactions(date, amount, label, category_id, kind, project_id, paid, payment_date)
             VALUES (?1, '10', 'P', 1, 'charge', NULL, 0, NULL)",
            params![format!("2025-01-0{}", i)],
        )
        .unwrap();
    }
    conn
}

fn run(conn: &Connection, args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["partnerbook", "tx"];
    argv.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(argv);
    let (_, tx_m) = matches.subcommand().unwrap();
    transactions::handle(conn, tx_m)
}

fn list(conn: &Connection, args: &[&str]) -> Vec<transactions::TransactionRow> {
    let mut argv = vec!["partnerbook", "tx", "list"];
    argv.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(argv);
    if let Some(("tx", tx_m)) = matches.subcommand() {
        if let Some(("list", list_m)) = tx_m.subcommand() {
            return transactions::query_rows(conn, list_m).unwrap();
        }
    }
    panic!("no tx list subcommand");
}

fn validation_error(err: anyhow::Error) -> bool {
    err.downcast_ref::<LedgerError>()
        .map(LedgerError::is_validation)
        .unwrap_or(false)
}

#[test]
fn list_limit_respected() {
    let conn = setup();
    let rows = list(&conn, &["--limit", "2"]);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].date, "2025-01-03");
}

#[test]
fn add_with_paid_defaults_payment_date() {
    let conn = setup();
    run(
        &conn,
        &[
            "add", "--date", "15/02/2025", "--amount", "1 234,50", "--label", "Acompte",
            "--category", "Travaux", "--kind", "recette", "--project", "Villa", "--paid",
        ],
    )
    .unwrap();
    let rows = list(&conn, &["--kind", "recette"]);
    assert_eq!(rows.len(), 1);
    let r = &rows[0];
    assert_eq!(r.date, "2025-02-15");
    assert_eq!(r.amount.to_string(), "1234.50");
    assert_eq!(r.project, "Villa");
    assert!(r.paid);
    assert_eq!(r.payment_date, "2025-02-15");
}

#[test]
fn add_rejects_bad_input() {
    let conn = setup();
    let base = |amount: &'static str, label: &'static str| {
        vec![
            "add", "--date", "2025-02-01", "--amount", amount, "--label", label, "--category",
            "Travaux", "--kind", "charge",
        ]
    };
    assert!(validation_error(run(&conn, &base("0", "x")).unwrap_err()));
    assert!(validation_error(run(&conn, &base("0,00", "x")).unwrap_err()));
    assert!(validation_error(run(&conn, &base("5", "  ")).unwrap_err()));

    let mut missing_cat = base("5", "x");
    missing_cat[8] = "Nope";
    let err = run(&conn, &missing_cat).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::NotFound { entity: "Category", .. })
    ));

    let mut unknown_project = base("5", "x");
    unknown_project.extend(["--project", "Ghost"]);
    assert!(run(&conn, &unknown_project).is_err());

    let mut date_without_paid = base("5", "x");
    date_without_paid.extend(["--payment-date", "2025-02-03"]);
    assert!(validation_error(run(&conn, &date_without_paid).unwrap_err()));

    assert_eq!(list(&conn, &[]).len(), 3);
}

#[test]
fn inclusion_filters() {
    let conn = setup();
    conn.execute(
        "INSERT INTO transactions(date, amount, label, category_id, kind, project_id, paid)
         VALUES ('2025-02-01', '50', 'in', 1, 'recette', 1, 0),
                ('2025-02-02', '70', 'out', 1, 'recette', 2, 0)",
        [],
    )
    .unwrap();
    let included = list(&conn, &["--included-only"]);
    assert_eq!(included.len(), 4);
    assert!(included.iter().all(|r| r.label != "out"));

    let excluded = list(&conn, &["--excluded-only"]);
    assert_eq!(excluded.len(), 1);
    assert_eq!(excluded[0].label, "out");
    assert!(!excluded[0].included_in_calc);

    let by_project = list(&conn, &["--project", "Villa"]);
    assert_eq!(by_project.len(), 1);
}

#[test]
fn date_and_payment_filters() {
    let conn = setup();
    run(&conn, &["mark-paid", "--id", "2", "--date", "2025-03-10"]).unwrap();

    assert_eq!(list(&conn, &["--from", "2025-01-02"]).len(), 2);
    assert_eq!(list(&conn, &["--from", "2025-01-02", "--to", "02/01/2025"]).len(), 1);
    assert_eq!(list(&conn, &["--paid"]).len(), 1);
    assert_eq!(list(&conn, &["--unpaid"]).len(), 2);
    assert_eq!(list(&conn, &["--paid-from", "2025-03-01", "--paid-to", "2025-03-31"]).len(), 1);
    assert_eq!(list(&conn, &["--paid-from", "2025-04-01"]).len(), 0);
}

#[test]
fn mark_all_paid_keeps_existing_payment_dates() {
    let conn = setup();
    transactions::mark_paid(&conn, 1, chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()).unwrap();
    let n = transactions::mark_all_paid(&conn).unwrap();
    assert_eq!(n, 2);
    let rows = list(&conn, &[]);
    assert!(rows.iter().all(|r| r.paid));
    let first = rows.iter().find(|r| r.id == 1).unwrap();
    assert_eq!(first.payment_date, "2025-06-01");
    let third = rows.iter().find(|r| r.id == 3).unwrap();
    assert_eq!(third.payment_date, "2025-01-03");
}

#[test]
fn remove_and_mark_unknown_ids() {
    let conn = setup();
    run(&conn, &["rm", "--id", "1"]).unwrap();
    assert_eq!(list(&conn, &[]).len(), 2);
    assert!(run(&conn, &["rm", "--id", "1"]).is_err());
    assert!(run(&conn, &["mark-paid", "--id", "42"]).is_err());
    assert!(validation_error(run(&conn, &["rm", "--id", "abc"]).unwrap_err()));
}
