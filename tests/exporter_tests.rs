// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use partnerbook::{cli, commands::exporter, commands::importer, db};
use rusqlite::Connection;
use serde_json::json;
use tempfile::tempdir;

fn base_conn() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn.execute("INSERT INTO categories(id, name) VALUES (1, 'Ventes')", [])
        .unwrap();
    conn.execute(
        "INSERT INTO projects(id, name, included_in_calc) VALUES (1, 'Villa', 1), (2, 'Side', 0)",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO transactions(date, amount, label, category_id, kind, project_id, paid, payment_date) VALUES \
         ('2025-01-02', '12.34', 'Acompte', 1, 'recette', 1, 1, '2025-01-05'),
         ('2025-01-03', '99', 'Hors calcul', 1, 'charge', 2, 0, NULL)",
        [],
    )
    .unwrap();
    conn
}

fn export(conn: &Connection, args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["partnerbook", "export", "transactions"];
    argv.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(argv);
    if let Some(("export", export_m)) = matches.subcommand() {
        exporter::handle(conn, export_m)
    } else {
        panic!("no export subcommand");
    }
}

#[test]
fn export_transactions_streams_pretty_json() {
    let conn = base_conn();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("export.json");
    let out_str = out_path.to_string_lossy().to_string();

    export(&conn, &["--format", "json", "--out", &out_str]).unwrap();

    let contents = std::fs::read_to_string(&out_path).unwrap();
    assert!(contents.contains("\n  {"), "expected pretty JSON");
    let v: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(
        v[0],
        json!({
            "date": "2025-01-02",
            "amount": "12.34",
            "label": "Acompte",
            "kind": "recette",
            "project": "Villa",
            "category": "Ventes",
            "paid": "oui",
            "payment_date": "2025-01-05"
        })
    );
    assert_eq!(v.as_array().unwrap().len(), 2);
}

#[test]
fn included_only_drops_excluded_projects() {
    let conn = base_conn();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("export.csv");
    let out_str = out_path.to_string_lossy().to_string();

    export(&conn, &["--format", "CSV", "--out", &out_str, "--included-only"]).unwrap();

    let mut rdr = csv::Reader::from_path(&out_path).unwrap();
    let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][2], "Acompte");
}

#[test]
fn unknown_format_fails_without_creating_a_file() {
    let conn = base_conn();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("export.xml");
    let out_str = out_path.to_string_lossy().to_string();

    assert!(export(&conn, &["--format", "xml", "--out", &out_str]).is_err());
    assert!(!out_path.exists());
}

#[test]
fn csv_export_imports_back() {
    let conn = base_conn();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("roundtrip.csv");
    exporter::export_transactions(&conn, exporter::ExportFormat::Csv, &out_path, false).unwrap();

    let mut fresh = Connection::open_in_memory().unwrap();
    db::init_schema(&mut fresh).unwrap();
    fresh
        .execute_batch(
            "INSERT INTO categories(id, name) VALUES (1, 'Ventes');
             INSERT INTO projects(id, name, included_in_calc) VALUES (1, 'Villa', 1), (2, 'Side', 0);",
        )
        .unwrap();
    let n = importer::import_transactions(&mut fresh, &out_path).unwrap();
    assert_eq!(n, 2);
    let paid_date: String = fresh
        .query_row(
            "SELECT payment_date FROM transactions WHERE label='Acompte'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(paid_date, "2025-01-05");
}
