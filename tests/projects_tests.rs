// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use partnerbook::commands::{categories, projects, todo};
use partnerbook::{cli, db, LedgerError};
use rusqlite::Connection;

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn
}

fn run_project(conn: &mut Connection, args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["partnerbook", "project"];
    argv.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(argv);
    let (_, m) = matches.subcommand().unwrap();
    projects::handle(conn, m)
}

fn due() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
}

#[test]
fn project_lifecycle() {
    let mut conn = setup();
    run_project(&mut conn, &["add", "--name", "Villa"]).unwrap();
    run_project(&mut conn, &["add", "--name", "Side", "--excluded"]).unwrap();
    assert!(run_project(&mut conn, &["add", "--name", "Villa"]).is_err());

    let list = projects::list_projects(&conn).unwrap();
    assert_eq!(list.len(), 2);
    let side = list.iter().find(|p| p.project.name == "Side").unwrap();
    assert!(!side.project.included_in_calc);

    run_project(&mut conn, &["include", "--name", "Side"]).unwrap();
    run_project(&mut conn, &["exclude", "--name", "Villa"]).unwrap();
    let list = projects::list_projects(&conn).unwrap();
    assert!(list.iter().find(|p| p.project.name == "Side").unwrap().project.included_in_calc);
    assert!(!list.iter().find(|p| p.project.name == "Villa").unwrap().project.included_in_calc);
}

#[test]
fn rename_keeps_transactions_and_tasks_attached() {
    let mut conn = setup();
    let id = projects::add_project(&conn, "Villa", None, true).unwrap();
    conn.execute("INSERT INTO categories(id, name) VALUES (1, 'Travaux')", [])
        .unwrap();
    conn.execute(
        "INSERT INTO transactions(date, amount, label, category_id, kind, project_id)
         VALUES ('2025-01-01', '10', 'x', 1, 'charge', ?1)",
        [id],
    )
    .unwrap();
    todo::add_task(&conn, "Villa", due(), None, None, &["Plans".to_string()]).unwrap();
    projects::add_project(&conn, "Other", None, true).unwrap();

    assert!(projects::rename_project(&mut conn, "Villa", "Other").is_err());
    projects::rename_project(&mut conn, "Villa", "Villa Anfa").unwrap();

    let list = projects::list_projects(&conn).unwrap();
    let renamed = list.iter().find(|p| p.project.id == id).unwrap();
    assert_eq!(renamed.project.name, "Villa Anfa");
    assert_eq!(renamed.transactions, 1);
    assert_eq!(todo::list_tasks(&conn).unwrap()[0].project_name, "Villa Anfa");
}

#[test]
fn referenced_project_and_category_cannot_be_removed() {
    let conn = setup();
    let pid = projects::add_project(&conn, "Villa", None, true).unwrap();
    conn.execute("INSERT INTO categories(id, name) VALUES (1, 'Travaux')", [])
        .unwrap();
    conn.execute(
        "INSERT INTO transactions(date, amount, label, category_id, kind, project_id)
         VALUES ('2025-01-01', '10', 'x', 1, 'charge', ?1)",
        [pid],
    )
    .unwrap();

    let err = projects::remove_project(&conn, "Villa").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::InUse { count: 1, .. })
    ));
    let err = categories::remove_category(&conn, "Travaux").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::InUse { .. })
    ));

    conn.execute("DELETE FROM transactions", []).unwrap();
    projects::remove_project(&conn, "Villa").unwrap();
    categories::remove_category(&conn, "Travaux").unwrap();
    assert!(categories::list_categories(&conn).unwrap().is_empty());
}

#[test]
fn todo_steps_check_and_undo() {
    let conn = setup();
    projects::add_project(&conn, "Villa", None, true).unwrap();
    let steps = vec!["Plans".to_string(), " ".to_string(), "Permis".to_string()];
    let id = todo::add_task(&conn, "Villa", due(), Some("Dossier"), None, &steps).unwrap();

    let task = todo::set_step(&conn, id, 1, true).unwrap();
    assert_eq!(task.steps.len(), 2);
    assert!(!task.is_complete());
    let task = todo::set_step(&conn, id, 2, true).unwrap();
    assert!(task.is_complete());
    let task = todo::set_step(&conn, id, 2, false).unwrap();
    assert!(!task.is_complete());

    assert!(todo::set_step(&conn, id, 0, true).is_err());
    assert!(todo::set_step(&conn, id, 3, true).is_err());
    assert!(todo::set_step(&conn, 99, 1, true).is_err());
    assert!(todo::add_task(&conn, "Ghost", due(), None, None, &[]).is_err());
}

#[test]
fn tasks_are_listed_by_due_date() {
    let conn = setup();
    projects::add_project(&conn, "Villa", None, true).unwrap();
    todo::add_task(&conn, "Villa", due(), Some("late"), None, &[]).unwrap();
    todo::add_task(
        &conn,
        "Villa",
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
        Some("early"),
        None,
        &[],
    )
    .unwrap();
    let tasks = todo::list_tasks(&conn).unwrap();
    assert_eq!(tasks[0].description.as_deref(), Some("early"));
    assert_eq!(tasks[1].description.as_deref(), Some("late"));
}
