// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{SETTINGS, get_setting, pretty_table, set_setting};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => {
            let key = sub.get_one::<String>("key").unwrap().trim();
            let value = sub.get_one::<String>("value").unwrap();
            set_setting(conn, key, value)?;
            tracing::info!(key, value = value.trim(), "setting updated");
            println!("{} = {}", key, value.trim());
        }
        Some(("get", sub)) => {
            let key = sub.get_one::<String>("key").unwrap().trim();
            println!("{}", get_setting(conn, key)?);
        }
        Some(("list", _)) => {
            let mut data = Vec::new();
            for (key, default) in SETTINGS {
                data.push(vec![
                    key.to_string(),
                    get_setting(conn, key)?,
                    default.to_string(),
                ]);
            }
            println!("{}", pretty_table(&["Key", "Value", "Default"], data));
        }
        _ => {}
    }
    Ok(())
}
