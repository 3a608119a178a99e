// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn json_args() -> [Arg; 2] {
    [
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print JSON"),
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    ]
}

fn opt(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).num_args(1).help(help)
}

fn req(name: &'static str, help: &'static str) -> Arg {
    opt(name, help).required(true)
}

fn flag(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .action(ArgAction::SetTrue)
        .help(help)
}

fn period_arg() -> Arg {
    Arg::new("period")
        .long("period")
        .num_args(1)
        .default_value("month")
        .value_parser(["day", "month", "year"])
        .help("Grouping period")
}

fn all_projects_arg() -> Arg {
    flag(
        "all-projects",
        "Include projects excluded from calculations",
    )
}

pub fn build_cli() -> Command {
    Command::new("partnerbook")
        .about("Business ledger with project tracking, partner settlement, investments and invoices")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(
            Command::new("config")
                .about("Runtime settings")
                .subcommand(
                    Command::new("set")
                        .arg(req("key", "Setting key"))
                        .arg(req("value", "Setting value")),
                )
                .subcommand(Command::new("get").arg(req("key", "Setting key")))
                .subcommand(Command::new("list")),
        )
        .subcommand(
            Command::new("category")
                .about("Transaction categories")
                .subcommand(
                    Command::new("add")
                        .arg(req("name", "Category name"))
                        .arg(opt("description", "Description")),
                )
                .subcommand(Command::new("list").args(json_args()))
                .subcommand(Command::new("rm").arg(req("name", "Category name"))),
        )
        .subcommand(
            Command::new("project")
                .about("Projects and their inclusion in partner calculations")
                .subcommand(
                    Command::new("add")
                        .arg(req("name", "Project name"))
                        .arg(opt("description", "Description"))
                        .arg(flag("excluded", "Exclude from partner calculations")),
                )
                .subcommand(Command::new("list").args(json_args()))
                .subcommand(Command::new("rm").arg(req("name", "Project name")))
                .subcommand(
                    Command::new("rename")
                        .arg(req("name", "Current name"))
                        .arg(req("to", "New name")),
                )
                .subcommand(Command::new("include").arg(req("name", "Project name")))
                .subcommand(Command::new("exclude").arg(req("name", "Project name"))),
        )
        .subcommand(
            Command::new("tx")
                .about("Charges and revenues")
                .subcommand(
                    Command::new("add")
                        .arg(req("date", "YYYY-MM-DD or DD/MM/YYYY"))
                        .arg(req("amount", "Positive amount"))
                        .arg(req("label", "Label"))
                        .arg(req("category", "Category name"))
                        .arg(
                            req("kind", "charge|recette")
                                .value_parser(["charge", "recette"]),
                        )
                        .arg(opt("project", "Project name"))
                        .arg(flag("paid", "Already paid/collected"))
                        .arg(opt("payment-date", "Payment date (defaults to date)")),
                )
                .subcommand(
                    Command::new("list")
                        .arg(opt("category", "Filter by category"))
                        .arg(opt("project", "Filter by project"))
                        .arg(opt("kind", "charge|recette").value_parser(["charge", "recette"]))
                        .arg(flag("paid", "Only paid"))
                        .arg(flag("unpaid", "Only unpaid").conflicts_with("paid"))
                        .arg(flag("included-only", "Only transactions counted in calculations"))
                        .arg(
                            flag("excluded-only", "Only transactions of excluded projects")
                                .conflicts_with("included-only"),
                        )
                        .arg(opt("from", "From date (inclusive)"))
                        .arg(opt("to", "To date (inclusive)"))
                        .arg(opt("paid-from", "Payment date from (inclusive)"))
                        .arg(opt("paid-to", "Payment date to (inclusive)"))
                        .arg(opt("limit", "Max rows").value_parser(value_parser!(usize)))
                        .args(json_args()),
                )
                .subcommand(Command::new("rm").arg(req("id", "Transaction id")))
                .subcommand(
                    Command::new("mark-paid")
                        .arg(req("id", "Transaction id"))
                        .arg(opt("date", "Payment date (defaults to today)")),
                )
                .subcommand(Command::new("mark-all-paid").about("Mark every transaction paid")),
        )
        .subcommand(
            Command::new("import")
                .about("Bulk import")
                .subcommand(
                    Command::new("transactions").arg(req("path", "CSV file")),
                ),
        )
        .subcommand(
            Command::new("export")
                .about("Export data")
                .subcommand(
                    Command::new("transactions")
                        .arg(req("format", "csv|json"))
                        .arg(req("out", "Output file"))
                        .arg(flag("included-only", "Only transactions counted in calculations")),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("Aggregated reports")
                .subcommand(
                    Command::new("summary")
                        .arg(period_arg())
                        .arg(all_projects_arg())
                        .args(json_args()),
                )
                .subcommand(
                    Command::new("projects")
                        .arg(period_arg())
                        .arg(all_projects_arg())
                        .args(json_args()),
                )
                .subcommand(
                    Command::new("categories")
                        .arg(period_arg())
                        .arg(all_projects_arg())
                        .args(json_args()),
                )
                .subcommand(
                    Command::new("dashboard")
                        .arg(all_projects_arg())
                        .args(json_args()),
                ),
        )
        .subcommand(
            Command::new("partner")
                .about("Partners and their profit shares")
                .subcommand(
                    Command::new("add")
                        .arg(req("name", "Partner name"))
                        .arg(req("share", "Share percentage")),
                )
                .subcommand(Command::new("list").args(json_args()))
                .subcommand(Command::new("rm").arg(req("name", "Partner name")))
                .subcommand(
                    Command::new("set-share")
                        .arg(req("name", "Partner name"))
                        .arg(req("share", "Share percentage")),
                ),
        )
        .subcommand(
            Command::new("payment")
                .about("Payouts to partners")
                .subcommand(
                    Command::new("add")
                        .arg(req("partner", "Partner name"))
                        .arg(req("amount", "Positive amount"))
                        .arg(opt("date", "Payment date (defaults to today)"))
                        .arg(opt("description", "Description")),
                )
                .subcommand(
                    Command::new("list")
                        .arg(opt("partner", "Filter by partner"))
                        .arg(
                            opt("limit", "Rows per page (0 = all)")
                                .value_parser(value_parser!(usize))
                                .default_value("0"),
                        )
                        .arg(
                            opt("page", "Page number")
                                .value_parser(value_parser!(usize))
                                .default_value("1"),
                        )
                        .args(json_args()),
                )
                .subcommand(Command::new("rm").arg(req("id", "Payment id"))),
        )
        .subcommand(
            Command::new("asset")
                .about("Fixed assets (immobilisations)")
                .subcommand(
                    Command::new("add")
                        .arg(req("name", "Asset name"))
                        .arg(req("price", "Total price"))
                        .arg(opt("date", "Acquisition date (defaults to today)"))
                        .arg(opt("description", "Description"))
                        .arg(
                            Arg::new("invest")
                                .long("invest")
                                .num_args(1)
                                .action(ArgAction::Append)
                                .help("PARTNER=AMOUNT, repeatable"),
                        ),
                )
                .subcommand(Command::new("list").args(json_args()))
                .subcommand(Command::new("rm").arg(req("id", "Asset id")))
                .subcommand(Command::new("balance").args(json_args())),
        )
        .subcommand(
            Command::new("invest")
                .about("Partner contributions to fixed assets")
                .subcommand(
                    Command::new("add")
                        .arg(req("partner", "Partner name"))
                        .arg(req("asset", "Asset name"))
                        .arg(req("amount", "Positive amount"))
                        .arg(opt("date", "Date (defaults to today)"))
                        .arg(opt("description", "Description")),
                )
                .subcommand(Command::new("list").args(json_args()))
                .subcommand(Command::new("rm").arg(req("id", "Investment id"))),
        )
        .subcommand(
            Command::new("settlement")
                .about("Partner profit settlement")
                .subcommand(Command::new("show").args(json_args()))
                .subcommand(Command::new("legacy").args(json_args()))
                .subcommand(
                    Command::new("export")
                        .arg(
                            opt("table", "primary|legacy")
                                .value_parser(["primary", "legacy"])
                                .default_value("primary"),
                        )
                        .arg(req("format", "csv|json"))
                        .arg(req("out", "Output file")),
                ),
        )
        .subcommand(
            Command::new("invoice")
                .about("Invoices")
                .subcommand(
                    Command::new("create")
                        .arg(req("client", "Client name"))
                        .arg(opt("ice", "Client ICE"))
                        .arg(opt("address", "Client address"))
                        .arg(opt("date", "Invoice date (defaults to today)"))
                        .arg(opt("number", "Invoice number (generated when omitted)"))
                        .arg(opt("from", "Billing period start"))
                        .arg(opt("to", "Billing period end"))
                        .arg(
                            Arg::new("line")
                                .long("line")
                                .num_args(1)
                                .action(ArgAction::Append)
                                .required(true)
                                .help("description;quantity;unit_price[;vat], repeatable"),
                        ),
                )
                .subcommand(Command::new("list").args(json_args()))
                .subcommand(
                    Command::new("show")
                        .arg(req("number", "Invoice number"))
                        .args(json_args()),
                )
                .subcommand(Command::new("rm").arg(req("number", "Invoice number")))
                .subcommand(
                    Command::new("export")
                        .arg(req("number", "Invoice number"))
                        .arg(req("format", "csv|json"))
                        .arg(req("out", "Output file")),
                ),
        )
        .subcommand(
            Command::new("todo")
                .about("Project task lists")
                .subcommand(
                    Command::new("add")
                        .arg(req("project", "Project name"))
                        .arg(req("due", "Due date"))
                        .arg(opt("description", "Description"))
                        .arg(opt("requirements", "Requirements"))
                        .arg(
                            Arg::new("step")
                                .long("step")
                                .num_args(1)
                                .action(ArgAction::Append)
                                .help("Step label, repeatable"),
                        ),
                )
                .subcommand(Command::new("list").args(json_args()))
                .subcommand(
                    Command::new("check")
                        .arg(req("id", "Task id"))
                        .arg(req("step", "Step number (1-based)").value_parser(value_parser!(usize)))
                        .arg(flag("undo", "Mark the step as not done")),
                )
                .subcommand(Command::new("rm").arg(req("id", "Task id"))),
        )
        .subcommand(Command::new("doctor").about("Consistency checks"))
}
