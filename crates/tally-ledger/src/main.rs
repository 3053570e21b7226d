//! # tally-report
//!
//! Prints counterparty statements, the receivables aging report and the
//! tax summary as JSON.
//!
//! ## Usage
//! ```bash
//! tally-report --tenant <ID> customer <CUSTOMER_ID>
//! tally-report --tenant <ID> supplier <SUPPLIER_ID>
//! tally-report --tenant <ID> aging [--as-of 2026-06-30]
//! tally-report --tenant <ID> tax [--from 2026-06-01] [--to 2026-06-30]
//!
//! # Another config file (defaults to ./tally.toml, TALLY__* env always applies)
//! tally-report --config /etc/tally.toml --tenant <ID> aging
//! ```

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde_json::json;
use std::env;
use std::process::ExitCode;
use tally_core::ledger::closing_balance;
use tally_ledger::config::DEFAULT_CONFIG_FILE;
use tally_ledger::telemetry::init_tracing;
use tally_ledger::{Actor, LedgerConfig, LedgerError, LedgerService};
use tracing::debug;

const REPORT_USER: &str = "tally-report";

enum Report {
    Customer(String),
    Supplier(String),
    Aging(DateTime<Utc>),
    Tax { from: NaiveDate, to: NaiveDate },
}

struct Args {
    config_path: String,
    tenant_id: String,
    report: Report,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let body = match err.downcast_ref::<LedgerError>() {
                Some(ledger) => json!({ "error": ledger.code(), "message": ledger.to_string() }),
                None => json!({ "error": "USAGE", "message": format!("{err:#}") }),
            };
            eprintln!("{body}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let Some(args) = parse_args(env::args().skip(1).collect())? else {
        print_help();
        return Ok(());
    };

    let config = LedgerConfig::load_from(&args.config_path)
        .with_context(|| format!("loading configuration from {}", args.config_path))?;
    debug!(path = %config.database_path.display(), "Opening ledger database");

    let service = LedgerService::connect(config).await?;
    let actor = Actor::new(args.tenant_id, REPORT_USER);

    let output = match args.report {
        Report::Customer(id) => {
            let entries = service.customer_ledger(&actor, &id).await?;
            json!({
                "customer_id": id,
                "closing_balance": closing_balance(&entries),
                "entries": entries,
            })
        }
        Report::Supplier(id) => {
            let entries = service.supplier_ledger(&actor, &id).await?;
            json!({
                "supplier_id": id,
                "closing_balance": closing_balance(&entries),
                "entries": entries,
            })
        }
        Report::Aging(as_of) => serde_json::to_value(service.receivables_aging(&actor, as_of).await?)?,
        Report::Tax { from, to } => serde_json::to_value(service.tax_summary(&actor, from, to).await?)?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    service.database().close().await;
    Ok(())
}

/// `Ok(None)` means help was requested.
fn parse_args(args: Vec<String>) -> anyhow::Result<Option<Args>> {
    let mut config_path = DEFAULT_CONFIG_FILE.to_string();
    let mut tenant_id = None;
    let mut as_of = None;
    let mut from = None;
    let mut to = None;
    let mut positional = Vec::new();

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                config_path = iter.next().ok_or_else(|| anyhow!("--config needs a path"))?;
            }
            "--tenant" | "-t" => {
                tenant_id = Some(iter.next().ok_or_else(|| anyhow!("--tenant needs an id"))?);
            }
            "--as-of" => {
                let raw = iter.next().ok_or_else(|| anyhow!("--as-of needs a date"))?;
                as_of = Some(parse_date(&raw)?);
            }
            "--from" => {
                let raw = iter.next().ok_or_else(|| anyhow!("--from needs a date"))?;
                from = Some(parse_day(&raw)?);
            }
            "--to" => {
                let raw = iter.next().ok_or_else(|| anyhow!("--to needs a date"))?;
                to = Some(parse_day(&raw)?);
            }
            "--help" | "-h" => return Ok(None),
            _ => positional.push(arg),
        }
    }

    let tenant_id = tenant_id.ok_or_else(|| anyhow!("--tenant is required"))?;
    let report = match positional.as_slice() {
        [kind, id] if kind == "customer" => Report::Customer(id.clone()),
        [kind, id] if kind == "supplier" => Report::Supplier(id.clone()),
        [kind] if kind == "aging" => Report::Aging(as_of.unwrap_or_else(Utc::now)),
        [kind] if kind == "tax" => {
            // Month to date unless told otherwise
            let today = Utc::now().date_naive();
            let to = to.unwrap_or(today);
            let from = match from {
                Some(from) => from,
                None => to
                    .with_day(1)
                    .ok_or_else(|| anyhow!("no first day of month for {to}"))?,
            };
            Report::Tax { from, to }
        }
        [] => return Ok(None),
        other => bail!("unrecognised report: {}", other.join(" ")),
    };

    Ok(Some(Args {
        config_path,
        tenant_id,
        report,
    }))
}

fn parse_day(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{raw}', expected YYYY-MM-DD"))
}

fn parse_date(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    let date = parse_day(raw)?;
    let end_of_day = date
        .and_hms_opt(23, 59, 59)
        .ok_or_else(|| anyhow!("invalid date '{raw}'"))?;
    Ok(end_of_day.and_utc())
}

fn print_help() {
    println!("Tally ledger reports");
    println!();
    println!("Usage: tally-report [OPTIONS] --tenant <ID> <REPORT>");
    println!();
    println!("Reports:");
    println!("  customer <ID>        Customer statement with running balance");
    println!("  supplier <ID>        Supplier statement with running balance");
    println!("  aging                Receivables aging buckets");
    println!("  tax                  Input, output and net tax for a date range");
    println!();
    println!("Options:");
    println!("  -t, --tenant <ID>    Tenant to report on");
    println!("  -c, --config <PATH>  Config file (default: ./tally.toml)");
    println!("      --as-of <DATE>   Aging cut-off, YYYY-MM-DD (default: now)");
    println!("      --from <DATE>    First day of the tax period (default: start of month)");
    println!("      --to <DATE>      Last day of the tax period (default: today)");
    println!("  -h, --help           Show this help message");
}
