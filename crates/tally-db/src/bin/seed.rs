//! # Seed Data Generator
//!
//! Creates a demo tenant to try the ledger against.
//!
//! ## Usage
//! ```bash
//! # Seed ./tally_dev.db
//! cargo run -p tally-db --bin seed
//!
//! # Specify database path and tax rate
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db --tax-bps 1000
//! ```
//!
//! ## Generated Data
//! - One tenant with tax settings
//! - An admin and a staff user
//! - A cash drawer and a bank account
//! - Two customers, two suppliers
//! - A small grocery catalogue with opening stock

use std::env;
use tally_core::{AccountType, UserRole};
use tally_db::{Database, DbConfig, NewCounterparty, NewItem, NewPaymentAccount};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// (name, opening quantity, min stock, cost cents, price cents)
const ITEMS: &[(&str, i64, i64, i64, i64)] = &[
    ("Basmati Rice 5kg", 40, 10, 1450, 1899),
    ("Cooking Oil 1L", 60, 12, 520, 699),
    ("Sugar 1kg", 80, 20, 150, 199),
    ("Black Tea 500g", 25, 5, 610, 849),
    ("Lentils 1kg", 35, 10, 290, 399),
    ("Flour 10kg", 15, 5, 1100, 1399),
    ("Dish Soap", 50, 10, 180, 259),
    ("Matches (10 pack)", 100, 20, 40, 75),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./tally_dev.db");
    let mut tax_bps: u32 = 1000;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--tax-bps" | "-t" => {
                if i + 1 < args.len() {
                    tax_bps = args[i + 1].parse().unwrap_or(1000);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>      Database file path (default: ./tally_dev.db)");
                println!("  -t, --tax-bps <BPS>  Tenant tax rate in basis points (default: 1000)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(db = %db_path, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let tenant = db.tenants().create("Demo Traders").await?;
    db.tenants().upsert_settings(&tenant.id, tax_bps, "USD").await?;

    let admin = db.users().create(&tenant.id, "Demo Admin", UserRole::Admin).await?;
    db.users().create(&tenant.id, "Counter Staff", UserRole::Staff).await?;

    let cash = db
        .accounts()
        .create(&tenant.id, NewPaymentAccount::cash("Cash Drawer"))
        .await?;
    let bank = db
        .accounts()
        .create(
            &tenant.id,
            NewPaymentAccount {
                name: "Business Current Account".to_string(),
                account_type: AccountType::Bank,
                opening_balance_cents: 500_000,
                currency: "USD".to_string(),
            },
        )
        .await?;

    for name in ["Walk-in Regular", "Corner Cafe"] {
        db.customers().create(&tenant.id, NewCounterparty::named(name)).await?;
    }
    for name in ["City Wholesale", "Valley Mills"] {
        db.suppliers().create(&tenant.id, NewCounterparty::named(name)).await?;
    }

    for (name, quantity, min_stock, cost, price) in ITEMS {
        db.items()
            .create(
                &tenant.id,
                NewItem {
                    name: name.to_string(),
                    quantity: *quantity,
                    min_stock: *min_stock,
                    purchase_price_cents: *cost,
                    selling_price_cents: *price,
                    tax_rate_bps: 0,
                },
            )
            .await?;
    }

    println!();
    println!("✓ Seed complete!");
    println!("  Tenant:   {} ({})", tenant.name, tenant.id);
    println!("  Admin:    {} ({})", admin.name, admin.id);
    println!("  Accounts: {} / {}", cash.id, bank.id);
    println!("  Items:    {}", ITEMS.len());

    Ok(())
}
