//! # Seed Data Generator
//!
//! Installs starter tariffs for a tenant so a fresh database can take
//! check-ins right away.
//!
//! ## Usage
//! ```bash
//! # Default tenant, ./data/parking.db
//! cargo run -p parking-db --bin seed
//!
//! # Specific tenant and database
//! cargo run -p parking-db --bin seed -- --tenant lot-42 --db ./data/lot42.db
//! ```
//!
//! ## Installed Tariffs
//! - car: mixed (2.00/min, 15.00/h after 60 min, 100.00/day after 24 h)
//! - motorcycle: hourly 8.00, rounded up
//! - bicycle: daily 5.00, rounded up
//!
//! Categories that already have an active rule are left alone.

use chrono::Utc;
use parking_core::{BillingMode, Money, Rounding, TariffDraft};
use parking_db::{Database, DbConfig};
use std::env;

const DEFAULT_TENANT: &str = "00000000-0000-0000-0000-000000000001";

/// (category, mode, per minute, per hour, per day, min→hour, hour→day)
const TARIFFS: &[(&str, BillingMode, i64, i64, i64, i64, i64)] = &[
    ("car", BillingMode::Mixed, 200, 1500, 10000, 60, 24),
    ("motorcycle", BillingMode::Hour, 0, 800, 0, 0, 0),
    ("bicycle", BillingMode::Day, 0, 0, 500, 0, 0),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./data/parking.db");
    let mut tenant_id = String::from(DEFAULT_TENANT);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--tenant" | "-t" => {
                if i + 1 < args.len() {
                    tenant_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Parking Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       Database file path (default: ./data/parking.db)");
                println!("  -t, --tenant <ID>     Tenant id (default: {})", DEFAULT_TENANT);
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Parking Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Tenant:   {}", tenant_id);
    println!();

    if let Some(parent) = std::path::Path::new(&db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");
    println!();

    let existing = db.tariffs().list_active(&tenant_id).await?;

    for (category, mode, per_minute, per_hour, per_day, to_hours, to_days) in TARIFFS {
        if existing.iter().any(|r| r.category == *category) {
            println!("  - {} already priced, skipping", category);
            continue;
        }

        let draft = TariffDraft {
            category: category.to_string(),
            billing_mode: *mode,
            per_minute_rate: Money::from_minor(*per_minute),
            per_hour_rate: Money::from_minor(*per_hour),
            per_day_rate: Money::from_minor(*per_day),
            minutes_to_hours_threshold: *to_hours,
            hours_to_days_threshold: *to_days,
            hour_rounding: Rounding::Up,
            day_rounding: Rounding::Up,
        };

        match db.tariffs().replace_active(&tenant_id, draft, Utc::now()).await {
            Ok(rule) => println!("  ✓ {} ({:?}) → {}", category, rule.billing_mode, rule.id),
            Err(e) => eprintln!("  ✗ {}: {}", category, e),
        }
    }

    println!();
    let active = db.tariffs().list_active(&tenant_id).await?;
    println!("Active tariffs: {}", active.len());
    println!("✓ Seed complete!");

    Ok(())
}
