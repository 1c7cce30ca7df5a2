//! # Seed Data Generator
//!
//! Populates a till database with a sample catalog and opening note stock.
//!
//! ## Usage
//! ```bash
//! # Sample catalog, empty till
//! cargo run -p till-db --bin seed
//!
//! # Opening float
//! cargo run -p till-db --bin seed -- --notes 10:20,5:20,2:50,1:50
//!
//! # Specify database path
//! cargo run -p till-db --bin seed -- --db ./data/till.db
//! ```
//!
//! Re-running is safe: catalog rows are upserted and only the denominations
//! named in `--notes` are touched.

use std::env;
use till_core::validation::{validate_price_minor, validate_product_id, validate_tax_rate_bps};
use till_core::{CatalogEntry, Denomination, Money, TaxRate};
use till_db::{Database, DbConfig};

/// (product_id, name, unit price in minor units, tax rate in bps)
const CATALOG: &[(&str, &str, i64, u32)] = &[
    ("P1", "Notebook A5", 10000, 1800),
    ("P2", "Ballpoint Pen", 1250, 1200),
    ("P3", "Stapler", 24999, 1800),
    ("P4", "Printer Paper 500 Sheets", 38500, 1200),
    ("P5", "Highlighter Set", 8975, 1800),
    ("P6", "Sticky Notes", 4550, 500),
    ("P7", "Geometry Box", 15000, 1200),
    ("P8", "Water Bottle", 19900, 0),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./till_dev.db");
    let mut notes: Vec<(Denomination, u32)> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--notes" | "-n" => {
                if i + 1 < args.len() {
                    notes = parse_notes(&args[i + 1])?;
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Till Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        Database file path (default: ./till_dev.db)");
                println!("  -n, --notes <LIST>     Opening stock, e.g. 10:20,5:20,2:50");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Till Seed Data Generator");
    println!("========================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    for (product_id, name, price_minor, bps) in CATALOG {
        validate_product_id(product_id)?;
        validate_price_minor(*price_minor)?;
        validate_tax_rate_bps(*bps)?;

        let entry = CatalogEntry {
            product_id: product_id.to_string(),
            name: name.to_string(),
            unit_price: Money::from_minor(*price_minor),
            tax_rate: TaxRate::from_bps(*bps),
        };
        db.catalog().upsert(&entry).await?;
    }
    println!("✓ Catalog: {} products", db.catalog().count().await?);

    for (denomination, count) in &notes {
        db.denominations().restock(*denomination, *count).await?;
    }

    println!();
    println!("Till:");
    let till = db.denominations().snapshot().await?;
    for (denomination, count) in till.iter() {
        println!("  {:>4} × {}", denomination, count);
    }
    println!("  total {}", till.total_money());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Parses `10:20,5:20` into `(denomination, count)` pairs.
fn parse_notes(raw: &str) -> Result<Vec<(Denomination, u32)>, Box<dyn std::error::Error>> {
    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            let (value, count) = part
                .split_once(':')
                .ok_or_else(|| format!("expected VALUE:COUNT, got '{part}'"))?;
            let denomination = Denomination::try_from(value.trim().parse::<u32>()?)?;
            Ok((denomination, count.trim().parse::<u32>()?))
        })
        .collect()
}
