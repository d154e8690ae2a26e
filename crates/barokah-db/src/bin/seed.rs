//! # Seed Data Generator
//!
//! Populates a development database with a building-materials catalog and a
//! handful of customers.
//!
//! ## Usage
//! ```bash
//! # Default catalog into ./barokah_dev.db
//! cargo run -p barokah-db --bin seed
//!
//! # Specify database path, and a customer whose birthday is today
//! cargo run -p barokah-db --bin seed -- --db ./data/barokah.db --birthday-today
//! ```
//!
//! ## Generated Data
//! - Categories: cement, bricks, sand & aggregate, paint, steel, roofing
//! - Each product in a few pack sizes, stock between 0 and 500
//! - Three customers; with `--birthday-today` the first one's birthday is today

use chrono::{Datelike, NaiveDate, Utc};
use std::env;

use barokah_core::{new_id, Category, Customer, Money, Product};
use barokah_db::{Database, DbConfig};

/// Catalog: (category, [(product, base price in rupiah)])
const CATALOG: &[(&str, &[(&str, i64)])] = &[
    (
        "Semen",
        &[
            ("Semen Gresik", 62_000),
            ("Semen Tiga Roda", 64_000),
            ("Semen Holcim", 66_000),
            ("Semen Putih", 95_000),
        ],
    ),
    (
        "Bata & Batako",
        &[
            ("Bata Merah", 800),
            ("Bata Ringan Hebel", 9_500),
            ("Batako Press", 3_200),
            ("Paving Block", 4_500),
        ],
    ),
    (
        "Pasir & Agregat",
        &[
            ("Pasir Merapi", 250_000),
            ("Pasir Beton", 280_000),
            ("Kerikil Split", 310_000),
            ("Batu Kali", 220_000),
        ],
    ),
    (
        "Cat",
        &[
            ("Cat Tembok Dulux", 120_000),
            ("Cat Tembok Avian", 95_000),
            ("Cat Kayu Besi", 85_000),
            ("Plamir Tembok", 45_000),
        ],
    ),
    (
        "Besi & Baja",
        &[
            ("Besi Beton 8mm", 48_000),
            ("Besi Beton 10mm", 72_000),
            ("Besi Beton 12mm", 105_000),
            ("Wiremesh M6", 310_000),
        ],
    ),
    (
        "Atap",
        &[
            ("Genteng Keramik", 7_500),
            ("Seng Gelombang", 65_000),
            ("Spandek 0.3mm", 58_000),
            ("Baja Ringan C75", 95_000),
        ],
    ),
];

/// Pack sizes: (suffix, price multiplier)
const SIZES: &[(&str, i64)] = &[("", 1), ("(isi 10)", 10), ("(isi 50)", 48)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./barokah_dev.db");
    let mut birthday_today = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--birthday-today" => birthday_today = true,
            "--help" | "-h" => {
                println!("Barokah Commerce Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>      Database file path (default: ./barokah_dev.db)");
                println!("      --birthday-today Give the first customer a birthday today");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Barokah Commerce Seed Data Generator");
    println!("====================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0usize;

    for (category_idx, (category_name, products)) in CATALOG.iter().enumerate() {
        let category = Category {
            id: new_id(),
            name: category_name.to_string(),
        };
        db.products().insert_category(&category).await?;

        for (product_idx, (product_name, base_price)) in products.iter().enumerate() {
            for (size_idx, (size, multiplier)) in SIZES.iter().enumerate() {
                let seed = category_idx * 100 + product_idx * 10 + size_idx;
                let product = generate_product(&category.id, product_name, size, base_price * multiplier, seed);

                if let Err(e) = db.products().insert(&product).await {
                    eprintln!("Failed to insert {}: {}", product.name, e);
                    continue;
                }
                generated += 1;
            }
        }
    }

    println!("✓ Generated {} products in {:?}", generated, start.elapsed());

    let today = Utc::now().date_naive();
    let customers = [
        ("Budi Santoso", "budi", birthday_on(today, birthday_today, 1988, 8, 17)),
        ("Siti Rahayu", "siti", NaiveDate::from_ymd_opt(1992, 2, 29).unwrap_or_default()),
        ("Agus Wijaya", "agus", NaiveDate::from_ymd_opt(1979, 11, 3).unwrap_or_default()),
    ];

    for (name, username, birth_date) in customers {
        let customer = Customer {
            id: new_id(),
            name: name.to_string(),
            username: username.to_string(),
            address: format!("Jl. Kaliurang Km {}, Sleman", username.len() + 3),
            phone: Some(format!("0812{:08}", username.len() * 1_234_567)),
            birth_date,
            created_at: Utc::now(),
        };
        db.customers().insert(&customer).await?;
        println!("  Customer {} (birthday {})", customer.username, customer.birth_date);
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Today's month/day in `year` when requested, otherwise the given date.
fn birthday_on(today: NaiveDate, use_today: bool, year: i32, month: u32, day: u32) -> NaiveDate {
    let (month, day) = if use_today { (today.month(), today.day()) } else { (month, day) };
    NaiveDate::from_ymd_opt(year, month, day)
        // Feb 29 in a non-leap birth year
        .or_else(|| NaiveDate::from_ymd_opt(year, month, day - 1))
        .unwrap_or(today)
}

/// Generates a single product with deterministic pseudo-random stock.
fn generate_product(category_id: &str, name: &str, size: &str, price_rupiah: i64, seed: usize) -> Product {
    let now = Utc::now();

    let full_name = if size.is_empty() {
        name.to_string()
    } else {
        format!("{} {}", name, size)
    };

    // Every seventh product starts out of stock, for restock demos
    let stock = if seed % 7 == 0 { 0 } else { ((seed * 37) % 500) as i64 + 1 };

    Product {
        id: new_id(),
        name: full_name,
        description: None,
        price_cents: Money::from_major(price_rupiah).cents(),
        stock,
        category_id: Some(category_id.to_string()),
        created_at: now,
        updated_at: now,
    }
}
