//! # Seed Data Generator
//!
//! Populates a database with a catalog and a day of trading, so the ledger
//! has every kind of movement in it.
//!
//! ## Usage
//! ```bash
//! # 200 products, 50 sales (defaults)
//! cargo run -p stockbook-engine --bin seed
//!
//! # Custom amounts and file
//! cargo run -p stockbook-engine --bin seed -- --count 1000 --sales 300 --db ./data/stockbook.db
//! ```
//!
//! ## What Gets Written
//! ```text
//! register_product × count    IN  opening-stock
//! create_sale      × sales    OUT sale:<id>            (1-3 lines each)
//! create_return    every 5th  IN  return:<id>
//! adjust_stock     every 7th  IN  "weekly delivery"
//! ```
//! Finally every product is reconciled against its ledger.

use std::env;
use std::process::ExitCode;

use stockbook_core::{
    ActorId, MovementFilter, NewProduct, NewReturn, SaleLineRequest, StockAdjustment,
};
use stockbook_engine::{init_tracing, EngineResult, MovementEngine, StockbookConfig};
use tracing::{info, warn};

/// Catalog families: SKU prefix, base price in cents, item names.
const CATEGORIES: &[(&str, i64, &[&str])] = &[
    (
        "BEV",
        120,
        &["Cola", "Lemon Soda", "Sparkling Water", "Iced Tea", "Orange Juice", "Energy Drink"],
    ),
    (
        "SNK",
        90,
        &["Salted Chips", "Pretzels", "Chocolate Bar", "Trail Mix", "Popcorn", "Crackers"],
    ),
    (
        "DRY",
        250,
        &["Whole Milk", "Greek Yogurt", "Cheddar", "Butter", "Eggs Dozen", "Cream Cheese"],
    ),
    (
        "GRO",
        180,
        &["Spaghetti", "Basmati Rice", "Canned Beans", "Peanut Butter", "Oats", "Honey"],
    ),
];

const SIZES: &[(&str, i64)] = &[("Small", 0), ("Regular", 60), ("Large", 140), ("Family", 320)];

struct SeedArgs {
    count: usize,
    sales: usize,
    db_path: Option<String>,
}

fn parse_args() -> Option<SeedArgs> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = SeedArgs {
        count: 200,
        sales: 50,
        db_path: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if let Some(value) = args.get(i + 1) {
                    parsed.count = value.parse().unwrap_or(parsed.count);
                    i += 1;
                }
            }
            "--sales" | "-s" => {
                if let Some(value) = args.get(i + 1) {
                    parsed.sales = value.parse().unwrap_or(parsed.sales);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if let Some(value) = args.get(i + 1) {
                    parsed.db_path = Some(value.clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to register (default: 200)");
                println!("  -s, --sales <N>    Number of sales to simulate (default: 50)");
                println!("  -d, --db <PATH>    Database file (default: STOCKBOOK_DATABASE_PATH)");
                println!("  -h, --help         Show this help message");
                return None;
            }
            other => warn!(argument = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    Some(parsed)
}

#[tokio::main]
async fn main() -> ExitCode {
    let mut config = match StockbookConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.log_filter);

    let Some(args) = parse_args() else {
        return ExitCode::SUCCESS;
    };
    if let Some(path) = &args.db_path {
        config.database_path = path.into();
    }

    match seed(&config, &args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Seed failed: {}", e.to_payload().message);
            ExitCode::FAILURE
        }
    }
}

async fn seed(config: &StockbookConfig, args: &SeedArgs) -> EngineResult<()> {
    println!("🌱 Stockbook Seed Data Generator");
    println!("================================");
    println!("Database: {}", config.database_path.display());
    println!("Products: {}", args.count);
    println!("Sales:    {}", args.sales);
    println!();

    let engine = MovementEngine::from_config(config).await?;
    let existing = engine.database().products().list().await?.len();
    if existing > 0 {
        println!("⚠ Database already has {existing} products");
        println!("  Skipping seed to avoid duplicate SKUs.");
        return Ok(());
    }

    let manager = ActorId::new("seed-manager");
    let cashier = ActorId::new("seed-cashier");
    let start = std::time::Instant::now();

    let mut product_ids = Vec::with_capacity(args.count);
    'catalog: for (code, base_price, names) in CATEGORIES {
        for (name_idx, name) in names.iter().enumerate() {
            for (size_idx, (size, price_addon)) in SIZES.iter().enumerate() {
                if product_ids.len() >= args.count {
                    break 'catalog;
                }
                let n = product_ids.len();
                let new_product = generate_product(name, size, base_price + price_addon, n)
                    .sku(format!("{code}-{name_idx:02}{size_idx:02}-{n:05}"));
                let product = engine.register_product(&new_product, &manager).await?;
                product_ids.push(product.id);
            }
        }
    }
    println!("✓ Registered {} products", product_ids.len());

    if product_ids.is_empty() {
        return Ok(());
    }

    let walk_in = engine.register_customer("Walk-in", None, None).await?;

    let mut sold = 0;
    let mut rejected = 0;
    let mut returned = 0;
    for i in 0..args.sales {
        let lines: Vec<SaleLineRequest> = (0..(i % 3 + 1))
            .map(|k| {
                let product_id = &product_ids[(i * 7 + k * 13) % product_ids.len()];
                SaleLineRequest::new(product_id, (i % 4 + 1) as i64)
            })
            .collect();

        let sale = match engine.create_sale(&walk_in.id, &lines, &cashier).await {
            Ok(sale) => sale,
            Err(e) => {
                info!(error = %e, "Simulated sale rejected");
                rejected += 1;
                continue;
            }
        };
        sold += 1;

        if i % 5 == 0 {
            let line = &sale.lines[0];
            let request = NewReturn::new(&sale.id, &line.product_id, 1, line.price_at_sale_cents)
                .reason("changed mind");
            engine.create_return(&request, &cashier).await?;
            returned += 1;
        }

        if i % 7 == 0 {
            let restock = StockAdjustment::stock_in(&lines[0].product_id, 24, "weekly delivery");
            engine.adjust_stock(&restock, &manager).await?;
        }
    }
    println!("✓ Simulated {sold} sales ({rejected} rejected), {returned} returns");

    let mut inconsistent = 0;
    for id in &product_ids {
        if !engine.reconcile(id).await?.is_consistent() {
            inconsistent += 1;
        }
    }

    let entries = engine
        .list_movements(&MovementFilter::all())
        .await?
        .len();

    println!();
    println!("✓ Ledger holds {entries} entries, {inconsistent} products out of step");
    println!("✓ Seed complete in {:?}", start.elapsed());

    engine.database().close().await;
    Ok(())
}

/// Builds catalog data for one product; prices and stock vary with `seed`.
fn generate_product(
    name: &str,
    size: &str,
    list_price_cents: i64,
    seed: usize,
) -> NewProduct {
    let sale_price_cents = list_price_cents + ((seed * 17) % 400) as i64;
    let cost_pct = 55 + (seed % 25) as i64;

    NewProduct::new(format!("{name} {size}"), sale_price_cents)
        .purchase_price_cents(sale_price_cents * cost_pct / 100)
        .opening_quantity((seed % 61) as i64)
        .low_stock_alert(5 + (seed % 6) as i64)
}
