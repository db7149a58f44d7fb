//! # Seed Data Generator
//!
//! Populates the database with a demo account and a month of bookkeeping.
//!
//! ## Usage
//! ```bash
//! # 30 days of history (default)
//! cargo run -p tally-db --bin seed
//!
//! # Longer history
//! cargo run -p tally-db --bin seed -- --days 90
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//! ```
//!
//! ## Generated Data
//! - User `demo` / password `demo123`
//! - Income and expense categories
//! - A handful of customers and suppliers
//! - Products with purchase/selling prices and stock
//! - An opening capital deposit, then daily sales and periodic restocks
//!   posted through the real Transaction Poster (stock and COGS included)
//! - A few unpaid receivables and payables, some already overdue

use std::env;

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHasher,
};
use chrono::{Duration, Utc};
use tally_core::input::{CategoryInput, CustomerInput, ProductInput};
use tally_core::posting::{CreateItemRequest, CreateTransactionRequest};
use tally_core::{CategoryType, Money, PaymentStatus, Product, TransactionType};
use tally_db::{Database, DbConfig, NewUser};

const DEMO_USERNAME: &str = "demo";
const DEMO_PASSWORD: &str = "demo123";

/// (name, sku, purchase price, selling price, opening stock, min stock), in cents
const PRODUCTS: &[(&str, &str, i64, i64, i64, i64)] = &[
    ("Kopi Susu Gula Aren", "KOPI-01", 800_000, 1_800_000, 60, 10),
    ("Es Teh Manis", "TEH-01", 200_000, 500_000, 80, 15),
    ("Roti Bakar Cokelat", "ROTI-01", 900_000, 2_000_000, 30, 5),
    ("Nasi Goreng Spesial", "NASI-01", 1_200_000, 2_500_000, 25, 5),
    ("Air Mineral 600ml", "AIR-01", 250_000, 400_000, 100, 20),
    ("Kentang Goreng", "SNK-01", 700_000, 1_500_000, 40, 8),
    ("Pisang Goreng", "SNK-02", 300_000, 1_000_000, 6, 8),
    ("Mie Rebus Telur", "MIE-01", 600_000, 1_500_000, 35, 5),
];

const CUSTOMERS: &[&str] = &["Pak Budi", "Bu Ani", "CV Maju Jaya", "Toko Grosir Sentosa"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut days: i64 = 30;
    let mut db_path = String::from("./tally_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--days" | "-n" => {
                if i + 1 < args.len() {
                    days = args[i + 1].parse().unwrap_or(30);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --days <N>     Days of history to generate (default: 30)");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tally Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Days:     {}", days);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if db.users().get_by_username(DEMO_USERNAME).await?.is_some() {
        println!("⚠ User '{}' already exists", DEMO_USERNAME);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(DEMO_PASSWORD.as_bytes(), &salt)
        .map_err(|e| format!("Failed to hash password: {}", e))?
        .to_string();

    let user = db
        .users()
        .create(NewUser {
            username: DEMO_USERNAME.to_string(),
            email: "demo@tally.local".to_string(),
            password_hash,
            full_name: "Warung Demo".to_string(),
        })
        .await?;
    println!("✓ Created user '{}' (password: {})", user.username, DEMO_PASSWORD);

    // Master data
    let sales = db
        .categories()
        .create(user.id, &category("Penjualan", CategoryType::Income))
        .await?;
    let supplies = db
        .categories()
        .create(user.id, &category("Bahan Baku", CategoryType::Expense))
        .await?;
    let operations = db
        .categories()
        .create(user.id, &category("Operasional", CategoryType::Expense))
        .await?;
    println!("✓ Created 3 categories");

    let mut customers = Vec::with_capacity(CUSTOMERS.len());
    for name in CUSTOMERS {
        let input = CustomerInput {
            name: name.to_string(),
            ..Default::default()
        };
        customers.push(db.customers().create(user.id, &input).await?);
    }
    println!("✓ Created {} customers", customers.len());

    let mut products: Vec<Product> = Vec::with_capacity(PRODUCTS.len());
    for (name, sku, cost, price, stock, min_stock) in PRODUCTS {
        let input = ProductInput {
            name: name.to_string(),
            sku: sku.to_string(),
            description: None,
            purchase_price: Money::from_cents(*cost),
            selling_price: Money::from_cents(*price),
            stock: *stock,
            min_stock: *min_stock,
        };
        products.push(db.products().create(user.id, &input).await?);
    }
    println!("✓ Created {} products", products.len());

    // History
    println!();
    println!("Posting transactions...");

    let start = std::time::Instant::now();
    let poster = db.poster();
    let opening = Utc::now() - Duration::days(days);
    let mut posted = 0usize;
    let mut skipped = 0usize;

    let mut deposit = request(TransactionType::Capital, Vec::new());
    deposit.total_amount = Some(Money::from_cents(500_000_000));
    deposit.notes = Some("Modal awal".to_string());
    poster.post_at(user.id, &deposit, opening).await?;
    posted += 1;

    for day in 0..days {
        let base = opening + Duration::days(day) + Duration::hours(8);

        // 1-3 sales a day
        for n in 0..(1 + (day % 3)) {
            let idx = ((day * 7 + n * 3) as usize) % products.len();
            let p = &products[idx];
            let qty = 1 + ((day + n) % 4);
            let mut req = request(
                TransactionType::Income,
                vec![item(Some(p.id), "", qty, p.selling_price)],
            );
            req.category_id = Some(sales.id);

            // Every ninth sale is on credit
            if (day + n) % 9 == 0 {
                let c = &customers[(day as usize) % 2];
                req.customer_id = Some(c.id);
                req.payment_status = Some(PaymentStatus::Unpaid);
                req.due_date = Some((base + Duration::days(14)).format("%Y-%m-%d").to_string());
            }

            match poster.post_at(user.id, &req, base + Duration::hours(n * 3)).await {
                Ok(_) => posted += 1,
                Err(e) => {
                    skipped += 1;
                    eprintln!("  Skipped sale of {}: {}", p.sku, e);
                }
            }
        }

        // Weekly restock from the supplier
        if day % 7 == 3 {
            let lines: Vec<CreateItemRequest> = products
                .iter()
                .take(4)
                .map(|p| item(Some(p.id), "", 10, p.purchase_price))
                .collect();
            let mut req = request(TransactionType::Expense, lines);
            req.category_id = Some(supplies.id);
            req.customer_id = Some(customers[3].id);
            if day % 14 == 3 {
                req.payment_status = Some(PaymentStatus::Unpaid);
                req.due_date = Some((base + Duration::days(7)).format("%Y-%m-%d").to_string());
            }
            poster.post_at(user.id, &req, base + Duration::hours(1)).await?;
            posted += 1;
        }

        // Monthly overheads
        if day % 30 == 0 {
            let mut req = request(
                TransactionType::Expense,
                vec![
                    item(None, "Sewa tempat", 1, Money::from_cents(150_000_000)),
                    item(None, "Listrik", 1, Money::from_cents(45_000_000)),
                ],
            );
            req.category_id = Some(operations.id);
            poster.post_at(user.id, &req, base + Duration::hours(2)).await?;
            posted += 1;
        }

        if day > 0 && day % 10 == 0 {
            println!("  Day {}: {} transactions so far...", day, posted);
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Posted {} transactions in {:?}", posted, elapsed);
    if skipped > 0 {
        println!("  ({} sales skipped for insufficient stock)", skipped);
    }

    // Quick look at the result
    let low = db.reports().low_stock(user.id).await?;
    println!("  Low stock products: {}", low.len());
    let unpaid = db.reports().unpaid(user.id, Utc::now().date_naive()).await?;
    println!(
        "  Receivables: {} ({}), payables: {} ({})",
        unpaid.receivables.len(),
        unpaid.total_receivable,
        unpaid.payables.len(),
        unpaid.total_payable
    );

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn category(name: &str, category_type: CategoryType) -> CategoryInput {
    CategoryInput {
        name: name.to_string(),
        category_type,
    }
}

fn item(product_id: Option<i64>, name: &str, quantity: i64, unit_price: Money) -> CreateItemRequest {
    CreateItemRequest {
        product_id,
        product_name: name.to_string(),
        quantity,
        unit_price,
    }
}

fn request(transaction_type: TransactionType, items: Vec<CreateItemRequest>) -> CreateTransactionRequest {
    CreateTransactionRequest {
        transaction_type: Some(transaction_type),
        items,
        ..Default::default()
    }
}
