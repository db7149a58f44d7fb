//! Fixtures shared by the repository and posting tests.

use tally_core::input::{CategoryInput, CustomerInput, ProductInput};
use tally_core::posting::{CreateItemRequest, CreateTransactionRequest};
use tally_core::{Category, CategoryType, Customer, Money, Product, TransactionType, User};

use crate::repository::NewUser;
use crate::{Database, DbConfig};

pub async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

pub async fn user(db: &Database, username: &str) -> User {
    db.users()
        .create(NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: "hash".to_string(),
            full_name: username.to_string(),
        })
        .await
        .unwrap()
}

pub async fn product(db: &Database, owner: i64, sku: &str, stock: i64, cost_cents: i64) -> Product {
    db.products()
        .create(
            owner,
            &ProductInput {
                name: format!("Product {}", sku),
                sku: sku.to_string(),
                description: None,
                purchase_price: Money::from_cents(cost_cents),
                selling_price: Money::from_cents(cost_cents * 2),
                stock,
                min_stock: 2,
            },
        )
        .await
        .unwrap()
}

pub async fn customer(db: &Database, owner: i64, name: &str) -> Customer {
    db.customers()
        .create(
            owner,
            &CustomerInput {
                name: name.to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap()
}

pub async fn category(db: &Database, owner: i64, name: &str, t: CategoryType) -> Category {
    db.categories()
        .create(
            owner,
            &CategoryInput {
                name: name.to_string(),
                category_type: t,
            },
        )
        .await
        .unwrap()
}

pub fn line(product_id: Option<i64>, name: &str, quantity: i64, unit_cents: i64) -> CreateItemRequest {
    CreateItemRequest {
        product_id,
        product_name: name.to_string(),
        quantity,
        unit_price: Money::from_cents(unit_cents),
    }
}

pub fn request(t: TransactionType, items: Vec<CreateItemRequest>) -> CreateTransactionRequest {
    CreateTransactionRequest {
        transaction_type: Some(t),
        items,
        ..Default::default()
    }
}

pub fn capital(amount_cents: i64) -> CreateTransactionRequest {
    CreateTransactionRequest {
        transaction_type: Some(TransactionType::Capital),
        total_amount: Some(Money::from_cents(amount_cents)),
        ..Default::default()
    }
}
