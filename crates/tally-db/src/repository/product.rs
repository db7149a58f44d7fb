//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Owner-scoped CRUD with optimistic locking
//! - Substring search over name and SKU
//! - Row fetch usable inside the posting unit ([`fetch_live`])
//!
//! Stock is written here only through [`ProductRepository::update`] (a
//! manual correction). Posting adjusts stock inside its own unit.

use chrono::Utc;
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::time::{from_millis, to_millis};
use tally_core::input::{blank_to_none, ProductInput};
use tally_core::validation::validate_search_query;
use tally_core::{authorize, CoreError, Money, Product, ValidationError};

#[derive(Debug, FromRow)]
struct ProductRow {
    id: i64,
    user_id: i64,
    name: String,
    sku: String,
    description: Option<String>,
    purchase_price_cents: Money,
    selling_price_cents: Money,
    stock: i64,
    min_stock: i64,
    version: i64,
    created_at: i64,
    updated_at: i64,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            sku: row.sku,
            description: row.description,
            purchase_price: row.purchase_price_cents,
            selling_price: row.selling_price_cents,
            stock: row.stock,
            min_stock: row.min_stock,
            version: row.version,
            created_at: from_millis(row.created_at),
            updated_at: from_millis(row.updated_at),
        }
    }
}

pub(crate) const PRODUCT_COLUMNS: &str = "id, user_id, name, sku, description, \
     purchase_price_cents, selling_price_cents, stock, min_stock, version, created_at, updated_at";

/// Loads a live (not soft-deleted) product by id on any executor.
pub(crate) async fn fetch_live<'e, E>(executor: E, id: i64) -> DbResult<Option<Product>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(row.map(Product::from))
}

/// Live products whose stock is at or below `min_stock`.
pub(crate) async fn fetch_low_stock<'e, E>(executor: E, owner_id: i64) -> DbResult<Vec<Product>>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products
         WHERE user_id = ?1 AND deleted_at IS NULL AND stock <= min_stock"
    ))
    .bind(owner_id)
    .fetch_all(executor)
    .await?;
    Ok(rows.into_iter().map(Product::from).collect())
}

/// Writes a posting's stock result back to a locked product row.
pub(crate) async fn write_stock<'e, E>(executor: E, id: i64, stock: i64, now_ms: i64) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "UPDATE products SET stock = ?2, version = version + 1, updated_at = ?3
         WHERE id = ?1 AND deleted_at IS NULL",
    )
    .bind(id)
    .bind(stock)
    .bind(now_ms)
    .execute(executor)
    .await?;
    Ok(())
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let found = repo.list(user_id, "kopi").await?;
/// let product = repo.find(user_id, 42).await?; // NotFound / Forbidden
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product for `owner_id`.
    pub async fn create(&self, owner_id: i64, input: &ProductInput) -> DbResult<Product> {
        input.validate()?;
        let now = to_millis(Utc::now());
        let sku = input.sku.trim();

        debug!(owner_id, sku = %sku, "Creating product");

        let result = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO products (user_id, name, sku, description, purchase_price_cents,
                                   selling_price_cents, stock, min_stock, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(owner_id)
        .bind(input.name.trim())
        .bind(sku)
        .bind(blank_to_none(&input.description))
        .bind(input.purchase_price)
        .bind(input.selling_price)
        .bind(input.stock)
        .bind(input.min_stock)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_duplicate_sku(e.into(), sku))?;

        info!(product_id = result.id, sku = %result.sku, "Product created");
        Ok(result.into())
    }

    /// Gets a live product by id, regardless of owner.
    ///
    /// Callers exposing the result must go through [`Self::find`].
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        fetch_live(&self.pool, id).await
    }

    /// Gets a product through the ownership gate.
    pub async fn find(&self, owner_id: i64, id: i64) -> DbResult<Product> {
        let product = self.get_by_id(id).await?;
        Ok(authorize(product, id, owner_id)?)
    }

    /// Lists the owner's products, optionally filtered by a name/SKU substring.
    pub async fn list(&self, owner_id: i64, search: &str) -> DbResult<Vec<Product>> {
        let search = validate_search_query(search)?;
        debug!(owner_id, search = %search, "Listing products");

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE user_id = ?1 AND deleted_at IS NULL
               AND (?2 = '' OR name LIKE '%' || ?2 || '%' OR sku LIKE '%' || ?2 || '%')
             ORDER BY name, id"
        ))
        .bind(owner_id)
        .bind(&search)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Replaces every editable field. Fails with a conflict when
    /// `expected_version` is no longer current.
    pub async fn update(
        &self,
        owner_id: i64,
        id: i64,
        input: &ProductInput,
        expected_version: i64,
    ) -> DbResult<Product> {
        input.validate()?;
        self.find(owner_id, id).await?;
        let sku = input.sku.trim();

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products
             SET name = ?3, sku = ?4, description = ?5, purchase_price_cents = ?6,
                 selling_price_cents = ?7, stock = ?8, min_stock = ?9,
                 version = version + 1, updated_at = ?10
             WHERE id = ?1 AND version = ?2 AND deleted_at IS NULL
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(expected_version)
        .bind(input.name.trim())
        .bind(sku)
        .bind(blank_to_none(&input.description))
        .bind(input.purchase_price)
        .bind(input.selling_price)
        .bind(input.stock)
        .bind(input.min_stock)
        .bind(to_millis(Utc::now()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_duplicate_sku(e.into(), sku))?;

        match row {
            Some(row) => {
                info!(product_id = id, version = row.version, "Product updated");
                Ok(row.into())
            }
            None => Err(CoreError::StaleVersion {
                entity: "Product",
                id,
                expected: expected_version,
            }
            .into()),
        }
    }

    /// Soft-deletes a product. Past transaction items keep their snapshots.
    pub async fn delete(&self, owner_id: i64, id: i64) -> DbResult<()> {
        self.find(owner_id, id).await?;
        sqlx::query("UPDATE products SET deleted_at = ?2, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(to_millis(Utc::now()))
            .execute(&self.pool)
            .await?;
        info!(product_id = id, "Product deleted");
        Ok(())
    }
}

fn map_duplicate_sku(err: DbError, sku: &str) -> DbError {
    if err.is_unique_violation() {
        CoreError::from(ValidationError::Duplicate {
            field: "sku".to_string(),
            value: sku.to_string(),
        })
        .into()
    } else {
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[tokio::test]
    async fn test_create_and_find() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;
        let product = testing::product(&db, owner.id, "KOPI-01", 10, 8_000).await;

        let found = db.products().find(owner.id, product.id).await.unwrap();
        assert_eq!(found.sku, "KOPI-01");
        assert_eq!(found.purchase_price.cents(), 8_000);
        assert_eq!(found.version, 1);
    }

    #[tokio::test]
    async fn test_find_distinguishes_forbidden_and_missing() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;
        let other = testing::user(&db, "budi").await;
        let product = testing::product(&db, owner.id, "KOPI-01", 10, 8_000).await;

        let err = db.products().find(other.id, product.id).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::Forbidden { .. })));

        let err = db.products().find(owner.id, 999).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_sku_unique_per_owner() {
        let db = testing::memory_db().await;
        let siti = testing::user(&db, "siti").await;
        let budi = testing::user(&db, "budi").await;
        testing::product(&db, siti.id, "KOPI-01", 1, 100).await;

        // Same SKU for another owner is fine
        testing::product(&db, budi.id, "KOPI-01", 1, 100).await;

        let input = ProductInput {
            name: "Kopi lagi".to_string(),
            sku: "KOPI-01".to_string(),
            ..Default::default()
        };
        let err = db.products().create(siti.id, &input).await.unwrap_err();
        assert_eq!(err.as_core().map(|e| e.reason()), Some("DUPLICATE"));
    }

    #[tokio::test]
    async fn test_search_and_soft_delete() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;
        let kopi = testing::product(&db, owner.id, "KOPI-01", 1, 100).await;
        testing::product(&db, owner.id, "TEH-01", 1, 100).await;

        assert_eq!(db.products().list(owner.id, "").await.unwrap().len(), 2);
        let hits = db.products().list(owner.id, "kopi").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, kopi.id);

        db.products().delete(owner.id, kopi.id).await.unwrap();
        assert_eq!(db.products().list(owner.id, "").await.unwrap().len(), 1);
        assert!(db.products().get_by_id(kopi.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_checks_version() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;
        let product = testing::product(&db, owner.id, "KOPI-01", 5, 100).await;

        let input = ProductInput {
            name: "Kopi Susu".to_string(),
            sku: "KOPI-01".to_string(),
            description: Some("gelas besar".to_string()),
            purchase_price: Money::from_cents(120),
            selling_price: Money::from_cents(300),
            stock: 8,
            min_stock: 3,
        };
        let updated = db
            .products()
            .update(owner.id, product.id, &input, product.version)
            .await
            .unwrap();
        assert_eq!(updated.version, product.version + 1);
        assert_eq!(updated.stock, 8);
        assert_eq!(updated.description.as_deref(), Some("gelas besar"));

        let err = db
            .products()
            .update(owner.id, product.id, &input, product.version)
            .await
            .unwrap_err();
        assert_eq!(err.as_core().map(|e| e.reason()), Some("STALE_VERSION"));
    }
}
