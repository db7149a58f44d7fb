//! # Category Repository
//!
//! INCOME/EXPENSE labels. `(owner, name, type)` is unique among live
//! categories, and a category referenced by a transaction cannot be deleted.

use chrono::Utc;
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::time::{from_millis, to_millis};
use tally_core::input::CategoryInput;
use tally_core::{authorize, Category, CategoryType, CoreError};

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: i64,
    user_id: i64,
    name: String,
    category_type: CategoryType,
    version: i64,
    created_at: i64,
    updated_at: i64,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            category_type: row.category_type,
            version: row.version,
            created_at: from_millis(row.created_at),
            updated_at: from_millis(row.updated_at),
        }
    }
}

const CATEGORY_COLUMNS: &str = "id, user_id, name, category_type, version, created_at, updated_at";

pub(crate) async fn fetch_live<'e, E>(executor: E, id: i64) -> DbResult<Option<Category>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, CategoryRow>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(row.map(Category::from))
}

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Creates a category.
    ///
    /// ## Errors
    /// `DuplicateCategory` (409) when the owner already has one with the
    /// same name and type.
    pub async fn create(&self, owner_id: i64, input: &CategoryInput) -> DbResult<Category> {
        input.validate()?;
        let name = input.name.trim();

        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            "INSERT INTO categories (user_id, name, category_type, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(owner_id)
        .bind(name)
        .bind(input.category_type)
        .bind(to_millis(Utc::now()))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_duplicate(e.into(), name, input.category_type))?;

        info!(category_id = row.id, owner_id, "Category created");
        Ok(row.into())
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Category>> {
        fetch_live(&self.pool, id).await
    }

    pub async fn find(&self, owner_id: i64, id: i64) -> DbResult<Category> {
        let category = self.get_by_id(id).await?;
        Ok(authorize(category, id, owner_id)?)
    }

    /// Lists the owner's categories, optionally only one type.
    pub async fn list(
        &self,
        owner_id: i64,
        category_type: Option<CategoryType>,
    ) -> DbResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories
             WHERE user_id = ?1 AND deleted_at IS NULL
               AND (?2 IS NULL OR category_type = ?2)
             ORDER BY category_type, name"
        ))
        .bind(owner_id)
        .bind(category_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    pub async fn update(
        &self,
        owner_id: i64,
        id: i64,
        input: &CategoryInput,
        expected_version: i64,
    ) -> DbResult<Category> {
        input.validate()?;
        self.find(owner_id, id).await?;
        let name = input.name.trim();

        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            "UPDATE categories
             SET name = ?3, category_type = ?4, version = version + 1, updated_at = ?5
             WHERE id = ?1 AND version = ?2 AND deleted_at IS NULL
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(id)
        .bind(expected_version)
        .bind(name)
        .bind(input.category_type)
        .bind(to_millis(Utc::now()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_duplicate(e.into(), name, input.category_type))?;

        row.map(Category::from).ok_or_else(|| {
            CoreError::StaleVersion {
                entity: "Category",
                id,
                expected: expected_version,
            }
            .into()
        })
    }

    /// Soft-deletes a category that no transaction references.
    ///
    /// Counted and deleted under one write lock.
    pub async fn delete(&self, owner_id: i64, id: i64) -> DbResult<()> {
        self.find(owner_id, id).await?;

        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE category_id = ?1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if count > 0 {
            return Err(CoreError::InUse {
                entity: "Category",
                id,
                count,
            }
            .into());
        }

        sqlx::query("UPDATE categories SET deleted_at = ?2, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(to_millis(Utc::now()))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        info!(category_id = id, "Category deleted");
        Ok(())
    }
}

fn map_duplicate(err: DbError, name: &str, category_type: CategoryType) -> DbError {
    if err.is_unique_violation() {
        CoreError::DuplicateCategory {
            name: name.to_string(),
            category_type,
        }
        .into()
    } else {
        err
    }
}
