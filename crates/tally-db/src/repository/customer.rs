//! # Customer Repository
//!
//! Customers and suppliers. A customer still referenced by a transaction
//! cannot be deleted.

use chrono::Utc;
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;
use crate::time::{from_millis, to_millis};
use tally_core::input::{blank_to_none, CustomerInput};
use tally_core::validation::validate_search_query;
use tally_core::{authorize, CoreError, Customer};

#[derive(Debug, FromRow)]
struct CustomerRow {
    id: i64,
    user_id: i64,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    version: i64,
    created_at: i64,
    updated_at: i64,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            version: row.version,
            created_at: from_millis(row.created_at),
            updated_at: from_millis(row.updated_at),
        }
    }
}

const CUSTOMER_COLUMNS: &str =
    "id, user_id, name, email, phone, address, version, created_at, updated_at";

pub(crate) async fn fetch_live<'e, E>(executor: E, id: i64) -> DbResult<Option<Customer>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, CustomerRow>(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(row.map(Customer::from))
}

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn create(&self, owner_id: i64, input: &CustomerInput) -> DbResult<Customer> {
        input.validate()?;
        let now = to_millis(Utc::now());

        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "INSERT INTO customers (user_id, name, email, phone, address, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(owner_id)
        .bind(input.name.trim())
        .bind(blank_to_none(&input.email))
        .bind(blank_to_none(&input.phone))
        .bind(blank_to_none(&input.address))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        info!(customer_id = row.id, owner_id, "Customer created");
        Ok(row.into())
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Customer>> {
        fetch_live(&self.pool, id).await
    }

    pub async fn find(&self, owner_id: i64, id: i64) -> DbResult<Customer> {
        let customer = self.get_by_id(id).await?;
        Ok(authorize(customer, id, owner_id)?)
    }

    /// Lists the owner's customers, optionally filtered by name/email/phone.
    pub async fn list(&self, owner_id: i64, search: &str) -> DbResult<Vec<Customer>> {
        let search = validate_search_query(search)?;
        debug!(owner_id, search = %search, "Listing customers");

        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers
             WHERE user_id = ?1 AND deleted_at IS NULL
               AND (?2 = '' OR name LIKE '%' || ?2 || '%'
                    OR email LIKE '%' || ?2 || '%' OR phone LIKE '%' || ?2 || '%')
             ORDER BY name, id"
        ))
        .bind(owner_id)
        .bind(&search)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Customer::from).collect())
    }

    pub async fn update(
        &self,
        owner_id: i64,
        id: i64,
        input: &CustomerInput,
        expected_version: i64,
    ) -> DbResult<Customer> {
        input.validate()?;
        self.find(owner_id, id).await?;

        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "UPDATE customers
             SET name = ?3, email = ?4, phone = ?5, address = ?6,
                 version = version + 1, updated_at = ?7
             WHERE id = ?1 AND version = ?2 AND deleted_at IS NULL
             RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(id)
        .bind(expected_version)
        .bind(input.name.trim())
        .bind(blank_to_none(&input.email))
        .bind(blank_to_none(&input.phone))
        .bind(blank_to_none(&input.address))
        .bind(to_millis(Utc::now()))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Customer::from).ok_or_else(|| {
            CoreError::StaleVersion {
                entity: "Customer",
                id,
                expected: expected_version,
            }
            .into()
        })
    }

    /// Soft-deletes a customer that no transaction references.
    ///
    /// The reference count and the soft delete share one write
    /// transaction, so a posting cannot attach to the customer in between.
    pub async fn delete(&self, owner_id: i64, id: i64) -> DbResult<()> {
        self.find(owner_id, id).await?;

        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE customer_id = ?1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if count > 0 {
            return Err(CoreError::InUse {
                entity: "Customer",
                id,
                count,
            }
            .into());
        }

        sqlx::query("UPDATE customers SET deleted_at = ?2, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(to_millis(Utc::now()))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        info!(customer_id = id, "Customer deleted");
        Ok(())
    }
}
