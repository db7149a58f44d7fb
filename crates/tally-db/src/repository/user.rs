//! # User Repository
//!
//! Accounts. Username and email are globally unique.

use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::time::{from_millis, to_millis};
use tally_core::{CoreError, User, ValidationError};

/// Fields needed to open an account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    full_name: String,
    created_at: i64,
    updated_at: i64,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            full_name: row.full_name,
            created_at: from_millis(row.created_at),
            updated_at: from_millis(row.updated_at),
        }
    }
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, full_name, created_at, updated_at";

/// Repository for user accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates an account.
    ///
    /// ## Errors
    /// `Duplicate` (409) when the username or email is taken.
    pub async fn create(&self, new: NewUser) -> DbResult<User> {
        let now = to_millis(Utc::now());
        debug!(username = %new.username, "Creating user");

        let result = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (username, email, password_hash, full_name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.full_name)
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        match result.map_err(DbError::from) {
            Ok(row) => {
                info!(user_id = row.id, username = %row.username, "User created");
                Ok(row.into())
            }
            Err(e) if e.is_unique_violation() => Err(duplicate_account(&e, &new.username, &new.email)),
            Err(e) => Err(e),
        }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    /// Updates display name and email.
    pub async fn update_profile(&self, id: i64, full_name: &str, email: &str) -> DbResult<User> {
        let result = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET full_name = ?2, email = ?3, updated_at = ?4
             WHERE id = ?1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(full_name)
        .bind(email)
        .bind(to_millis(Utc::now()))
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from);

        match result {
            Ok(Some(row)) => Ok(row.into()),
            Ok(None) => Err(CoreError::not_found("User", id).into()),
            Err(e) if e.is_unique_violation() => Err(CoreError::from(ValidationError::Duplicate {
                field: "email".to_string(),
                value: email.to_string(),
            })
            .into()),
            Err(e) => Err(e),
        }
    }

    /// Replaces the stored password hash.
    pub async fn update_password(&self, id: i64, password_hash: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(password_hash)
            .bind(to_millis(Utc::now()))
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("User", id).into());
        }
        info!(user_id = id, "Password changed");
        Ok(())
    }
}

fn duplicate_account(err: &DbError, username: &str, email: &str) -> DbError {
    let (field, value) = match err {
        DbError::UniqueViolation(columns) if columns.contains("email") => ("email", email),
        _ => ("username", username),
    };
    CoreError::from(ValidationError::Duplicate {
        field: field.to_string(),
        value: value.to_string(),
    })
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            full_name: "Siti".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db.users().create(new_user("siti", "siti@example.com")).await.unwrap();

        let by_name = db.users().get_by_username("siti").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert_eq!(by_name.password_hash, "hash");
        assert!(db.users().get_by_id(user.id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_and_email() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.users().create(new_user("siti", "siti@example.com")).await.unwrap();

        let err = db
            .users()
            .create(new_user("siti", "other@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.as_core().map(|e| e.reason()), Some("DUPLICATE"));

        let err = db
            .users()
            .create(new_user("budi", "siti@example.com"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("email"));
    }

    #[tokio::test]
    async fn test_profile_and_password_updates() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db.users().create(new_user("siti", "siti@example.com")).await.unwrap();

        let updated = db
            .users()
            .update_profile(user.id, "Siti Aminah", "aminah@example.com")
            .await
            .unwrap();
        assert_eq!(updated.full_name, "Siti Aminah");
        assert_eq!(updated.email, "aminah@example.com");

        db.users().update_password(user.id, "new-hash").await.unwrap();
        let reloaded = db.users().get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.password_hash, "new-hash");
    }
}
