//! # tally-db: Ledger Store for Tally
//!
//! This crate provides database access for Tally. It uses SQLite with
//! sqlx for async operations, and owns the one write path that must be
//! atomic: posting a transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tally Data Flow                                │
//! │                                                                         │
//! │  HTTP handler (POST /transactions, GET /reports/ledger, ...)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌──────────────┐   │   │
//! │  │   │   Database    │   │  Repositories  │   │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │   │  users/catalog │   │  (embedded)  │   │   │
//! │  │   │               │◄──│  transactions  │   │ 001_init.sql │   │   │
//! │  │   │               │   │  reports       │   └──────────────┘   │   │
//! │  │   │               │   └────────────────┘                      │   │
//! │  │   │               │◄── TransactionPoster (posting.rs)         │   │
//! │  │   └───────────────┘    writes; everything else only reads     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL)                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per entity plus report queries
//! - [`posting`] - The atomic Transaction Poster
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./tally.db")).await?;
//! let tx = db.poster().post(user_id, &request).await?;
//! let ledger = db.reports().ledger(user_id, &range).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod posting;
pub mod repository;
pub(crate) mod time;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use posting::TransactionPoster;

pub use repository::{
    CategoryRepository, CustomerRepository, NewUser, ProductRepository, ReportRepository,
    TransactionRepository, UserRepository,
};
