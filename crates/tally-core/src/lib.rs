//! # tally-core: Pure Business Logic for Tally
//!
//! This crate is the **heart** of Tally, a small-business bookkeeping
//! backend. It contains the posting rules and report assembly as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tally Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    HTTP API (apps/api)                          │   │
//! │  │    POST /transactions, GET /dashboard/*, GET /reports/*        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  posting  │  │  report   │  │   │
//! │  │   │  Product  │  │   Money   │  │ planning  │  │  ledger   │  │   │
//! │  │   │Transaction│  │           │  │ stock fx  │  │  charts   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │      SQLite queries, migrations, repositories, posting unit     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Transaction, Category, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types with stable reason codes
//! - [`validation`] - Input validation
//! - [`access`] - The ownership gate shared by every entity type
//! - [`input`] - Create/update payloads for the catalog entities
//! - [`posting`] - Request planning and per-item stock effects
//! - [`range`] - Date-range resolution in the caller's time zone
//! - [`report`] - Dashboard stats, chart series, product performance
//! - [`ledger`] - General ledger replay and unpaid receivables/payables
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::money::Money;
//!
//! let unit_price = Money::from_cents(12_500); // 125.00
//! let subtotal = unit_price.multiply_quantity(3);
//! assert_eq!(subtotal.cents(), 37_500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod error;
pub mod input;
pub mod ledger;
pub mod money;
pub mod posting;
pub mod range;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::{authorize, Owned};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Counterparty label used when a transaction has no customer attached.
pub const DEFAULT_COUNTERPARTY: &str = "General";

/// Maximum quantity of a single transaction line.
///
/// Guards against typos (1000 instead of 10) on the posting form.
pub const MAX_ITEM_QUANTITY: i64 = 1_000_000;

/// Maximum number of lines in a single transaction.
pub const MAX_TRANSACTION_ITEMS: usize = 200;

/// Highest stock level a product may hold, by edit or by restock.
pub const MAX_STOCK: i64 = 1_000_000_000;
