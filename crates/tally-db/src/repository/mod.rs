//! # Repository Module
//!
//! Database repository implementations for Tally.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HTTP handler                                                           │
//! │       │                                                                 │
//! │       │  db.products().find(user_id, 42)                                │
//! │       ▼                                                                 │
//! │  ProductRepository                                                      │
//! │  ├── list(&self, owner, search)                                         │
//! │  ├── find(&self, owner, id)      ── authorize(): NotFound / Forbidden   │
//! │  ├── create(&self, owner, input)                                        │
//! │  ├── update(&self, owner, id, input, version)                           │
//! │  └── delete(&self, owner, id)                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every owner-facing lookup goes through `find`, which loads by id and then
//! applies the ownership gate. `get_by_id` skips the gate and is for
//! internal callers only.
//!
//! ## Available Repositories
//!
//! - [`UserRepository`] - Accounts and profiles
//! - [`ProductRepository`] - Product CRUD and search
//! - [`CustomerRepository`] - Customers / suppliers
//! - [`CategoryRepository`] - INCOME / EXPENSE labels
//! - [`TransactionRepository`] - Posted transactions (read, search, mark paid)
//! - [`ReportRepository`] - Dashboard aggregates, ledger, unpaid report

pub mod category;
pub mod customer;
pub mod product;
pub mod report;
pub mod transaction;
pub mod user;

pub use category::CategoryRepository;
pub use customer::CustomerRepository;
pub use product::ProductRepository;
pub use report::ReportRepository;
pub use transaction::TransactionRepository;
pub use user::{NewUser, UserRepository};
