//! # Tally API
//!
//! HTTP JSON server for the bookkeeping backend.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Tally API Services                            │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  Accounts      │  │  Transactions  │  │  Dashboard / Reports       ││
//! │  │                │  │                │  │                            ││
//! │  │ • register     │  │ • post         │  │ • stats, chart, low-stock  ││
//! │  │ • login        │  │ • list/search  │  │ • product performance      ││
//! │  │ • profile      │  │ • get          │  │ • general ledger           ││
//! │  │ • password     │  │ • mark paid    │  │ • unpaid                   ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐                                │
//! │  │  Catalog CRUD  │  │  Health        │                                │
//! │  │ products       │  │ SELECT 1       │                                │
//! │  │ customers      │  └────────────────┘                                │
//! │  │ categories     │                                                    │
//! │  └────────────────┘                                                    │
//! │                                                                         │
//! │  Infrastructure: tally-db Database (SQLite) · JWT (HS256) · argon2     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `SERVER_PORT` - HTTP port (default: 8080)
//! - `DATABASE_PATH` - SQLite file (default: ./tally.db)
//! - `DATABASE_MAX_CONNECTIONS` - pool size (default: 5)
//! - `JWT_SECRET` - Secret for JWT signing
//! - `JWT_LIFETIME_SECS` - Token lifetime (default: 86400)
//! - `TIMEZONE` - Default IANA zone for day boundaries (default: UTC)

pub mod auth;
pub mod config;
pub mod error;
pub mod services;

use std::sync::Arc;

use axum::Router;
use tally_db::Database;
use tower_http::trace::TraceLayer;

// Re-exports
pub use auth::{AuthUser, JwtManager};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ApiConfig>,
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        let jwt = JwtManager::new(&config.jwt_secret, config.jwt_lifetime_secs);
        AppState {
            db,
            config: Arc::new(config),
            jwt: Arc::new(jwt),
        }
    }
}

/// Builds the full router with request tracing.
pub fn build_router(state: AppState) -> Router {
    services::routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
