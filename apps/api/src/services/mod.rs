//! HTTP handlers, grouped by resource.
//!
//! Every handler except `auth` and `health` takes an [`AuthUser`] and passes
//! its id down as the owner; the repositories apply the ownership gate.
//!
//! [`AuthUser`]: crate::AuthUser

pub mod auth_service;
pub mod category_service;
pub mod customer_service;
pub mod dashboard_service;
pub mod health_service;
pub mod product_service;
pub mod profile_service;
pub mod report_service;
pub mod transaction_service;

use axum::routing::{get, post, put};
use axum::Router;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use tally_core::range::DateRange;

use crate::AppState;

/// All routes, still waiting for state.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_service::health))
        .route("/auth/register", post(auth_service::register))
        .route("/auth/login", post(auth_service::login))
        .route(
            "/profile",
            get(profile_service::get_profile).put(profile_service::update_profile),
        )
        .route("/profile/password", put(profile_service::change_password))
        .route(
            "/transactions",
            post(transaction_service::create).get(transaction_service::list),
        )
        .route("/transactions/{id}", get(transaction_service::get))
        .route("/transactions/{id}/paid", put(transaction_service::mark_paid))
        .route("/dashboard/stats", get(dashboard_service::stats))
        .route("/dashboard/chart", get(dashboard_service::chart))
        .route("/dashboard/low-stock", get(dashboard_service::low_stock))
        .route(
            "/reports/product-performance",
            get(report_service::product_performance),
        )
        .route("/reports/ledger", get(report_service::ledger))
        .route("/reports/unpaid", get(report_service::unpaid))
        .route(
            "/products",
            post(product_service::create).get(product_service::list),
        )
        .route(
            "/products/{id}",
            get(product_service::get)
                .put(product_service::update)
                .delete(product_service::delete),
        )
        .route(
            "/customers",
            post(customer_service::create).get(customer_service::list),
        )
        .route(
            "/customers/{id}",
            get(customer_service::get)
                .put(customer_service::update)
                .delete(customer_service::delete),
        )
        .route(
            "/categories",
            post(category_service::create).get(category_service::list),
        )
        .route(
            "/categories/{id}",
            get(category_service::get)
                .put(category_service::update)
                .delete(category_service::delete),
        )
}

/// `?search=` on list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: String,
}

/// `?from=&to=&tz=` on dashboard and report endpoints.
///
/// Unparseable values fall back to their defaults rather than failing.
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub tz: Option<String>,
}

impl RangeQuery {
    /// The request's zone, or the configured default.
    pub fn zone(&self, default: Tz) -> Tz {
        self.tz
            .as_deref()
            .and_then(|raw| raw.trim().parse::<Tz>().ok())
            .unwrap_or(default)
    }

    pub fn resolve(&self, default: Tz, now: DateTime<Utc>) -> DateRange {
        DateRange::resolve(
            self.from.as_deref(),
            self.to.as_deref(),
            self.zone(default),
            now,
        )
    }
}

/// Update bodies carry the version the client last saw.
#[derive(Debug, Deserialize)]
pub struct Versioned<T> {
    pub version: i64,
    #[serde(flatten)]
    pub input: T,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Jakarta;

    #[test]
    fn test_range_query_zone() {
        let q = RangeQuery {
            tz: Some("Asia/Jakarta".to_string()),
            ..Default::default()
        };
        assert_eq!(q.zone(chrono_tz::UTC), Jakarta);

        let bad = RangeQuery {
            tz: Some("Mars/Olympus".to_string()),
            ..Default::default()
        };
        assert_eq!(bad.zone(Jakarta), Jakarta);
    }

    #[test]
    fn test_versioned_body_flattens_input() {
        let body: Versioned<tally_core::input::CategoryInput> =
            serde_json::from_str(r#"{"version":3,"name":"Listrik","type":"EXPENSE"}"#).unwrap();
        assert_eq!(body.version, 3);
        assert_eq!(body.input.name, "Listrik");
    }
}
