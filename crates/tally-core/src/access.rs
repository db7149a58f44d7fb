//! # Ownership Gate
//!
//! Every read or write of a user-owned entity goes through [`authorize`].
//! Repositories load by id only; the gate decides whether the caller may
//! see the row at all.
//!
//! ```text
//! load(id) ──► Option<T> ──► authorize(.., owner) ──┬── None          → NotFound
//!                                                   ├── other owner   → Forbidden
//!                                                   └── same owner    → Ok(T)
//! ```

use crate::error::{CoreError, CoreResult};

/// An entity that belongs to exactly one user.
pub trait Owned {
    /// Entity name used in error messages.
    const ENTITY: &'static str;

    fn owner_id(&self) -> i64;
}

/// Checks that `entity` exists and belongs to `owner_id`.
pub fn authorize<T: Owned>(entity: Option<T>, id: i64, owner_id: i64) -> CoreResult<T> {
    match entity {
        None => Err(CoreError::NotFound {
            entity: T::ENTITY,
            id,
        }),
        Some(e) if e.owner_id() != owner_id => Err(CoreError::Forbidden {
            entity: T::ENTITY,
            id,
        }),
        Some(e) => Ok(e),
    }
}
