//! Entity trait: identity + continuity across state changes.

use chrono::{DateTime, Utc};

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// When the entity was created.
    fn created_at(&self) -> DateTime<Utc>;

    /// When the entity was last mutated through the store API.
    fn updated_at(&self) -> DateTime<Utc>;
}
