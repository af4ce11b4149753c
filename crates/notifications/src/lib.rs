//! Notification feed derived from entity state.
//!
//! Notifications are a view, never a source of truth: the generator scans
//! the entity collections and synthesizes one entry per qualifying
//! condition, and the feed merge preserves read/unread flags across
//! regeneration via deterministic entry identity.

pub mod feed;
pub mod notification;

pub use feed::{Feed, FeedInputs, generate};
pub use notification::{
    ManualNotification, Notification, NotificationAction, NotificationConfig, NotificationId,
    NotificationKind, Priority,
};
