//! Shared types for the Herald platform.
//!
//! This crate provides the entity snapshots, topic keys, and lifecycle event
//! values used across all Herald crates. Nothing in here talks to the database
//! or the network; the types are plain values that can be copied into events
//! and handed to any number of subscribers.
//!
//! No crate in the workspace depends on anything *except* `herald-types` for
//! cross-cutting type definitions. This keeps the dependency graph clean and
//! prevents circular dependencies.

mod event;
mod topic;

pub use event::{EntitySnapshot, EventKind, LifecycleEvent};
pub use topic::{ParseTopicError, Topic};

use serde::{Deserialize, Serialize};

/// An entity whose mutations are only externally observable while a single
/// boolean visibility flag is set.
pub trait Visible {
    /// Returns `true` if observers are allowed to see this entity.
    fn is_visible(&self) -> bool;
}

/// A read-only copy of a post at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSnapshot {
    /// Internal database ID.
    pub id: i64,
    /// Post title.
    pub title: String,
    /// Post body text.
    pub body: String,
    /// Whether the post is published (the visibility flag).
    pub published: bool,
    /// ID of the authoring user.
    pub author_id: i64,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
    /// Last modification timestamp (ISO 8601).
    pub updated_at: String,
}

impl Visible for PostSnapshot {
    fn is_visible(&self) -> bool {
        self.published
    }
}

/// A read-only copy of a comment at a point in time.
///
/// Comments have no visibility of their own; they are observable exactly
/// when their parent post is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentSnapshot {
    /// Internal database ID.
    pub id: i64,
    /// Comment text.
    pub text: String,
    /// ID of the authoring user.
    pub author_id: i64,
    /// ID of the parent post.
    pub post_id: i64,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
}

/// The `(before, after)` pair a data-store mutation produces.
///
/// `before` is absent for creations, `after` is absent for deletions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change<S> {
    pub before: Option<S>,
    pub after: Option<S>,
}

impl<S> Change<S> {
    pub fn created(after: S) -> Self {
        Self {
            before: None,
            after: Some(after),
        }
    }

    pub fn updated(before: S, after: S) -> Self {
        Self {
            before: Some(before),
            after: Some(after),
        }
    }

    pub fn deleted(before: S) -> Self {
        Self {
            before: Some(before),
            after: None,
        }
    }

    /// The state the entity is left in, or the removed state for deletions.
    pub fn into_latest(self) -> Option<S> {
        self.after.or(self.before)
    }
}

/// Public view of a registered user. Never carries credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Internal database ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Unique e-mail address.
    pub email: String,
    /// Optional age.
    pub age: Option<u32>,
    /// Registration timestamp (ISO 8601).
    pub created_at: String,
}

/// Who is performing an operation.
///
/// Resolved by the serving layer from the request's bearer token and passed
/// explicitly into every operation; never looked up from ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthContext {
    /// No credentials were supplied.
    #[default]
    Anonymous,
    /// An authenticated user.
    User(i64),
}

impl AuthContext {
    /// Returns the authenticated user ID, if any.
    pub fn user_id(self) -> Option<i64> {
        match self {
            Self::Anonymous => None,
            Self::User(id) => Some(id),
        }
    }
}
