//! Content persistence for the Herald platform.
//!
//! Implements user, post, and comment CRUD over SQLite. Every post and comment
//! mutation returns the entity's state before and after the write as a
//! [`Change`](herald_types::Change), read inside the same transaction as the
//! write itself, so the live-update layer can derive events from it without a
//! second round trip.
//!
//! Functions take a borrowed [`rusqlite::Connection`]; callers on the async
//! side check one out of the pool inside `spawn_blocking`.

mod comments;
mod posts;
mod users;

pub use comments::{
    create_comment, delete_comment, get_comment, list_comments, list_comments_by_author,
    list_comments_for_post, update_comment, CommentChange, CreateCommentParams,
    UpdateCommentParams,
};
pub use posts::{
    create_post, delete_post, find_post, get_post, list_posts_by_author, list_published_posts,
    update_post, CreatePostParams, PostLookup, UpdatePostParams,
};
pub use users::{
    create_user, delete_user, find_credentials, get_user, list_users, update_user, Credentials,
    CreateUserParams, UpdateUserParams,
};

use rusqlite::ErrorCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during content operations.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("{0} not found")]
    NotFound(String),
    #[error("email already taken")]
    EmailTaken,
}

/// Free-text search and offset pagination for list queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListParams {
    /// Case-insensitive substring filter.
    pub query: Option<String>,
    /// Rows to skip.
    pub skip: Option<u32>,
    /// Maximum rows to return; unlimited when absent.
    pub take: Option<u32>,
}

impl ListParams {
    /// The query as a `LIKE` pattern with `\` as the escape character, so
    /// `%` and `_` in the search text match literally.
    fn pattern(&self) -> Option<String> {
        let query = self.query.as_deref()?.trim();
        if query.is_empty() {
            return None;
        }
        let mut pattern = String::with_capacity(query.len() + 2);
        pattern.push('%');
        for c in query.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        Some(pattern)
    }

    fn limit(&self) -> i64 {
        self.take.map_or(-1, i64::from)
    }

    fn offset(&self) -> i64 {
        self.skip.map_or(0, i64::from)
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}
