//! The single path by which post and comment mutations reach the store.
//!
//! Each operation runs the store call on the blocking pool, derives the
//! lifecycle event from the returned `(before, after)` pair, and publishes it
//! before handing the new state back to the resolver.
//!
//! Writes are serialized through one lock held from the store call until the
//! event is on the bus, so subscribers see events in commit order. The whole
//! step runs inside the blocking task: a resolver future dropped mid-await
//! cannot leave a committed change unannounced.

use herald_content::{
    CommentChange, ContentError, CreateCommentParams, CreatePostParams, UpdateCommentParams,
    UpdatePostParams,
};
use herald_db::DbPool;
use herald_events::{derive_comment, derive_post, Bus};
use herald_types::{Change, CommentSnapshot, PostSnapshot, User};
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::ApiError;

/// Runs mutations and announces their observable effects on the bus.
#[derive(Clone)]
pub struct MutationGateway {
    pool: DbPool,
    bus: Bus,
    write_order: Arc<Mutex<()>>,
}

/// Everything a user deletion removed.
#[derive(Debug)]
pub struct UserRemoval {
    pub user: User,
    pub posts: Vec<PostSnapshot>,
    pub comments: Vec<CommentChange>,
}

impl MutationGateway {
    pub fn new(pool: DbPool, bus: Bus) -> Self {
        Self {
            pool,
            bus,
            write_order: Arc::new(Mutex::new(())),
        }
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub async fn create_post(&self, params: CreatePostParams) -> Result<PostSnapshot, ApiError> {
        let change = self
            .commit(move |conn, bus| {
                let change = herald_content::create_post(conn, &params)?;
                announce_post(bus, change.clone());
                Ok(change)
            })
            .await?;
        latest(change)
    }

    pub async fn update_post(
        &self,
        id: i64,
        updates: UpdatePostParams,
    ) -> Result<PostSnapshot, ApiError> {
        let change = self
            .commit(move |conn, bus| {
                let change = herald_content::update_post(conn, id, &updates)?;
                announce_post(bus, change.clone());
                Ok(change)
            })
            .await?;
        latest(change)
    }

    pub async fn delete_post(&self, id: i64) -> Result<PostSnapshot, ApiError> {
        let change = self
            .commit(move |conn, bus| {
                let change = herald_content::delete_post(conn, id)?;
                announce_post(bus, change.clone());
                Ok(change)
            })
            .await?;
        change
            .before
            .ok_or_else(|| ApiError::InternalServerError("delete returned no row".to_string()))
    }

    pub async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentSnapshot, ApiError> {
        let change = self
            .commit(move |conn, bus| {
                let change = herald_content::create_comment(conn, &params)?;
                announce_comment(bus, change.clone());
                Ok(change)
            })
            .await?;
        latest(change.change)
    }

    pub async fn update_comment(
        &self,
        id: i64,
        updates: UpdateCommentParams,
    ) -> Result<CommentSnapshot, ApiError> {
        let change = self
            .commit(move |conn, bus| {
                let change = herald_content::update_comment(conn, id, &updates)?;
                announce_comment(bus, change.clone());
                Ok(change)
            })
            .await?;
        latest(change.change)
    }

    pub async fn delete_comment(&self, id: i64) -> Result<CommentSnapshot, ApiError> {
        let change = self
            .commit(move |conn, bus| {
                let change = herald_content::delete_comment(conn, id)?;
                announce_comment(bus, change.clone());
                Ok(change)
            })
            .await?;
        change
            .change
            .before
            .ok_or_else(|| ApiError::InternalServerError("delete returned no row".to_string()))
    }

    /// Deletes a user and announces the posts and comments that go with them.
    ///
    /// The foreign keys cascade silently, so the doomed rows are read inside
    /// the same transaction as the delete.
    pub async fn delete_user(&self, id: i64) -> Result<User, ApiError> {
        let removal = self
            .commit(move |conn, bus| {
                let tx = conn.unchecked_transaction()?;
                let posts = herald_content::list_posts_by_author(&tx, id)?;
                let mut comments = Vec::new();
                for comment in herald_content::list_comments_by_author(&tx, id)? {
                    if posts.iter().any(|post| post.id == comment.post_id) {
                        continue;
                    }
                    let parent_visible = herald_content::find_post(&tx, comment.post_id)?
                        .is_some_and(|post| post.published);
                    comments.push(CommentChange {
                        change: Change::deleted(comment),
                        parent_visible,
                    });
                }
                let user = herald_content::delete_user(&tx, id)?;
                tx.commit()?;

                for post in &posts {
                    announce_post(bus, Change::deleted(post.clone()));
                }
                for comment in &comments {
                    announce_comment(bus, comment.clone());
                }
                Ok(UserRemoval {
                    user,
                    posts,
                    comments,
                })
            })
            .await?;
        Ok(removal.user)
    }

    /// Runs `f` on the blocking pool while holding the write-order lock.
    async fn commit<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &Bus) -> Result<T, ContentError> + Send + 'static,
    {
        let pool = self.pool.clone();
        let bus = self.bus.clone();
        let write_order = Arc::clone(&self.write_order);
        tokio::task::spawn_blocking(move || {
            let _ordered = lock_write_order(&write_order);
            let conn = pool.get()?;
            f(&conn, &bus).map_err(ApiError::from)
        })
        .await?
    }
}

/// Recovers a poisoned lock: the guarded value is `()`, so there is no state
/// to be left half-written.
fn lock_write_order(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!("gateway write lock poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

fn announce_post(bus: &Bus, change: Change<PostSnapshot>) {
    if let Some(event) = derive_post(change) {
        bus.publish(event);
    }
}

fn announce_comment(bus: &Bus, change: CommentChange) {
    if let Some(event) = derive_comment(change.change, change.parent_visible) {
        bus.publish(event);
    }
}

fn latest<S>(change: Change<S>) -> Result<S, ApiError> {
    change
        .into_latest()
        .ok_or_else(|| ApiError::InternalServerError("mutation returned no row".to_string()))
}
