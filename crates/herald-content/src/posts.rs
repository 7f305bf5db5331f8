//! Posts: the visibility-gated content items.

use herald_events::ParentLookup;
use herald_types::{Change, PostSnapshot};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::{get_user, ContentError, ListParams};

const POST_COLUMNS: &str = "id, title, body, published, author_id, created_at, updated_at";

/// Parameters for creating a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostParams {
    pub title: String,
    pub body: String,
    pub published: bool,
    pub author_id: i64,
}

/// Fields to change on a post; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePostParams {
    pub title: Option<String>,
    pub body: Option<String>,
    pub published: Option<bool>,
}

/// Creates a post for an existing author.
pub fn create_post(
    conn: &Connection,
    params: &CreatePostParams,
) -> Result<Change<PostSnapshot>, ContentError> {
    get_user(conn, params.author_id)?;

    let post = conn.query_row(
        &format!(
            "INSERT INTO posts (title, body, published, author_id) VALUES (?1, ?2, ?3, ?4)
             RETURNING {POST_COLUMNS}"
        ),
        params![params.title, params.body, params.published, params.author_id],
        map_row_to_post,
    )?;

    Ok(Change::created(post))
}

/// Retrieves a post by ID regardless of whether it is published.
pub fn get_post(conn: &Connection, id: i64) -> Result<PostSnapshot, ContentError> {
    find_post(conn, id)?.ok_or_else(|| ContentError::NotFound(format!("post {id}")))
}

/// Retrieves a post by ID, returning `None` if it does not exist.
pub fn find_post(conn: &Connection, id: i64) -> Result<Option<PostSnapshot>, ContentError> {
    let post = conn
        .query_row(
            &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
            [id],
            map_row_to_post,
        )
        .optional()?;
    Ok(post)
}

/// Lists published posts, optionally filtered by a case-insensitive search
/// over title and body.
pub fn list_published_posts(
    conn: &Connection,
    list: &ListParams,
) -> Result<Vec<PostSnapshot>, ContentError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {POST_COLUMNS} FROM posts
         WHERE published = 1
           AND (?1 IS NULL OR title LIKE ?1 ESCAPE '\\' OR body LIKE ?1 ESCAPE '\\')
         ORDER BY id ASC LIMIT ?2 OFFSET ?3"
    ))?;

    let rows = stmt.query_map(
        params![list.pattern(), list.limit(), list.offset()],
        map_row_to_post,
    )?;
    collect(rows)
}

/// Lists every post by an author, drafts included.
pub fn list_posts_by_author(
    conn: &Connection,
    author_id: i64,
) -> Result<Vec<PostSnapshot>, ContentError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {POST_COLUMNS} FROM posts WHERE author_id = ?1 ORDER BY id ASC"
    ))?;
    let rows = stmt.query_map([author_id], map_row_to_post)?;
    collect(rows)
}

/// Updates a post, returning its state before and after the write.
///
/// Both reads and the write share one transaction, so the pair describes
/// exactly this update even with concurrent writers.
pub fn update_post(
    conn: &Connection,
    id: i64,
    updates: &UpdatePostParams,
) -> Result<Change<PostSnapshot>, ContentError> {
    let tx = conn.unchecked_transaction()?;
    let before = get_post(&tx, id)?;

    let after = tx.query_row(
        &format!(
            "UPDATE posts SET
                title = COALESCE(?1, title),
                body = COALESCE(?2, body),
                published = COALESCE(?3, published),
                updated_at = datetime('now')
             WHERE id = ?4
             RETURNING {POST_COLUMNS}"
        ),
        params![updates.title, updates.body, updates.published, id],
        map_row_to_post,
    )?;

    tx.commit()?;
    Ok(Change::updated(before, after))
}

/// Deletes a post and, through the foreign key, its comments.
pub fn delete_post(conn: &Connection, id: i64) -> Result<Change<PostSnapshot>, ContentError> {
    let before = conn
        .query_row(
            &format!("DELETE FROM posts WHERE id = ?1 RETURNING {POST_COLUMNS}"),
            [id],
            map_row_to_post,
        )
        .optional()?
        .ok_or_else(|| ContentError::NotFound(format!("post {id}")))?;

    Ok(Change::deleted(before))
}

/// Resolves parent posts for comment subscriptions.
pub struct PostLookup<'a>(pub &'a Connection);

impl ParentLookup for PostLookup<'_> {
    type Parent = PostSnapshot;
    type Error = ContentError;

    fn resolve(&self, parent_id: i64) -> Result<Option<PostSnapshot>, ContentError> {
        find_post(self.0, parent_id)
    }
}

pub(crate) fn map_row_to_post(row: &Row) -> rusqlite::Result<PostSnapshot> {
    Ok(PostSnapshot {
        id: row.get(0)?,
        title: row.get(1)?,
        body: row.get(2)?,
        published: row.get(3)?,
        author_id: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn collect(
    rows: impl Iterator<Item = rusqlite::Result<PostSnapshot>>,
) -> Result<Vec<PostSnapshot>, ContentError> {
    let mut posts = Vec::new();
    for row in rows {
        posts.push(row?);
    }
    Ok(posts)
}
