//! Comments attached to posts.

use herald_types::{Change, CommentSnapshot};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::{find_post, get_user, ContentError, ListParams};

const COMMENT_COLUMNS: &str = "id, text, author_id, post_id, created_at";

/// Parameters for creating a comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentParams {
    pub text: String,
    pub author_id: i64,
    pub post_id: i64,
}

/// Fields to change on a comment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCommentParams {
    pub text: Option<String>,
}

/// A comment mutation together with the parent post's visibility at the
/// moment of the write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentChange {
    pub change: Change<CommentSnapshot>,
    pub parent_visible: bool,
}

/// Creates a comment on a published post.
///
/// Drafts cannot be commented on: a missing or unpublished parent is
/// reported as `NotFound`.
pub fn create_comment(
    conn: &Connection,
    params: &CreateCommentParams,
) -> Result<CommentChange, ContentError> {
    let tx = conn.unchecked_transaction()?;

    let parent_visible = parent_visibility(&tx, params.post_id)?.unwrap_or(false);
    if !parent_visible {
        return Err(ContentError::NotFound(format!("post {}", params.post_id)));
    }
    get_user(&tx, params.author_id)?;

    let comment = tx.query_row(
        &format!(
            "INSERT INTO comments (text, author_id, post_id) VALUES (?1, ?2, ?3)
             RETURNING {COMMENT_COLUMNS}"
        ),
        params![params.text, params.author_id, params.post_id],
        map_row_to_comment,
    )?;

    tx.commit()?;
    Ok(CommentChange {
        change: Change::created(comment),
        parent_visible,
    })
}

/// Retrieves a comment by ID.
pub fn get_comment(conn: &Connection, id: i64) -> Result<CommentSnapshot, ContentError> {
    conn.query_row(
        &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"),
        [id],
        map_row_to_comment,
    )
    .optional()?
    .ok_or_else(|| ContentError::NotFound(format!("comment {id}")))
}

/// Lists comments on published posts, with pagination.
pub fn list_comments(
    conn: &Connection,
    list: &ListParams,
) -> Result<Vec<CommentSnapshot>, ContentError> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.text, c.author_id, c.post_id, c.created_at
         FROM comments c JOIN posts p ON p.id = c.post_id
         WHERE p.published = 1 AND (?1 IS NULL OR c.text LIKE ?1 ESCAPE '\\')
         ORDER BY c.id ASC LIMIT ?2 OFFSET ?3",
    )?;
    let rows = stmt.query_map(
        params![list.pattern(), list.limit(), list.offset()],
        map_row_to_comment,
    )?;
    collect(rows)
}

/// Lists every comment on one post, oldest first.
pub fn list_comments_for_post(
    conn: &Connection,
    post_id: i64,
) -> Result<Vec<CommentSnapshot>, ContentError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = ?1 ORDER BY id ASC"
    ))?;
    let rows = stmt.query_map([post_id], map_row_to_comment)?;
    collect(rows)
}

/// Lists every comment written by one user.
pub fn list_comments_by_author(
    conn: &Connection,
    author_id: i64,
) -> Result<Vec<CommentSnapshot>, ContentError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments WHERE author_id = ?1 ORDER BY id ASC"
    ))?;
    let rows = stmt.query_map([author_id], map_row_to_comment)?;
    collect(rows)
}

/// Updates a comment's text.
pub fn update_comment(
    conn: &Connection,
    id: i64,
    updates: &UpdateCommentParams,
) -> Result<CommentChange, ContentError> {
    let tx = conn.unchecked_transaction()?;
    let before = get_comment(&tx, id)?;

    let after = tx.query_row(
        &format!(
            "UPDATE comments SET text = COALESCE(?1, text) WHERE id = ?2
             RETURNING {COMMENT_COLUMNS}"
        ),
        params![updates.text, id],
        map_row_to_comment,
    )?;
    let parent_visible = parent_visibility(&tx, after.post_id)?.unwrap_or(false);

    tx.commit()?;
    Ok(CommentChange {
        change: Change::updated(before, after),
        parent_visible,
    })
}

/// Deletes a comment.
pub fn delete_comment(conn: &Connection, id: i64) -> Result<CommentChange, ContentError> {
    let tx = conn.unchecked_transaction()?;

    let before = tx
        .query_row(
            &format!("DELETE FROM comments WHERE id = ?1 RETURNING {COMMENT_COLUMNS}"),
            [id],
            map_row_to_comment,
        )
        .optional()?
        .ok_or_else(|| ContentError::NotFound(format!("comment {id}")))?;
    let parent_visible = parent_visibility(&tx, before.post_id)?.unwrap_or(false);

    tx.commit()?;
    Ok(CommentChange {
        change: Change::deleted(before),
        parent_visible,
    })
}

/// `Some(published)` for an existing post, `None` if it is gone.
fn parent_visibility(conn: &Connection, post_id: i64) -> Result<Option<bool>, ContentError> {
    Ok(find_post(conn, post_id)?.map(|post| post.published))
}

fn map_row_to_comment(row: &Row) -> rusqlite::Result<CommentSnapshot> {
    Ok(CommentSnapshot {
        id: row.get(0)?,
        text: row.get(1)?,
        author_id: row.get(2)?,
        post_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn collect(
    rows: impl Iterator<Item = rusqlite::Result<CommentSnapshot>>,
) -> Result<Vec<CommentSnapshot>, ContentError> {
    let mut comments = Vec::new();
    for row in rows {
        comments.push(row?);
    }
    Ok(comments)
}
