//! User accounts.

use herald_types::User;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::{is_constraint_violation, ContentError, ListParams};

const USER_COLUMNS: &str = "id, name, email, age, created_at";

/// Parameters for creating a user. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub age: Option<u32>,
}

/// Fields to change on a user; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserParams {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<u32>,
}

/// A user together with their stored password hash. Only used for login.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
}

/// Creates a user.
///
/// Returns `ContentError::EmailTaken` if the e-mail is already registered.
pub fn create_user(conn: &Connection, params: &CreateUserParams) -> Result<User, ContentError> {
    conn.query_row(
        &format!(
            "INSERT INTO users (name, email, password_hash, age) VALUES (?1, ?2, ?3, ?4)
             RETURNING {USER_COLUMNS}"
        ),
        params![params.name, params.email, params.password_hash, params.age],
        map_row_to_user,
    )
    .map_err(map_email_conflict)
}

/// Retrieves a user by ID.
pub fn get_user(conn: &Connection, id: i64) -> Result<User, ContentError> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        [id],
        map_row_to_user,
    )
    .optional()?
    .ok_or_else(|| ContentError::NotFound(format!("user {id}")))
}

/// Looks up a user and password hash by e-mail.
pub fn find_credentials(
    conn: &Connection,
    email: &str,
) -> Result<Option<Credentials>, ContentError> {
    let found = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?1"),
            [email],
            |row| {
                Ok(Credentials {
                    user: map_row_to_user(row)?,
                    password_hash: row.get(5)?,
                })
            },
        )
        .optional()?;
    Ok(found)
}

/// Lists users, optionally filtered by a case-insensitive name search.
pub fn list_users(conn: &Connection, list: &ListParams) -> Result<Vec<User>, ContentError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users
         WHERE ?1 IS NULL OR name LIKE ?1 ESCAPE '\\'
         ORDER BY id ASC LIMIT ?2 OFFSET ?3"
    ))?;

    let rows = stmt.query_map(
        params![list.pattern(), list.limit(), list.offset()],
        map_row_to_user,
    )?;
    let mut users = Vec::new();
    for row in rows {
        users.push(row?);
    }
    Ok(users)
}

/// Updates a user. Only fields that are `Some` are written.
pub fn update_user(
    conn: &Connection,
    id: i64,
    updates: &UpdateUserParams,
) -> Result<User, ContentError> {
    conn.query_row(
        &format!(
            "UPDATE users SET
                name = COALESCE(?1, name),
                email = COALESCE(?2, email),
                age = COALESCE(?3, age)
             WHERE id = ?4
             RETURNING {USER_COLUMNS}"
        ),
        params![updates.name, updates.email, updates.age, id],
        map_row_to_user,
    )
    .optional()
    .map_err(map_email_conflict)?
    .ok_or_else(|| ContentError::NotFound(format!("user {id}")))
}

/// Deletes a user. Their posts and comments go with them.
pub fn delete_user(conn: &Connection, id: i64) -> Result<User, ContentError> {
    conn.query_row(
        &format!("DELETE FROM users WHERE id = ?1 RETURNING {USER_COLUMNS}"),
        [id],
        map_row_to_user,
    )
    .optional()?
    .ok_or_else(|| ContentError::NotFound(format!("user {id}")))
}

fn map_email_conflict(err: rusqlite::Error) -> ContentError {
    if is_constraint_violation(&err) {
        ContentError::EmailTaken
    } else {
        ContentError::Database(err)
    }
}

fn map_row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        age: row.get(3)?,
        created_at: row.get(4)?,
    })
}
