//! Database layer for the Herald platform.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! and embedded SQL migrations for the `users`, `posts`, and `comments`
//! tables.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: concurrent readers with a single writer, no
//!   external database process.
//! - **`r2d2` connection pool**: bounded connection reuse. Callers on the
//!   async side check connections out inside `spawn_blocking`.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!` so the schema cannot drift from the code reading it.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
