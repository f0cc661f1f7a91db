//! SQLite persistence.
//!
//! Each store owns the mutations of its entities; all of them share one pool.
//! Every public store call commits on its own.

mod activity;
mod items;
mod lists;
mod users;

pub use activity::ActivityLog;
pub use items::ItemStore;
pub use lists::{JoinOutcome, ListStore};
pub use users::UserStore;

use std::{path::Path, str::FromStr, sync::Arc, time::Duration};

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

use crate::{access::AccessControl, errors::Error, ports::Clock, Result};

/// Open (creating if needed) the database file and run migrations.
pub async fn connect(db_path: &Path, max_connections: u32) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let path = db_path.to_str().ok_or_else(|| Error::InvalidPath {
        path: db_path.to_path_buf(),
        reason: "path is not valid UTF-8".to_string(),
    })?;

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{path}"))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(30))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

/// Private in-memory database; one connection that never expires.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        external_id INTEGER NOT NULL UNIQUE,
        username TEXT,
        display_name TEXT NOT NULL,
        created_at TEXT NOT NULL,
        current_list_id INTEGER REFERENCES lists(id) ON DELETE SET NULL,
        conversation_state TEXT NOT NULL DEFAULT 'none',
        pending_action TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS lists (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        creator_id INTEGER NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
        share_token TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS memberships (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        list_id INTEGER NOT NULL REFERENCES lists(id) ON DELETE CASCADE,
        role TEXT NOT NULL,
        joined_at TEXT NOT NULL,
        UNIQUE (user_id, list_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        list_id INTEGER NOT NULL REFERENCES lists(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        is_checked INTEGER NOT NULL DEFAULT 0,
        is_hidden INTEGER NOT NULL DEFAULT 0,
        added_by INTEGER NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
        added_at TEXT NOT NULL,
        order_index INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS activity_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        list_id INTEGER NOT NULL REFERENCES lists(id) ON DELETE CASCADE,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
        action TEXT NOT NULL,
        details TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_memberships_list ON memberships(list_id)",
    "CREATE INDEX IF NOT EXISTS idx_items_list_order ON items(list_id, order_index)",
    "CREATE INDEX IF NOT EXISTS idx_activity_list_created ON activity_logs(list_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_activity_created ON activity_logs(created_at)",
];

/// Idempotent schema setup.
async fn migrate(pool: &SqlitePool) -> Result<()> {
    for stmt in SCHEMA {
        sqlx::query(stmt).execute(pool).await?;
    }
    Ok(())
}

/// All stores over one pool and clock.
#[derive(Clone)]
pub struct Stores {
    pub users: UserStore,
    pub lists: ListStore,
    pub items: ItemStore,
    pub activity: ActivityLog,
    pub access: AccessControl,
}

impl Stores {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        let access = AccessControl::new(pool.clone());
        Self {
            users: UserStore::new(pool.clone(), clock.clone()),
            lists: ListStore::new(pool.clone(), clock.clone(), access.clone()),
            items: ItemStore::new(pool.clone(), clock.clone()),
            activity: ActivityLog::new(pool, clock),
            access,
        }
    }
}
