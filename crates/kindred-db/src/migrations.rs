//! Schema migrations, tracked in `PRAGMA user_version`.
//!
//! Each entry in [`MIGRATIONS`] moves the schema from version `i` to `i + 1`.
//! Entries are append-only: never edit one that has shipped.

use rusqlite::Connection;
use tracing::info;

use crate::{DbError, Result};

const MIGRATIONS: &[&str] = &[
    // v1: users and posts
    "
    CREATE TABLE IF NOT EXISTS users (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        username    TEXT NOT NULL UNIQUE,
        password    TEXT NOT NULL,
        created_at  TEXT NOT NULL,
        is_active   INTEGER NOT NULL DEFAULT 1,
        location    TEXT,
        nickname    TEXT,
        hobbies     TEXT,
        age         TEXT
    );

    CREATE TABLE IF NOT EXISTS posts (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        user_name       TEXT NOT NULL,
        created_at      TEXT NOT NULL,
        content         TEXT NOT NULL,
        image_base64    TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_posts_created ON posts(created_at);
    ",
    // v2: rewrite zone-less "YYYY-MM-DD HH:MM:SS[.f]" stamps left by older
    // tooling as "YYYY-MM-DDTHH:MM:SS.ffffffZ", so text order is time order
    "
    UPDATE users SET created_at =
        replace(substr(created_at, 1, 19), ' ', 'T')
        || '.' || substr(substr(created_at, 21) || '000000', 1, 6) || 'Z'
    WHERE created_at NOT LIKE '____-__-__T%';

    UPDATE posts SET created_at =
        replace(substr(created_at, 1, 19), ' ', 'T')
        || '.' || substr(substr(created_at, 21) || '000000', 1, 6) || 'Z'
    WHERE created_at NOT LIKE '____-__-__T%';
    ",
];

/// Latest schema version this build knows about.
pub fn latest_version() -> u32 {
    MIGRATIONS.len() as u32
}

/// Bring the schema up to [`latest_version`]. Returns the resulting version.
pub fn run(conn: &mut Connection) -> Result<u32> {
    let current: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    let latest = latest_version();

    if current > latest {
        return Err(DbError::SchemaTooNew {
            found: current,
            supported: latest,
        });
    }

    for (idx, sql) in MIGRATIONS.iter().enumerate().skip(current as usize) {
        let version = idx as u32 + 1;
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
        info!("Applied database migration v{}", version);
    }

    Ok(latest)
}
