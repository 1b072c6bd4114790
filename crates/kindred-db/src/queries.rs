use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::is_unique_violation;
use crate::models::{PostRow, Profile, UserRow};
use crate::{Database, DbError, Result};

const USER_COLUMNS: &str =
    "id, username, password, created_at, is_active, location, nickname, hobbies, age";

const POST_COLUMNS: &str = "id, user_name, created_at, content, image_base64";

impl Database {
    // -- Users --

    pub fn find_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    /// Insert a new active user. Fails with [`DbError::DuplicateUsername`]
    /// if the name is already registered.
    pub fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        profile: &Profile,
    ) -> Result<UserRow> {
        self.with_tx(|conn| {
            let sql = format!(
                "INSERT INTO users (username, password, created_at, location, nickname, hobbies, age)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 RETURNING {USER_COLUMNS}"
            );
            conn.query_row(
                &sql,
                rusqlite::params![
                    username,
                    password_hash,
                    timestamp_now(),
                    profile.location,
                    profile.nickname,
                    profile.hobbies,
                    profile.age,
                ],
                map_user,
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DbError::DuplicateUsername(username.to_string())
                } else {
                    e.into()
                }
            })
        })
    }

    // -- Posts --

    /// Newest first, at most `limit` rows.
    pub fn list_recent_posts(&self, limit: u32) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| query_recent_posts(conn, limit))
    }

    pub fn create_post(
        &self,
        user_name: &str,
        content: &str,
        image_base64: Option<&str>,
    ) -> Result<PostRow> {
        self.with_tx(|conn| {
            let sql = format!(
                "INSERT INTO posts (user_name, created_at, content, image_base64)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING {POST_COLUMNS}"
            );
            let row = conn.query_row(
                &sql,
                rusqlite::params![user_name, timestamp_now(), content, image_base64],
                map_post,
            )?;
            Ok(row)
        })
    }
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = ?1"
    ))?;

    let row = stmt.query_row([username], map_user).optional()?;
    Ok(row)
}

fn query_recent_posts(conn: &Connection, limit: u32) -> Result<Vec<PostRow>> {
    // id breaks ties between posts stamped within the same microsecond
    let mut stmt = conn.prepare(&format!(
        "SELECT {POST_COLUMNS} FROM posts
         ORDER BY created_at DESC, id DESC
         LIMIT ?1"
    ))?;

    let rows = stmt
        .query_map([limit], map_post)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        created_at: timestamp_at(row, 3)?,
        is_active: row.get(4)?,
        profile: Profile {
            location: row.get(5)?,
            nickname: row.get(6)?,
            hobbies: row.get(7)?,
            age: row.get(8)?,
        },
    })
}

fn map_post(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        user_name: row.get(1)?,
        created_at: timestamp_at(row, 2)?,
        content: row.get(3)?,
        image_base64: row.get(4)?,
    })
}

/// Fixed-width RFC 3339, so lexical order on the column is chronological.
fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Zone-less "YYYY-MM-DD HH:MM:SS[.ffffff]" is UTC. Migration v2
            // rewrites such rows; this covers any inserted by hand since.
            NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f").map(|ndt| ndt.and_utc())
        })
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
