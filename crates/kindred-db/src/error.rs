use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("username already exists: {0}")]
    DuplicateUsername(String),

    #[error("database schema v{found} is newer than this build supports (v{supported})")]
    SchemaTooNew { found: u32, supported: u32 },

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// True for a UNIQUE constraint violation, as opposed to NOT NULL, CHECK etc.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
