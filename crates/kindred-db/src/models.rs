//! Database row types. These map directly to SQLite rows and are kept
//! separate from the kindred-types wire models.

use chrono::{DateTime, Utc};

/// Optional free-form profile fields on a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub location: Option<String>,
    pub nickname: Option<String>,
    pub hobbies: Option<String>,
    pub age: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    /// Password digest in PHC string format. Never the plaintext.
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub profile: Profile,
}

#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: i64,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
    pub content: String,
    pub image_base64: Option<String>,
}
