use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- Session --

/// Claims carried by an issued session token. `sub` is the username.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

// -- Errors --

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub hobbies: Option<String>,
    #[serde(default)]
    pub age: Option<String>,
}

/// Public view of a user. Never carries the password digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub location: Option<String>,
    pub nickname: Option<String>,
    pub hobbies: Option<String>,
    pub age: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Profile fields are flattened to empty strings when unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user_id: i64,
    pub username: String,
    pub location: String,
    pub nickname: String,
    pub hobbies: String,
    pub age: String,
}

// -- Posts --

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub user_name: String,
    pub content: String,
    #[serde(default)]
    pub image_base64: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: i64,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
    pub content: String,
    pub image_base64: Option<String>,
}

// -- Chat --

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub prompt: String,
}

/// Outcome of a relayed chat prompt. All three shapes are served with 200.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatResponse {
    /// Upstream answered 200; `data` is its body, verbatim.
    Completed { data: String, llms_name: String },

    /// Upstream answered with another status, or could not be reached.
    Failed {
        item_name: String,
        error: u16,
        data: String,
    },

    /// The path named a model this server does not relay to.
    PassThrough { item_name: String, llms_name: String },
}
