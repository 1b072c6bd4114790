use std::sync::LazyLock;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State};
use tracing::{info, warn};

use kindred_db::Database;
use kindred_db::models::{Profile, UserRow};
use kindred_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, UserResponse};

use crate::config::AuthConfig;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::token::issue_token;
use crate::{AppState, run_blocking};

/// Digest verified against when the username is unknown, so that a miss
/// costs the same as a wrong password.
static DUMMY_DIGEST: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("kindred-dummy-password").ok());

pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "username and password are required".into(),
        ));
    }

    let user = run_blocking(move || register_user(&state.db, req)).await?;
    Ok(Json(user_view(user)))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let response = run_blocking(move || login_user(&state.db, &state.auth, &req)).await?;
    Ok(Json(response))
}

/// The caller's own user record. Mounted behind `require_auth`.
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = run_blocking(move || {
        state
            .db
            .find_user_by_username(&claims.sub)?
            .ok_or(ApiError::Unauthorized)
    })
    .await?;

    Ok(Json(user_view(user)))
}

/// Create a user with a freshly salted Argon2id digest.
pub fn register_user(db: &Database, req: RegisterRequest) -> Result<UserRow, ApiError> {
    if db.find_user_by_username(&req.username)?.is_some() {
        info!(username = %req.username, "registration rejected: username taken");
        return Err(ApiError::UsernameTaken);
    }

    let digest = hash_password(&req.password)?;
    let profile = Profile {
        location: req.location,
        nickname: req.nickname,
        hobbies: req.hobbies,
        age: req.age,
    };

    // The UNIQUE constraint still catches a registration that raced past the lookup
    let user = db.create_user(&req.username, &digest, &profile)?;
    info!(username = %user.username, user_id = user.id, "user registered");
    Ok(user)
}

/// Verify credentials and issue a session token. Unknown user and wrong
/// password both fail with [`ApiError::InvalidCredentials`].
pub fn login_user(
    db: &Database,
    config: &AuthConfig,
    req: &LoginRequest,
) -> Result<LoginResponse, ApiError> {
    let Some(user) = db.find_user_by_username(&req.username)? else {
        if let Some(dummy) = DUMMY_DIGEST.as_deref() {
            let _ = verify_password(&req.password, dummy);
        }
        info!(username = %req.username, "login rejected");
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(&req.password, &user.password)? {
        info!(username = %req.username, "login rejected");
        return Err(ApiError::InvalidCredentials);
    }

    let access_token = issue_token(config, &user.username)
        .map_err(|e| ApiError::Internal(format!("token signing failed: {}", e)))?;

    info!(username = %user.username, "user logged in");

    let profile = user.profile;
    Ok(LoginResponse {
        access_token,
        token_type: "bearer".to_string(),
        user_id: user.id,
        username: user.username,
        location: profile.location.unwrap_or_default(),
        nickname: profile.nickname.unwrap_or_default(),
        hobbies: profile.hobbies.unwrap_or_default(),
        age: profile.age.unwrap_or_default(),
    })
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))
}

fn verify_password(password: &str, digest: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(digest).map_err(|e| {
        warn!("stored password digest is unreadable: {}", e);
        ApiError::Internal(format!("bad password digest: {}", e))
    })?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn user_view(user: UserRow) -> UserResponse {
    UserResponse {
        id: user.id,
        username: user.username,
        created_at: user.created_at,
        is_active: user.is_active,
        location: user.profile.location,
        nickname: user.profile.nickname,
        hobbies: user.profile.hobbies,
        age: user.profile.age,
    }
}
