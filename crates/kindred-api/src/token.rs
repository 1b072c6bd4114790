use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use kindred_types::api::Claims;

use crate::config::AuthConfig;

/// Sign a session token for `username`, valid for the configured lifetime.
pub fn issue_token(config: &AuthConfig, username: &str) -> jsonwebtoken::errors::Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: username.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + config.token_ttl).timestamp() as usize,
    };

    encode(
        &Header::new(config.algorithm),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

/// Check signature, algorithm and expiry.
pub fn verify_token(config: &AuthConfig, token: &str) -> jsonwebtoken::errors::Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::new(config.algorithm),
    )?;
    Ok(data.claims)
}
