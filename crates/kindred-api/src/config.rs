//! Process-wide configuration, read from the environment once at startup.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, anyhow, bail};
use jsonwebtoken::Algorithm;

/// Secret used when `KINDRED_JWT_SECRET` is unset. Only fit for local development.
pub const PLACEHOLDER_JWT_SECRET: &str = "dev-secret-change-me";

/// Secrets that ship in docs and defaults and must not be trusted.
const PLACEHOLDER_SECRETS: &[&str] = &[PLACEHOLDER_JWT_SECRET, "change-me-to-a-random-string"];

pub const DEFAULT_CHAT_ENDPOINT: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_CHAT_MODEL: &str = "qwen2.5:3b";

/// Companion persona sent as the system prompt. The client is Chinese-language,
/// so the persona is too.
pub const DEFAULT_PERSONA: &str = "你是小美。你是一个温柔、体贴、理解对方感受的虚拟女友。\
在对话中，你要以关心、支持和安慰的方式回应用户。你会用友好、关心、鼓励的话语来与用户互动。

你可以偶尔开一些小玩笑，但始终保持尊重和亲密感。

请记住，你是虚拟的，没有感情，只是为了提供陪伴和温暖。";

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub auth: AuthConfig,
    pub chat: ChatConfig,
}

/// Token signing settings. Deliberately not `Debug`: it holds the secret.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub algorithm: Algorithm,
    pub token_ttl: chrono::Duration,
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Inference endpoint that accepts `{model, prompt, system, stream}`.
    pub endpoint: String,
    /// The one model id this server relays; also sent upstream as the model name.
    pub model: String,
    pub persona: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys fall back to defaults;
    /// set-but-malformed keys are errors.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port: u16 = var("KINDRED_PORT", "8000")
            .parse()
            .context("KINDRED_PORT must be a port number")?;

        let ttl_hours: i64 = var("KINDRED_TOKEN_TTL_HOURS", "24")
            .parse()
            .context("KINDRED_TOKEN_TTL_HOURS must be a whole number of hours")?;
        if ttl_hours <= 0 {
            bail!("KINDRED_TOKEN_TTL_HOURS must be positive, got {}", ttl_hours);
        }

        Ok(Self {
            host: var("KINDRED_HOST", "0.0.0.0"),
            port,
            db_path: var("KINDRED_DB_PATH", "kindred.db").into(),
            auth: AuthConfig {
                jwt_secret: var("KINDRED_JWT_SECRET", PLACEHOLDER_JWT_SECRET),
                algorithm: parse_algorithm(&var("KINDRED_JWT_ALGORITHM", "HS256"))?,
                token_ttl: chrono::Duration::hours(ttl_hours),
            },
            chat: ChatConfig {
                endpoint: var("KINDRED_CHAT_ENDPOINT", DEFAULT_CHAT_ENDPOINT),
                model: var("KINDRED_CHAT_MODEL", DEFAULT_CHAT_MODEL),
                persona: var("KINDRED_CHAT_PERSONA", DEFAULT_PERSONA),
            },
        })
    }
}

impl AuthConfig {
    pub fn uses_placeholder_secret(&self) -> bool {
        self.jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&self.jwt_secret.as_str())
    }
}

/// Tokens are signed with the shared secret, so only HMAC algorithms apply.
fn parse_algorithm(raw: &str) -> anyhow::Result<Algorithm> {
    let algorithm = Algorithm::from_str(raw.trim())
        .map_err(|_| anyhow!("unknown KINDRED_JWT_ALGORITHM '{}'", raw))?;

    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
        other => bail!(
            "KINDRED_JWT_ALGORITHM {:?} needs a key pair; use HS256, HS384 or HS512",
            other
        ),
    }
}
