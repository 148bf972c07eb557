//! HS256 access tokens whose subject is the numeric user id.

use crate::config::jwt::JwtConfig;
use anyhow::{anyhow, Context, Result};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: u64,
}

impl TokenKeys {
    fn from_config(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            ttl: config.access_token_expiry,
        }
    }
}

static TOKEN_KEYS: OnceLock<TokenKeys> = OnceLock::new();

/// Build the signing keys. Called once at startup, before serving.
pub fn init_jwt_config(config: JwtConfig) -> Result<()> {
    TOKEN_KEYS
        .set(TokenKeys::from_config(&config))
        .map_err(|_| anyhow!("Token keys already initialized"))
}

fn keys() -> Result<&'static TokenKeys> {
    TOKEN_KEYS
        .get()
        .context("Token keys not initialized, call init_jwt_config() at startup")
}

/// Token lifetime in seconds, also used as the auth cookie max-age.
pub fn access_token_expiry() -> Result<u64> {
    Ok(keys()?.ttl)
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: String,
    iat: i64,
    exp: i64,
}

pub fn encode_access_token(user_id: i32) -> Result<String> {
    let keys = keys()?;
    let now = chrono::Utc::now().timestamp();
    let claims = AccessClaims {
        sub: user_id.to_string(),
        iat: now,
        exp: now.saturating_add(i64::try_from(keys.ttl).unwrap_or(i64::MAX)),
    };

    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
        .context("Failed to sign access token")
}

/// The user a valid, unexpired token was issued to.
pub fn decode_access_token(token: &str) -> Result<i32> {
    let keys = keys()?;
    let data = jsonwebtoken::decode::<AccessClaims>(token, &keys.decoding, &keys.validation)
        .context("Rejected access token")?;
    data.claims
        .sub
        .parse()
        .context("Token subject is not a user id")
}
