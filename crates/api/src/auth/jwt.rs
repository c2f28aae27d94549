//! HS256 JWTs.
//!
//! Access tokens carry the user's id and role. Invite tokens carry only the
//! user id and the `invite` purpose, and are accepted by nothing except
//! `POST /auth/accept-invite`.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use schoolnet_core::types::DbId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// The user's database id.
    pub sub: DbId,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    /// Unique token id, for audit.
    pub jti: String,
}

/// Claims of an invite token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InviteClaims {
    pub sub: DbId,
    pub purpose: String,
    pub exp: i64,
    pub iat: i64,
}

const INVITE_PURPOSE: &str = "invite";

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Access token lifetime in minutes (default: 60).
    pub access_token_expiry_mins: i64,
    /// Invite token lifetime in days (default: 30).
    pub invite_token_expiry_days: i64,
}

const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 60;
const DEFAULT_INVITE_EXPIRY_DAYS: i64 = 30;

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                   | Required | Default |
    /// |---------------------------|----------|---------|
    /// | `JWT_SECRET`              | **yes**  | --      |
    /// | `JWT_ACCESS_EXPIRY_MINS`  | no       | `60`    |
    /// | `JWT_INVITE_EXPIRY_DAYS`  | no       | `30`    |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let access_token_expiry_mins: i64 = std::env::var("JWT_ACCESS_EXPIRY_MINS")
            .unwrap_or_else(|_| DEFAULT_ACCESS_EXPIRY_MINS.to_string())
            .parse()
            .expect("JWT_ACCESS_EXPIRY_MINS must be a valid i64");

        let invite_token_expiry_days: i64 = std::env::var("JWT_INVITE_EXPIRY_DAYS")
            .unwrap_or_else(|_| DEFAULT_INVITE_EXPIRY_DAYS.to_string())
            .parse()
            .expect("JWT_INVITE_EXPIRY_DAYS must be a valid i64");

        Self {
            secret,
            access_token_expiry_mins,
            invite_token_expiry_days,
        }
    }
}

pub fn generate_access_token(
    user_id: DbId,
    role: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        exp: now + config.access_token_expiry_mins * 60,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Validate and decode an access token.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

pub fn generate_invite_token(
    user_id: DbId,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = InviteClaims {
        sub: user_id,
        purpose: INVITE_PURPOSE.to_string(),
        exp: now + config.invite_token_expiry_days * 86_400,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Validate an invite token and return the invited user's id.
///
/// Returns `None` for anything that is not a live invite token, including
/// valid access tokens.
pub fn validate_invite_token(token: &str, config: &JwtConfig) -> Option<DbId> {
    let data = decode::<InviteClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;
    (data.claims.purpose == INVITE_PURPOSE).then_some(data.claims.sub)
}
