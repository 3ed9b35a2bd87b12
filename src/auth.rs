//! Bearer-token authentication.
//!
//! Access tokens are HS256 JWTs carrying the acting person's id, home
//! section and role. Refresh tokens are opaque random strings stored on the
//! person row and rotated on every use. Passwords are stored as salted
//! SHA-256 digests in `salt$hex` form.

use axum::http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use anyhow::{Context, Result};

use crate::api::{ApiError, SharedState};
use crate::errors::AuthError;
use crate::models::{Person, PersonRole};

// ── Access tokens ─────────────────────────────────────────────────────

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Person id.
    pub sub: i64,
    /// Home section, if any.
    pub section_id: Option<i64>,
    /// Role string ("admin" | "worker").
    pub role: String,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
}

pub fn issue_access_token(secret: &str, person: &Person, valid_minutes: i64) -> Result<String> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: person.id,
        section_id: person.section_id,
        role: person.role.as_str().to_string(),
        iat: now,
        exp: now + valid_minutes * 60,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("Failed to sign access token")
}

pub fn verify_access_token(secret: &str, token: &str) -> Result<Claims, AuthError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| AuthError::TokenInvalid(e.to_string()))
}

/// Decode claims from an access token whose expiry may have passed. Used by
/// the refresh flow; the signature is still verified.
pub fn decode_expired_claims(secret: &str, token: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims = std::collections::HashSet::new();
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| AuthError::TokenInvalid(e.to_string()))
}

// ── Refresh tokens ────────────────────────────────────────────────────

/// Opaque refresh token: 64 hex characters of fresh randomness.
pub fn new_refresh_token() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

/// RFC 3339 expiry stamp for a refresh token issued now.
pub fn refresh_expiry(days: i64) -> String {
    (chrono::Utc::now() + chrono::Duration::days(days)).to_rfc3339()
}

/// Whether a stored refresh-token expiry stamp is still in the future.
pub fn refresh_token_live(expires_at: &str) -> bool {
    match chrono::DateTime::parse_from_rfc3339(expires_at) {
        Ok(ts) => ts.with_timezone(&chrono::Utc) > chrono::Utc::now(),
        Err(_) => false,
    }
}

// ── Passwords ─────────────────────────────────────────────────────────

/// Hash a password under a fresh random salt. Stored form: `salt$digest`.
pub fn hash_password(password: &str) -> String {
    let salt = uuid::Uuid::new_v4().simple().to_string();
    format!("{}${}", salt, salted_digest(&salt, password))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, digest)) => salted_digest(salt, password) == digest,
        None => false,
    }
}

fn salted_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

// ── Request extractor ─────────────────────────────────────────────────

/// The authenticated person acting on a request.
///
/// Extracted from the `Authorization: Bearer` header, falling back to an
/// `access_token` query parameter so browser WebSocket clients (which cannot
/// set headers on the upgrade request) can still authenticate.
#[derive(Debug, Clone)]
pub struct Actor {
    pub person_id: i64,
    pub section_id: Option<i64>,
    pub role: PersonRole,
}

impl axum::extract::FromRequestParts<SharedState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;
        let claims = verify_access_token(&state.auth.token_secret, &token)?;
        let role = claims
            .role
            .parse::<PersonRole>()
            .map_err(AuthError::TokenInvalid)?;
        Ok(Actor {
            person_id: claims.sub,
            section_id: claims.section_id,
            role,
        })
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    if let Some(value) = parts.headers.get(axum::http::header::AUTHORIZATION)
        && let Ok(s) = value.to_str()
        && let Some(rest) = s.strip_prefix("Bearer ")
    {
        return Some(rest.trim().to_string());
    }
    parts.uri.query()?.split('&').find_map(|pair| {
        pair.split_once('=')
            .filter(|(key, _)| *key == "access_token")
            .map(|(_, value)| value.to_string())
    })
}

// ── Tests ─────────────────────────────────────────────────────────────
