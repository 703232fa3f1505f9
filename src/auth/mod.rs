pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config;
use crate::error::AppError;

pub const AUTH_COOKIE: &str = "jwt";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    pub iat: i64,
    pub exp: i64,
    /// Issue time in milliseconds; `iat` alone is too coarse for the password-change check
    #[serde(default)]
    pub iat_ms: i64,
}

impl Claims {
    pub fn new(id: Uuid, lifetime_secs: i64) -> Self {
        let now = Utc::now();
        Self {
            id,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(lifetime_secs)).timestamp(),
            iat_ms: now.timestamp_millis(),
        }
    }

    /// Millisecond issue time, falling back to `iat` for tokens without `iat_ms`
    pub fn issued_at_millis(&self) -> i64 {
        if self.iat_ms > 0 {
            self.iat_ms
        } else {
            self.iat * 1000
        }
    }
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    InvalidSecret,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::InvalidSecret => write!(f, "Invalid JWT secret"),
        }
    }
}

impl std::error::Error for JwtError {}

impl From<JwtError> for AppError {
    fn from(err: JwtError) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Check signature and expiry. The error kind tells expired tokens apart from forged ones.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.leeway = 0;
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)?;
    Ok(data.claims)
}

/// Token for `user_id` with the configured secret and lifetime
pub fn sign_token(user_id: Uuid) -> Result<String, JwtError> {
    let security = &config::config().security;
    generate_jwt(&Claims::new(user_id, security.jwt_expires_in_secs), &security.jwt_secret)
}

pub fn verify_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    verify_jwt(token, &config::config().security.jwt_secret)
}

/// `Set-Cookie` value carrying the session token
pub fn auth_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!("{}={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax", AUTH_COOKIE, token, max_age_secs);
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Bearer <token>` -> `<token>`; anything else is treated as no token
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme == "Bearer" && !token.is_empty()).then_some(token)
}
