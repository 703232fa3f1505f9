use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const USERS_TABLE: &str = "users";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub photo: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_changed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub password_reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub password_reset_token_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// True when the password changed after a token issued at `issued_at_ms` (unix milliseconds)
    pub fn changed_password_after(&self, issued_at_ms: i64) -> bool {
        self.password_changed_at
            .map(|changed| issued_at_ms < changed.timestamp_millis())
            .unwrap_or(false)
    }
}

/// Incoming user attributes. The password pair is consumed by the observers;
/// only `password_hash` ever reaches the database.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDraft {
    pub name: Option<String>,
    pub email: Option<String>,
    pub photo: Option<String>,
    pub role: Option<Role>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,

    #[serde(skip)]
    pub password_hash: Option<String>,
    #[serde(skip)]
    pub password_changed_at: Option<DateTime<Utc>>,
}

impl UserDraft {
    pub fn with_password(password: impl Into<String>, confirm_password: impl Into<String>) -> Self {
        Self {
            password: Some(password.into()),
            confirm_password: Some(confirm_password.into()),
            ..Default::default()
        }
    }
}
