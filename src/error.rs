// HTTP API Error Types
use axum::extract::rejection::JsonRejection;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::{self, Environment};
use crate::database::DatabaseError;
use crate::filter::error::FilterError;
use crate::observer::error::ObserverError;
use crate::services::mailer::MailError;

const GENERIC_MESSAGE: &str = "Something went wrong! Please try again later.";

/// Operational error: an anticipated failure with a status code and a client-safe message
#[derive(Debug, Clone)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError(String),
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 413 Payload Too Large
    PayloadTooLarge(String),

    // 429 Too Many Requests
    TooManyRequests(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError(_) => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::PayloadTooLarge(_) => 413,
            ApiError::TooManyRequests(_) => 429,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError(msg) => msg,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::PayloadTooLarge(msg) => msg,
            ApiError::TooManyRequests(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// "fail" for client errors, "error" for server faults
    pub fn status_label(&self) -> &'static str {
        if self.status_code() >= 500 {
            "error"
        } else {
            "fail"
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "status": self.status_label(),
            "message": self.message(),
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        ApiError::ValidationError(message.into())
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        ApiError::TooManyRequests(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        AppError::Api(self).into_response()
    }
}

/// Every failure a request can hit. Handlers return this and the response
/// layer normalizes it into an `ApiError` before anything reaches the client.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Invalid value for {path}: {value}")]
    InvalidId { path: &'static str, value: String },

    #[error("Validation failed: {}", .0.join(". "))]
    Validation(Vec<String>),

    #[error(transparent)]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<ObserverError> for AppError {
    fn from(err: ObserverError) -> Self {
        match err {
            ObserverError::ValidationError(messages) => AppError::Validation(messages),
            ObserverError::DatabaseError(db) => AppError::Database(db),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(DatabaseError::Sqlx(err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge("Request body is too large".to_string()).into();
        }
        ApiError::invalid_json(rejection.body_text()).into()
    }
}

impl AppError {
    /// Map the failure onto a client-facing operational error.
    pub fn normalize(&self) -> ApiError {
        match self {
            AppError::Api(api) => api.clone(),
            AppError::InvalidId { .. } => ApiError::bad_request(self.to_string()),
            AppError::Validation(messages) => {
                ApiError::validation_error(format!("Invalid input data: {}", messages.join(". ")))
            }
            AppError::Token(err) => match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::unauthorized("JWT has expired. Please log in again.")
                }
                _ => ApiError::unauthorized("Invalid token. Please log in again."),
            },
            AppError::Database(err) => normalize_database_error(err),
            AppError::Filter(err) => ApiError::bad_request(err.to_string()),
            AppError::Mail(_) | AppError::Internal(_) => ApiError::internal_server_error(GENERIC_MESSAGE),
        }
    }

    /// Status code and body for the given environment. The status never
    /// depends on the environment; only the amount of detail does.
    pub fn to_response_parts(&self, environment: Environment) -> (StatusCode, Value) {
        let api_error = self.normalize();
        let status = StatusCode::from_u16(api_error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut body = api_error.to_json();

        if environment == Environment::Development {
            body["error"] = Value::String(self.to_string());
            body["stack"] = json!(self.source_chain());
        }

        (status, body)
    }

    fn source_chain(&self) -> Vec<String> {
        let mut chain = vec![format!("{:?}", self)];
        let mut current = std::error::Error::source(self);
        while let Some(err) = current {
            chain.push(err.to_string());
            current = err.source();
        }
        chain
    }
}

fn normalize_database_error(err: &DatabaseError) -> ApiError {
    let DatabaseError::Sqlx(sqlx_err) = err else {
        return ApiError::internal_server_error(GENERIC_MESSAGE);
    };

    match sqlx_err {
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            // unique_violation
            Some("23505") => {
                let detail = db_err
                    .try_downcast_ref::<sqlx::postgres::PgDatabaseError>()
                    .and_then(|pg| pg.detail());
                let (field, value) = detail
                    .and_then(parse_duplicate_detail)
                    .unwrap_or_else(|| (field_from_constraint(db_err.constraint()), "unknown".to_string()));
                ApiError::bad_request(format!(
                    "Duplicate field value: {} ({}). Please use a different value.",
                    field, value
                ))
            }
            // check_violation, not_null_violation
            Some("23514") | Some("23502") => {
                ApiError::validation_error(format!("Invalid input data: {}", db_err.message()))
            }
            _ => ApiError::internal_server_error(GENERIC_MESSAGE),
        },
        sqlx::Error::PoolTimedOut => ApiError::service_unavailable("Database temporarily unavailable"),
        _ => ApiError::internal_server_error(GENERIC_MESSAGE),
    }
}

/// Extract `(field, value)` from `Key (name)=(Inception) already exists.`
fn parse_duplicate_detail(detail: &str) -> Option<(String, String)> {
    let rest = detail.strip_prefix("Key (")?;
    let (field, rest) = rest.split_once(")=(")?;
    let (value, _) = rest.rsplit_once(") already exists")?;
    Some((field.to_string(), value.to_string()))
}

/// `movies_name_key` -> `name`
fn field_from_constraint(constraint: Option<&str>) -> String {
    constraint
        .and_then(|c| c.strip_suffix("_key"))
        .and_then(|c| c.split_once('_').map(|(_, field)| field.to_string()))
        .unwrap_or_else(|| "field".to_string())
}

// Automatic HTTP response conversion for Axum
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = self.to_response_parts(config::config().environment);

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::errors::{Error as JwtError, ErrorKind};

    #[test]
    fn operational_errors_pass_through() {
        let err = AppError::from(ApiError::not_found("Movie with that ID is not found!"));
        let (status, body) = err.to_response_parts(Environment::Production);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], "Movie with that ID is not found!");
        assert!(body.get("stack").is_none());
    }

    #[test]
    fn invalid_id_becomes_bad_request() {
        let err = AppError::InvalidId { path: "id", value: "abc".to_string() };
        let (status, body) = err.to_response_parts(Environment::Production);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid value for id: abc");
    }

    #[test]
    fn validation_messages_are_joined() {
        let err = AppError::Validation(vec!["Name is a required field!".into(), "Price is a required field!".into()]);
        let api = err.normalize();
        assert_eq!(api.status_code(), 400);
        assert_eq!(
            api.message(),
            "Invalid input data: Name is a required field!. Price is a required field!"
        );
        let body = api.to_json();
        assert_eq!(body.as_object().map(|o| o.len()), Some(2));
    }

    #[test]
    fn rate_limit_is_a_client_failure() {
        let api = ApiError::too_many_requests("Too many requests from this IP, please try again in an hour.");
        assert_eq!(api.status_code(), 429);
        assert_eq!(api.to_json()["status"], "fail");
    }

    #[test]
    fn token_errors_have_distinct_messages() {
        let expired = AppError::Token(JwtError::from(ErrorKind::ExpiredSignature)).normalize();
        let invalid = AppError::Token(JwtError::from(ErrorKind::InvalidSignature)).normalize();
        assert_eq!(expired.status_code(), 401);
        assert_eq!(invalid.status_code(), 401);
        assert_eq!(expired.message(), "JWT has expired. Please log in again.");
        assert_eq!(invalid.message(), "Invalid token. Please log in again.");
    }

    #[test]
    fn unknown_failures_do_not_leak_in_production() {
        let err = AppError::Internal(anyhow::anyhow!("connection string postgres://secret@db"));
        let (status, body) = err.to_response_parts(Environment::Production);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], GENERIC_MESSAGE);
        assert!(!body.to_string().contains("secret"));
    }

    #[test]
    fn development_adds_diagnostics_with_same_status() {
        let err = AppError::Internal(anyhow::anyhow!("disk full"));
        let (status, body) = err.to_response_parts(Environment::Development);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "disk full");
        assert!(body["stack"].as_array().map(|s| !s.is_empty()).unwrap_or(false));
    }

    #[test]
    fn parses_postgres_duplicate_detail() {
        assert_eq!(
            parse_duplicate_detail("Key (name)=(Inception) already exists."),
            Some(("name".to_string(), "Inception".to_string()))
        );
        assert_eq!(parse_duplicate_detail("something else"), None);
    }

    #[test]
    fn derives_field_from_constraint_name() {
        assert_eq!(field_from_constraint(Some("users_email_key")), "email");
        assert_eq!(field_from_constraint(None), "field");
    }
}
