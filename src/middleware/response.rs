use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Success envelope: `{ "status": "success", <meta>..., "data": ... }`
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: Option<T>,
    pub status_code: Option<StatusCode>,
    meta: Map<String, Value>,
    cookie: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            status_code: None, // Default to 200 OK
            meta: Map::new(),
            cookie: None,
        }
    }

    /// Create an API response with custom status code
    pub fn with_status(data: T, status_code: StatusCode) -> Self {
        Self { status_code: Some(status_code), ..Self::success(data) }
    }

    /// Create a 201 Created response
    pub fn created(data: T) -> Self {
        Self::with_status(data, StatusCode::CREATED)
    }

    /// Top-level field next to `status` and `data` (`results`, `token`, ...)
    pub fn meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.meta.insert(key.to_string(), value.into());
        self
    }

    /// Attach a `Set-Cookie` header
    pub fn cookie(mut self, cookie: String) -> Self {
        self.cookie = Some(cookie);
        self
    }
}

impl ApiResponse<()> {
    /// Create a 204 No Content response
    pub fn no_content() -> Self {
        Self { data: None, status_code: Some(StatusCode::NO_CONTENT), meta: Map::new(), cookie: None }
    }

    /// `{ "status": "success", "message": ... }` with no data
    pub fn message(message: impl Into<String>) -> Self {
        Self { data: None, status_code: None, meta: Map::new(), cookie: None }.meta("message", message.into())
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        let mut response = if status == StatusCode::NO_CONTENT {
            status.into_response()
        } else {
            let mut envelope = self.meta;
            envelope.insert("status".to_string(), json!("success"));

            if let Some(data) = &self.data {
                match serde_json::to_value(data) {
                    Ok(value) => {
                        envelope.insert("data".to_string(), value);
                    }
                    Err(e) => {
                        tracing::error!("Failed to serialize response data: {}", e);
                        return (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(json!({
                                "status": "error",
                                "message": "Something went wrong! Please try again later."
                            })),
                        )
                            .into_response();
                    }
                }
            }

            (status, Json(Value::Object(envelope))).into_response()
        };

        if let Some(cookie) = self.cookie {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    response.headers_mut().insert(header::SET_COOKIE, value);
                }
                Err(e) => tracing::warn!("Dropping malformed cookie: {}", e),
            }
        }
        response
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::AppError>;
