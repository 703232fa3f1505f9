pub mod format;
pub mod json;

pub use json::ApiJson;

use uuid::Uuid;

use crate::error::AppError;

/// Parse a path identifier, reporting which parameter was malformed
pub fn parse_id(path: &'static str, raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::InvalidId { path, value: raw.to_string() })
}
