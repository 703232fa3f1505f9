pub mod auth;
pub mod rate_limit;
pub mod response;

pub use auth::{admin_only, protect, restrict_to, CurrentUser};
pub use rate_limit::{rate_limit, RateLimiter};
pub use response::{ApiResponse, ApiResult};
