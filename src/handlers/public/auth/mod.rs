// handlers/public/auth/mod.rs - Public authentication handlers
//
// Token acquisition and password recovery; none of these require a token.

pub mod login;    // POST  /api/v1/auth/login
pub mod password; // POST  /api/v1/auth/forgotPassword, PATCH /api/v1/auth/resetPassword/:token
pub mod session;
pub mod signup;   // POST  /api/v1/auth/signup

pub use login::login_post;
pub use password::{forgot_password_post, reset_password_patch};
pub use session::session_response;
pub use signup::signup_post;
