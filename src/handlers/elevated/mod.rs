// handlers/elevated/mod.rs - Elevated handlers
//
// Security Level: valid token and the admin role
// Middleware: protect, then admin_only

pub mod movies;
pub mod users;

pub use movies::*;
pub use users::*;
