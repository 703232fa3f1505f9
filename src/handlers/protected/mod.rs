// handlers/protected/mod.rs - Protected handlers
//
// Security Level: valid token for an active user
// Middleware: protect

pub mod movies;
pub mod user;

pub use movies::*;
pub use user::*;
