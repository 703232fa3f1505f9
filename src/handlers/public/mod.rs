// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Security Level: None
// Middleware: None

pub mod auth;
pub mod movies;

pub use auth::*;
pub use movies::*;
