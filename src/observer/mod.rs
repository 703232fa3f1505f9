// Observer system: ring-ordered steps that run around each repository call

pub mod context;
pub mod error;
pub mod implementations;
pub mod pipeline;
pub mod traits;

// Re-export core types
pub use context::*;
pub use error::*;
pub use implementations::*;
pub use pipeline::*;
pub use traits::*;
