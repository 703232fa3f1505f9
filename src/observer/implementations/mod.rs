// Observer implementations organized by rings
// Each ring handles a specific phase of a repository call

// Ring 1: Input validation
#[path = "1/movie_validation.rs"]
pub mod movie_validation;
#[path = "1/password_confirmation.rs"]
pub mod password_confirmation;

// Ring 2: Security - query scoping
#[path = "2/active_only.rs"]
pub mod active_only;
#[path = "2/released_only.rs"]
pub mod released_only;

// Ring 4: Enrichment - server-side values
#[path = "4/movie_attribution.rs"]
pub mod movie_attribution;
#[path = "4/password_hashing.rs"]
pub mod password_hashing;

// Ring 7: Audit
#[path = "7/movie_audit_log.rs"]
pub mod movie_audit_log;

pub use active_only::*;
pub use movie_attribution::*;
pub use movie_audit_log::*;
pub use movie_validation::*;
pub use password_confirmation::*;
pub use password_hashing::*;
pub use released_only::*;
