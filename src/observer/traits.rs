use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;

/// Observer rings with semantic meaning. Rings below `Database` run before the
/// statement is executed and can reject it; rings above it run afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ObserverRing {
    InputValidation = 1, // Required fields, ranges, formats
    Security = 2,        // Query scoping: released-only, active-only
    Enrichment = 4,      // Computed fields, defaults, hashing
    Database = 5,        // SQL execution (handled by the repository)
    Audit = 7,           // Append-only audit trail
}

impl ObserverRing {
    pub fn before_database() -> [ObserverRing; 3] {
        [ObserverRing::InputValidation, ObserverRing::Security, ObserverRing::Enrichment]
    }

    pub fn after_database() -> [ObserverRing; 1] {
        [ObserverRing::Audit]
    }

    pub fn is_before_database(&self) -> bool {
        (*self as u8) < (ObserverRing::Database as u8)
    }
}

/// Persistence operations routed through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Create,
    Update,
    Delete,
    Select,
    Aggregate,
}

impl Operation {
    pub fn writes(&self) -> bool {
        matches!(self, Operation::Create | Operation::Update)
    }
}

/// A single before/after persistence step for records of type `R`.
#[async_trait]
pub trait Observer<R: Send + Sync>: Send + Sync {
    /// Observer name for logging and debugging
    fn name(&self) -> &'static str;

    /// Which ring this observer belongs to
    fn ring(&self) -> ObserverRing;

    /// Check if observer applies to this operation
    fn applies_to_operation(&self, op: Operation) -> bool;

    /// Execution timeout (default 5 seconds)
    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    /// Priority within ring (lower numbers execute first)
    fn priority(&self) -> u8 {
        50
    }

    async fn execute(&self, ctx: &mut ObserverContext<R>) -> Result<(), ObserverError>;
}
