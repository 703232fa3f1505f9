// Ring 2: Hide deactivated accounts
use async_trait::async_trait;

use crate::database::models::UserDraft;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};

pub const ACTIVE_PREDICATE: &str = "\"active\" IS NOT FALSE";

/// Reads and updates only ever see active accounts
#[derive(Default)]
pub struct ActiveOnly;

#[async_trait]
impl Observer<UserDraft> for ActiveOnly {
    fn name(&self) -> &'static str {
        "ActiveOnly"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Security
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Select | Operation::Update)
    }

    async fn execute(&self, ctx: &mut ObserverContext<UserDraft>) -> Result<(), ObserverError> {
        if let Some(filter) = ctx.filter.as_mut() {
            filter.scope(ACTIVE_PREDICATE);
        }
        Ok(())
    }
}
