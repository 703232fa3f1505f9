// Ring 2: Hide movies that have not been released yet
use async_trait::async_trait;

use crate::database::models::MovieDraft;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};

/// A movie without a release date counts as unreleased.
pub const RELEASED_PREDICATE: &str = "\"release_date\" <= NOW()";

/// Narrows every read, aggregate, update and delete to released movies
#[derive(Default)]
pub struct ReleasedOnly;

#[async_trait]
impl Observer<MovieDraft> for ReleasedOnly {
    fn name(&self) -> &'static str {
        "ReleasedOnly"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Security
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        !matches!(op, Operation::Create)
    }

    async fn execute(&self, ctx: &mut ObserverContext<MovieDraft>) -> Result<(), ObserverError> {
        let filter = ctx
            .filter
            .as_mut()
            .ok_or_else(|| ObserverError::SystemError("No query to scope".to_string()))?;
        filter.scope(RELEASED_PREDICATE);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;

    #[tokio::test]
    async fn scopes_selects() {
        let mut ctx = ObserverContext::select("movies", Filter::new("movies").unwrap());
        ReleasedOnly.execute(&mut ctx).await.unwrap();
        assert_eq!(ctx.filter.unwrap().scopes(), [RELEASED_PREDICATE.to_string()]);
    }

    #[test]
    fn creates_are_not_scoped() {
        assert!(!ReleasedOnly.applies_to_operation(Operation::Create));
        assert!(ReleasedOnly.applies_to_operation(Operation::Aggregate));
        assert!(ReleasedOnly.applies_to_operation(Operation::Delete));
    }
}
