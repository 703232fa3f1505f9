// Ring 4: Stamp who created a movie
use async_trait::async_trait;

use crate::database::models::MovieDraft;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};

pub struct MovieAttribution {
    created_by: String,
}

impl MovieAttribution {
    pub fn new(created_by: impl Into<String>) -> Self {
        Self { created_by: created_by.into() }
    }
}

impl Default for MovieAttribution {
    fn default() -> Self {
        Self::new(crate::config::config().audit.movie_created_by.clone())
    }
}

#[async_trait]
impl Observer<MovieDraft> for MovieAttribution {
    fn name(&self) -> &'static str {
        "MovieAttribution"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Enrichment
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create)
    }

    async fn execute(&self, ctx: &mut ObserverContext<MovieDraft>) -> Result<(), ObserverError> {
        if let Some(draft) = ctx.record_mut() {
            draft.created_by = Some(self.created_by.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn overrides_any_existing_value() {
        let draft = MovieDraft { created_by: Some("someone".into()), ..Default::default() };
        let mut ctx = ObserverContext::create("movies", draft);
        MovieAttribution::new("DIBAKAR").execute(&mut ctx).await.unwrap();
        assert_eq!(ctx.record.unwrap().created_by.as_deref(), Some("DIBAKAR"));
    }
}
