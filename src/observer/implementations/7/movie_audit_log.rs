// Ring 7: Append movie activity to the audit log
use std::sync::Arc;

use async_trait::async_trait;

use crate::database::models::MovieDraft;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};
use crate::services::AuditLog;

pub struct MovieAuditLog {
    log: Arc<AuditLog>,
}

impl MovieAuditLog {
    pub fn new(log: Arc<AuditLog>) -> Self {
        Self { log }
    }

    fn entry(ctx: &ObserverContext<MovieDraft>) -> Option<String> {
        match ctx.operation {
            Operation::Create => {
                let draft = ctx.record.as_ref()?;
                Some(format!(
                    "A new movie document with name {} has been created by {}",
                    draft.name.as_deref().unwrap_or_default(),
                    draft.created_by.as_deref().unwrap_or_default()
                ))
            }
            Operation::Select => Some(format!(
                "Query took {} milliseconds to fetch the documents.",
                ctx.execution_time().as_millis()
            )),
            _ => None,
        }
    }
}

#[async_trait]
impl Observer<MovieDraft> for MovieAuditLog {
    fn name(&self) -> &'static str {
        "MovieAuditLog"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Audit
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Select)
    }

    async fn execute(&self, ctx: &mut ObserverContext<MovieDraft>) -> Result<(), ObserverError> {
        let Some(entry) = Self::entry(ctx) else {
            return Ok(());
        };
        self.log
            .append(&entry)
            .await
            .map_err(|e| ObserverError::SystemError(format!("audit log write failed: {}", e)))
    }
}
