// Ring 4: Replace the plaintext password with its bcrypt hash
use async_trait::async_trait;
use chrono::Utc;

use crate::auth::password::hash_password;
use crate::database::models::UserDraft;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};

/// Hashes `password`, drops both plaintext fields, and on updates stamps
/// `password_changed_at`.
pub struct PasswordHashing {
    cost: u32,
}

impl PasswordHashing {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for PasswordHashing {
    fn default() -> Self {
        Self::new(crate::config::config().security.bcrypt_cost)
    }
}

#[async_trait]
impl Observer<UserDraft> for PasswordHashing {
    fn name(&self) -> &'static str {
        "PasswordHashing"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Enrichment
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        op.writes()
    }

    // bcrypt at production cost can be slow on small machines
    fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(15)
    }

    async fn execute(&self, ctx: &mut ObserverContext<UserDraft>) -> Result<(), ObserverError> {
        let updating = ctx.operation == Operation::Update;
        let Some(draft) = ctx.record_mut() else {
            return Ok(());
        };
        let Some(password) = draft.password.take() else {
            return Ok(());
        };

        let hash = hash_password(&password, self.cost)
            .await
            .map_err(|e| ObserverError::SystemError(e.to_string()))?;
        draft.password_hash = Some(hash);
        draft.confirm_password = None;

        if updating {
            draft.password_changed_at = Some(Utc::now());
        }
        Ok(())
    }
}
