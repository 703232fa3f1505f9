use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{User, UserDraft, USERS_TABLE};
use crate::database::movie_repository::{missing_filter, missing_record, scope_sql};
use crate::database::query_builder::{bind_param_query_as, QueryBuilder};
use crate::error::AppResult;
use crate::filter::types::{FilterOrderInfo, SortDirection};
use crate::filter::Filter;
use crate::observer::{ActiveOnly, ObserverContext, ObserverPipeline, PasswordConfirmation, PasswordHashing};

/// User persistence. Validation, hashing and the active-only rule run as observers;
/// reset-token bookkeeping writes directly.
pub struct UserRepository {
    pool: PgPool,
    pipeline: ObserverPipeline<UserDraft>,
}

impl UserRepository {
    pub fn new(pool: PgPool, bcrypt_cost: u32) -> Self {
        let mut pipeline = ObserverPipeline::new();
        pipeline
            .register_observer(PasswordConfirmation)
            .register_observer(ActiveOnly)
            .register_observer(PasswordHashing::new(bcrypt_cost));
        Self { pool, pipeline }
    }

    fn filter() -> AppResult<Filter> {
        let mut filter = Filter::new(USERS_TABLE)?;
        filter.cast("id", "uuid").cast("password_reset_token_expires", "timestamptz");
        Ok(filter)
    }

    pub async fn create(&self, draft: UserDraft) -> AppResult<User> {
        let mut ctx = ObserverContext::create(USERS_TABLE, draft);
        self.pipeline.run_before(&mut ctx).await?;

        let draft = ctx.record.as_ref().ok_or_else(missing_record)?;
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO \"users\" (\"id\", \"name\", \"email\", \"photo\", \"role\", \"password_hash\") \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&draft.name)
        .bind(&draft.email)
        .bind(&draft.photo)
        .bind(draft.role.unwrap_or_default().as_str())
        .bind(&draft.password_hash)
        .fetch_one(&self.pool)
        .await?;
        tracing::info!("Created user {} with role {}", user.id, user.role.as_str());

        self.pipeline.run_after(&mut ctx).await;
        Ok(user)
    }

    async fn select(&self, filter: Filter) -> AppResult<Vec<User>> {
        let mut ctx = ObserverContext::select(USERS_TABLE, filter);
        self.pipeline.run_before(&mut ctx).await?;

        let filter = ctx.take_filter().ok_or_else(missing_filter)?;
        let users = QueryBuilder::<User>::new(filter).select_all(&self.pool).await?;

        self.pipeline.run_after(&mut ctx).await;
        Ok(users)
    }

    pub async fn find_all(&self) -> AppResult<Vec<User>> {
        let mut filter = Self::filter()?;
        filter.order(vec![FilterOrderInfo { column: "created_at".to_string(), sort: SortDirection::Asc }])?;
        self.select(filter).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let mut filter = Self::filter()?;
        filter.where_clause(json!({ "id": id.to_string() }))?;
        Ok(self.select(filter).await?.into_iter().next())
    }

    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let mut filter = Self::filter()?;
        filter.where_clause(json!({ "email": email.trim().to_lowercase() }))?;
        Ok(self.select(filter).await?.into_iter().next())
    }

    /// User holding this hashed reset token, if it has not expired
    pub async fn find_by_reset_token(&self, hashed_token: &str) -> AppResult<Option<User>> {
        let mut filter = Self::filter()?;
        filter.where_clause(json!({
            "password_reset_token": hashed_token,
            "password_reset_token_expires": { "$gte": Utc::now().to_rfc3339() },
        }))?;
        Ok(self.select(filter).await?.into_iter().next())
    }

    /// Name and email only; anything else in the draft is ignored
    pub async fn update_profile(&self, id: Uuid, draft: UserDraft) -> AppResult<Option<User>> {
        let profile = UserDraft { name: draft.name, email: draft.email, ..Default::default() };
        let mut ctx = ObserverContext::update(USERS_TABLE, profile, Self::filter()?);
        self.pipeline.run_before(&mut ctx).await?;

        let scope = scope_sql(ctx.filter.as_ref().ok_or_else(missing_filter)?, 3)?;
        let profile = ctx.record.as_ref().ok_or_else(missing_record)?;
        let query = format!(
            "UPDATE \"users\" SET \"name\" = COALESCE($2, \"name\"), \"email\" = COALESCE($3, \"email\") \
             WHERE \"id\" = $1{} RETURNING *",
            scope.query
        );
        let mut q = sqlx::query_as::<_, User>(&query).bind(id).bind(&profile.name).bind(&profile.email);
        for p in scope.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let user = q.fetch_optional(&self.pool).await?;

        self.pipeline.run_after(&mut ctx).await;
        Ok(user)
    }

    /// Validate, hash and store a new password. Any pending reset token is consumed.
    pub async fn update_password(
        &self,
        id: Uuid,
        password: &str,
        confirm_password: &str,
    ) -> AppResult<Option<User>> {
        let draft = UserDraft::with_password(password, confirm_password);
        let mut ctx = ObserverContext::update(USERS_TABLE, draft, Self::filter()?);
        self.pipeline.run_before(&mut ctx).await?;

        let scope = scope_sql(ctx.filter.as_ref().ok_or_else(missing_filter)?, 3)?;
        let draft = ctx.record.as_ref().ok_or_else(missing_record)?;
        let query = format!(
            "UPDATE \"users\" SET \"password_hash\" = $2, \"password_changed_at\" = $3, \
             \"password_reset_token\" = NULL, \"password_reset_token_expires\" = NULL \
             WHERE \"id\" = $1{} RETURNING *",
            scope.query
        );
        let changed_at = draft.password_changed_at.unwrap_or_else(Utc::now);
        let mut q = sqlx::query_as::<_, User>(&query).bind(id).bind(&draft.password_hash).bind(changed_at);
        for p in scope.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let user = q.fetch_optional(&self.pool).await?;

        self.pipeline.run_after(&mut ctx).await;
        Ok(user)
    }

    /// Soft delete: the row stays, reads stop seeing it
    pub async fn deactivate(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("UPDATE \"users\" SET \"active\" = FALSE WHERE \"id\" = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_reset_token(&self, id: Uuid, hashed_token: &str, expires: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "UPDATE \"users\" SET \"password_reset_token\" = $2, \"password_reset_token_expires\" = $3 \
             WHERE \"id\" = $1",
        )
        .bind(id)
        .bind(hashed_token)
        .bind(expires)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn clear_reset_token(&self, id: Uuid) -> AppResult<()> {
        sqlx::query(
            "UPDATE \"users\" SET \"password_reset_token\" = NULL, \"password_reset_token_expires\" = NULL \
             WHERE \"id\" = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn unreachable_pool() -> PgPool {
        sqlx::postgres::PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(100))
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap()
    }

    #[tokio::test]
    async fn mismatched_passwords_fail_before_any_sql() {
        let repo = UserRepository::new(unreachable_pool(), 4);
        let err = repo.update_password(Uuid::new_v4(), "pass1234", "pass9999").await.unwrap_err();
        match err {
            AppError::Validation(messages) => assert_eq!(messages, vec!["Passwords do not match!"]),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn signup_without_fields_is_rejected() {
        let repo = UserRepository::new(unreachable_pool(), 4);
        assert!(matches!(repo.create(UserDraft::default()).await, Err(AppError::Validation(_))));
    }

    #[test]
    fn reset_token_lookup_casts_expiry() {
        let mut filter = UserRepository::filter().unwrap();
        filter
            .where_clause(json!({ "password_reset_token_expires": { "$gte": "2030-01-01T00:00:00Z" } }))
            .unwrap();
        let sql = filter.to_sql().unwrap();
        assert!(sql.query.contains("\"password_reset_token_expires\" >= $1::timestamptz"));
    }
}
