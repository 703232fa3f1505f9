use std::sync::Arc;

use serde_json::{json, Value};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::database::models::movie::document_from_row;
use crate::database::models::{GenreGroup, Movie, MovieDraft, MovieStats, MOVIES_TABLE};
use crate::database::query_builder::{bind_param_query, bind_param_query_as, QueryBuilder};
use crate::error::{AppError, AppResult};
use crate::filter::{Filter, QueryModifier};
use crate::observer::{
    MovieAttribution, MovieAuditLog, MovieValidation, ObserverContext, ObserverPipeline, ReleasedOnly,
};
use crate::services::AuditLog;

const UPDATABLE_PARAMS: usize = 16;

/// Movie persistence. Every call goes through the movie observer pipeline.
pub struct MovieRepository {
    pool: PgPool,
    pipeline: ObserverPipeline<MovieDraft>,
}

impl MovieRepository {
    pub fn new(pool: PgPool, audit: Arc<AuditLog>, created_by: impl Into<String>) -> Self {
        let mut pipeline = ObserverPipeline::new();
        pipeline
            .register_observer(MovieValidation)
            .register_observer(ReleasedOnly)
            .register_observer(MovieAttribution::new(created_by))
            .register_observer(MovieAuditLog::new(audit));
        Self::with_pipeline(pool, pipeline)
    }

    pub fn with_pipeline(pool: PgPool, pipeline: ObserverPipeline<MovieDraft>) -> Self {
        Self { pool, pipeline }
    }

    /// Empty query over the movies table with the casts list filters need
    pub fn filter() -> AppResult<Filter> {
        let mut filter = Filter::new(MOVIES_TABLE)?;
        filter.cast("id", "uuid");
        Ok(filter)
    }

    pub async fn create(&self, draft: MovieDraft) -> AppResult<Movie> {
        let mut ctx = ObserverContext::create(MOVIES_TABLE, draft);
        self.pipeline.run_before(&mut ctx).await?;

        let draft = ctx.record.as_ref().ok_or_else(missing_record)?;
        let movie = insert(&self.pool, draft).await?;
        tracing::info!("Created movie {} ({})", movie.name, movie.id);

        self.pipeline.run_after(&mut ctx).await;
        Ok(movie)
    }

    /// All-or-nothing bulk insert; one invalid movie rejects the batch.
    pub async fn insert_many(&self, drafts: Vec<MovieDraft>) -> AppResult<usize> {
        let mut contexts = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let mut ctx = ObserverContext::create(MOVIES_TABLE, draft);
            self.pipeline.run_before(&mut ctx).await?;
            contexts.push(ctx);
        }

        let mut tx = self.pool.begin().await?;
        for ctx in &contexts {
            let draft = ctx.record.as_ref().ok_or_else(missing_record)?;
            insert(&mut *tx, draft).await?;
        }
        tx.commit().await?;

        for ctx in contexts.iter_mut() {
            self.pipeline.run_after(ctx).await;
        }
        Ok(contexts.len())
    }

    /// Run a list query and return public documents
    pub async fn find(&self, modifier: QueryModifier) -> AppResult<Vec<Value>> {
        let mut ctx = ObserverContext::select(MOVIES_TABLE, modifier.into_filter());
        self.pipeline.run_before(&mut ctx).await?;

        let filter = ctx.take_filter().ok_or_else(missing_filter)?;
        let rows = QueryBuilder::<Movie>::new(filter).select_json(&self.pool).await?;
        ctx.result = Some(rows.into_iter().map(document_from_row).collect());

        self.pipeline.run_after(&mut ctx).await;
        Ok(ctx.result.take().unwrap_or_default())
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Movie>> {
        let mut filter = Self::filter()?;
        filter.where_clause(json!({ "id": id.to_string() }))?;

        let mut ctx = ObserverContext::select(MOVIES_TABLE, filter);
        self.pipeline.run_before(&mut ctx).await?;

        let filter = ctx.take_filter().ok_or_else(missing_filter)?;
        let movie = QueryBuilder::<Movie>::new(filter).select_optional(&self.pool).await?;

        self.pipeline.run_after(&mut ctx).await;
        Ok(movie)
    }

    /// Apply the present attributes; `None` when no visible movie has that id
    pub async fn update(&self, id: Uuid, draft: MovieDraft) -> AppResult<Option<Movie>> {
        let mut ctx = ObserverContext::update(MOVIES_TABLE, draft, Self::filter()?);
        self.pipeline.run_before(&mut ctx).await?;

        let scope = scope_sql(ctx.filter.as_ref().ok_or_else(missing_filter)?, UPDATABLE_PARAMS)?;
        let draft = ctx.record.as_ref().ok_or_else(missing_record)?;
        let query = format!(
            "UPDATE \"movies\" SET \
             \"name\" = COALESCE($2, \"name\"), \
             \"description\" = COALESCE($3, \"description\"), \
             \"duration\" = COALESCE($4, \"duration\"), \
             \"ratings\" = CASE WHEN $14 THEN $5 ELSE \"ratings\" END, \
             \"total_ratings\" = CASE WHEN $15 THEN $6 ELSE \"total_ratings\" END, \
             \"release_year\" = COALESCE($7, \"release_year\"), \
             \"release_date\" = CASE WHEN $16 THEN $8 ELSE \"release_date\" END, \
             \"genres\" = COALESCE($9, \"genres\"), \
             \"directors\" = COALESCE($10, \"directors\"), \
             \"cover_image\" = COALESCE($11, \"cover_image\"), \
             \"actors\" = COALESCE($12, \"actors\"), \
             \"price\" = COALESCE($13, \"price\"), \
             \"version\" = \"version\" + 1 \
             WHERE \"id\" = $1{} RETURNING *",
            scope.query
        );

        let mut q = sqlx::query_as::<_, Movie>(&query)
            .bind(id)
            .bind(&draft.name)
            .bind(&draft.description)
            .bind(draft.duration)
            .bind(draft.ratings.flatten())
            .bind(draft.total_ratings.flatten())
            .bind(draft.release_year)
            .bind(draft.release_date.flatten())
            .bind(&draft.genres)
            .bind(&draft.directors)
            .bind(&draft.cover_image)
            .bind(&draft.actors)
            .bind(draft.price)
            .bind(draft.ratings.is_some())
            .bind(draft.total_ratings.is_some())
            .bind(draft.release_date.is_some());
        for p in scope.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let movie = q.fetch_optional(&self.pool).await?;

        self.pipeline.run_after(&mut ctx).await;
        Ok(movie)
    }

    /// `false` when no visible movie has that id
    pub async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut ctx: ObserverContext<MovieDraft> = ObserverContext::delete(MOVIES_TABLE, Self::filter()?);
        self.pipeline.run_before(&mut ctx).await?;

        let scope = scope_sql(ctx.filter.as_ref().ok_or_else(missing_filter)?, 1)?;
        let query = format!("DELETE FROM \"movies\" WHERE \"id\" = $1{}", scope.query);
        let mut q = sqlx::query(&query).bind(id);
        for p in scope.params.iter() {
            q = bind_param_query(q, p);
        }
        let deleted = q.execute(&self.pool).await?.rows_affected() > 0;

        self.pipeline.run_after(&mut ctx).await;
        Ok(deleted)
    }

    /// Remove every movie, released or not. Used by the offline loader.
    pub async fn delete_all(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM \"movies\"").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Price and rating statistics per release year for movies rated 8 or more,
    /// keeping years whose most expensive movie costs at least 15.
    pub async fn stats(&self) -> AppResult<Vec<MovieStats>> {
        let mut filter = Self::filter()?;
        filter.where_clause(json!({ "ratings": { "$gte": 8 } }))?;
        let mut ctx: ObserverContext<MovieDraft> = ObserverContext::aggregate(MOVIES_TABLE, filter);
        self.pipeline.run_before(&mut ctx).await?;

        let filter = ctx.take_filter().ok_or_else(missing_filter)?;
        let conditions = filter.to_where_sql(0)?;
        let query = format!(
            "SELECT \"release_year\", \
             AVG(\"ratings\") AS avg_rating, \
             AVG(\"price\") AS avg_price, \
             MIN(\"price\") AS min_price, \
             MAX(\"price\") AS max_price, \
             SUM(\"price\") AS price_total, \
             MIN(\"ratings\") AS min_rating, \
             MAX(\"ratings\") AS max_rating, \
             SUM(\"ratings\") AS rating_total, \
             COUNT(*) AS movie_count \
             FROM \"movies\" WHERE {} \
             GROUP BY \"release_year\" \
             HAVING MAX(\"price\") >= 15 \
             ORDER BY min_price ASC, \"release_year\" ASC",
            conditions.query
        );

        let mut q = sqlx::query_as::<_, MovieStats>(&query);
        for p in conditions.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let stats = q.fetch_all(&self.pool).await?;

        self.pipeline.run_after(&mut ctx).await;
        Ok(stats)
    }

    /// Count and titles of released movies listing `genre`
    pub async fn by_genre(&self, genre: &str) -> AppResult<Vec<GenreGroup>> {
        let mut filter = Self::filter()?;
        filter.where_clause(json!({ "genre": genre }))?;
        let mut ctx: ObserverContext<MovieDraft> = ObserverContext::aggregate(MOVIES_TABLE, filter);
        self.pipeline.run_before(&mut ctx).await?;

        let filter = ctx.take_filter().ok_or_else(missing_filter)?;
        let conditions = filter.to_where_sql(0)?;
        let query = format!(
            "SELECT g.genre, COUNT(*) AS movie_count, ARRAY_AGG(t.\"name\" ORDER BY t.\"name\") AS movies \
             FROM \"movies\" AS t CROSS JOIN LATERAL UNNEST(t.\"genres\") AS g(genre) \
             WHERE {} \
             GROUP BY g.genre \
             ORDER BY movie_count DESC",
            conditions.query
        );

        let mut q = sqlx::query_as::<_, GenreGroup>(&query);
        for p in conditions.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let groups = q.fetch_all(&self.pool).await?;

        self.pipeline.run_after(&mut ctx).await;
        Ok(groups)
    }
}

async fn insert<'e>(executor: impl PgExecutor<'e>, draft: &MovieDraft) -> Result<Movie, sqlx::Error> {
    sqlx::query_as::<_, Movie>(
        "INSERT INTO \"movies\" \
         (\"id\", \"name\", \"description\", \"duration\", \"ratings\", \"total_ratings\", \"release_year\", \
          \"release_date\", \"genres\", \"directors\", \"cover_image\", \"actors\", \"price\", \"created_by\") \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&draft.name)
    .bind(&draft.description)
    .bind(draft.duration)
    .bind(draft.ratings.flatten())
    .bind(draft.total_ratings.flatten())
    .bind(draft.release_year)
    .bind(draft.release_date.flatten())
    .bind(&draft.genres)
    .bind(&draft.directors)
    .bind(&draft.cover_image)
    .bind(&draft.actors)
    .bind(draft.price)
    .bind(&draft.created_by)
    .fetch_one(executor)
    .await
}

/// Observer scope rendered as ` AND ...`, numbered after the statement's own parameters
pub(crate) fn scope_sql(
    filter: &Filter,
    own_params: usize,
) -> Result<crate::filter::types::SqlResult, crate::filter::error::FilterError> {
    let mut result = filter.to_where_sql(own_params)?;
    if !result.query.is_empty() {
        result.query = format!(" AND {}", result.query);
    }
    Ok(result)
}

pub(crate) fn missing_record() -> AppError {
    AppError::Internal(anyhow::anyhow!("observer pipeline dropped the record"))
}

pub(crate) fn missing_filter() -> AppError {
    AppError::Internal(anyhow::anyhow!("observer pipeline dropped the query"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::RELEASED_PREDICATE;

    #[test]
    fn scope_is_appended_after_own_parameters() {
        let mut filter = MovieRepository::filter().unwrap();
        filter.scope(RELEASED_PREDICATE);
        let scope = scope_sql(&filter, 13).unwrap();
        assert_eq!(scope.query, " AND \"release_date\" <= NOW()");
        assert!(scope.params.is_empty());
    }

    #[test]
    fn empty_scope_adds_nothing() {
        let filter = MovieRepository::filter().unwrap();
        assert_eq!(scope_sql(&filter, 1).unwrap().query, "");
    }

    #[tokio::test]
    async fn invalid_drafts_never_reach_the_database() {
        // Lazy pool pointing nowhere: any SQL would fail with a connection error
        let pool = sqlx::postgres::PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(100))
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap();
        let repo = MovieRepository::new(pool, Arc::new(AuditLog::disabled()), "DIBAKAR");

        let err = repo.create(MovieDraft::default()).await.unwrap_err();
        match err {
            AppError::Validation(messages) => assert!(messages.contains(&"Name is a required field!".to_string())),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
