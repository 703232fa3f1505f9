use serde_json::Value;
use sqlx::{self, postgres::PgArguments, FromRow, PgExecutor, Row};

use crate::database::manager::DatabaseError;
use crate::filter::types::SqlResult;
use crate::filter::Filter;

/// Runs a prepared `Filter` and binds its JSON parameters.
pub struct QueryBuilder<T> {
    filter: Filter,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> QueryBuilder<T>
where
    T: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    pub fn new(filter: Filter) -> Self {
        Self { filter, _phantom: std::marker::PhantomData }
    }

    pub async fn select_all<'e>(self, executor: impl PgExecutor<'e>) -> Result<Vec<T>, DatabaseError> {
        let sql_result = self.sql_result(Filter::to_sql)?;
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        Ok(q.fetch_all(executor).await?)
    }

    pub async fn select_optional<'e>(self, executor: impl PgExecutor<'e>) -> Result<Option<T>, DatabaseError> {
        let sql_result = self.sql_result(Filter::to_sql)?;
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        Ok(q.fetch_optional(executor).await?)
    }

    /// Rows rendered by Postgres as JSON objects, honoring the filter's projection
    pub async fn select_json<'e>(self, executor: impl PgExecutor<'e>) -> Result<Vec<Value>, DatabaseError> {
        let sql_result = self.sql_result(Filter::to_json_sql)?;
        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }
        let rows = q.fetch_all(executor).await?;
        rows.iter()
            .map(|row| row.try_get::<Value, _>("row").map_err(DatabaseError::from))
            .collect()
    }

    fn sql_result<F>(&self, render: F) -> Result<SqlResult, DatabaseError>
    where
        F: Fn(&Filter) -> Result<SqlResult, crate::filter::error::FilterError>,
    {
        render(&self.filter).map_err(|e| DatabaseError::QueryError(e.to_string()))
    }
}

pub fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(u) = n.as_u64() {
                // Postgres doesn't have u64; cast down if safe
                q.bind(u as i64)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        Value::Array(_arr) => {
            // Arrays are expanded by FilterWhere before binding; this case should be rare here
            q
        }
        Value::Object(_) => q.bind(v), // JSONB
    }
}

pub fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(u) = n.as_u64() {
                q.bind(u as i64)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        Value::Array(_arr) => q,
        Value::Object(_) => q.bind(v),
    }
}
