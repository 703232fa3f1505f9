use std::time::Duration;

use sqlx::migrate::MigrateError;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from DatabaseManager and the repositories
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migration(#[from] MigrateError),
}

/// Builds the catalog connection pool and owns schema migration
pub struct DatabaseManager;

impl DatabaseManager {
    fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
    }

    fn url(config: &DatabaseConfig) -> Result<&str, DatabaseError> {
        config.url.as_deref().ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))
    }

    /// Connect eagerly; fails fast when the database is unreachable.
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let pool = Self::pool_options(config).connect(Self::url(config)?).await?;
        info!("Connected to database (max {} connections)", config.max_connections);
        Ok(pool)
    }

    /// Build a pool that only opens connections when first used.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        Ok(Self::pool_options(config).connect_lazy(Self::url(config)?)?)
    }

    pub async fn migrate(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }

    /// Names of applied migrations, oldest first
    pub async fn applied_migrations(pool: &PgPool) -> Result<Vec<(i64, String)>, DatabaseError> {
        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT version, description FROM _sqlx_migrations WHERE success ORDER BY version")
                .fetch_all(pool)
                .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: Option<&str>) -> DatabaseConfig {
        DatabaseConfig {
            url: url.map(str::to_string),
            max_connections: 2,
            connection_timeout: 1,
            run_migrations: false,
        }
    }

    #[test]
    fn missing_url_is_reported() {
        assert!(matches!(
            DatabaseManager::connect_lazy(&config(None)),
            Err(DatabaseError::ConfigMissing("DATABASE_URL"))
        ));
    }

    #[tokio::test]
    async fn lazy_pool_does_not_connect() {
        let pool = DatabaseManager::connect_lazy(&config(Some("postgres://nobody@127.0.0.1:1/none"))).unwrap();
        assert_eq!(pool.size(), 0);
    }
}
