use tracing_subscriber::EnvFilter;

use movie_catalog_api::config;
use movie_catalog_api::database::DatabaseManager;
use movie_catalog_api::server::{self, AppState};
use movie_catalog_api::services::mailer_from_config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::config();
    tracing::info!("Starting movie catalog API in {:?} mode", config.environment);
    config.validate()?;

    let pool = DatabaseManager::connect(&config.database).await?;
    if config.database.run_migrations {
        DatabaseManager::migrate(&pool).await?;
    }

    let mailer = mailer_from_config(&config.email)?;
    let state = AppState::new(pool, mailer);

    server::run(state, config.server.port).await
}
