use serde_json::json;

use crate::cli::utils::{connect, output_success};
use crate::cli::OutputFormat;
use crate::database::DatabaseManager;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = connect().await?;
    DatabaseManager::migrate(&pool).await?;

    let applied = DatabaseManager::applied_migrations(&pool).await?;
    let versions: Vec<_> = applied
        .iter()
        .map(|(version, description)| json!({ "version": version, "description": description }))
        .collect();

    output_success(
        &output_format,
        &format!("{} migration(s) applied", applied.len()),
        Some(json!({ "migrations": versions })),
    )
}
