use std::sync::Arc;

use serde_json::json;

use crate::cli::utils::{connect, output_success};
use crate::cli::OutputFormat;
use crate::database::MovieRepository;
use crate::services::AuditLog;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = connect().await?;
    let movies = MovieRepository::new(pool, Arc::new(AuditLog::disabled()), String::new());

    let deleted = movies.delete_all().await?;
    tracing::info!("Deleted {} movies", deleted);

    output_success(
        &output_format,
        &format!("Data successfully deleted ({} movies)", deleted),
        Some(json!({ "deleted": deleted })),
    )
}
