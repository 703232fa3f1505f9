use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde_json::json;

use crate::cli::utils::{connect, output_error, output_success};
use crate::cli::OutputFormat;
use crate::config;
use crate::database::models::MovieDraft;
use crate::database::{DatabaseManager, MovieRepository};
use crate::error::AppError;
use crate::services::AuditLog;

pub async fn handle(file: PathBuf, output_format: OutputFormat) -> anyhow::Result<()> {
    let drafts = read_movies(&file)?;

    let pool = connect().await?;
    DatabaseManager::migrate(&pool).await?;

    let cfg = config::config();
    let movies = MovieRepository::new(
        pool,
        Arc::new(AuditLog::from_config(&cfg.audit)),
        cfg.audit.movie_created_by.clone(),
    );

    match movies.insert_many(drafts).await {
        Ok(count) => output_success(
            &output_format,
            &format!("Data successfully imported ({} movies from {})", count, file.display()),
            Some(json!({ "imported": count })),
        ),
        Err(e) => {
            let message = e.normalize().message().to_string();
            output_error(&output_format, &message, Some(error_code(&e)))?;
            Err(anyhow::anyhow!("import failed: {}", e))
        }
    }
}

/// Parse the file as a JSON array of movies
pub fn read_movies(path: &Path) -> anyhow::Result<Vec<MovieDraft>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not a JSON array of movies", path.display()))
}

fn error_code(err: &AppError) -> &'static str {
    match err {
        AppError::Validation(_) => "VALIDATION_FAILED",
        AppError::Database(_) => "DATABASE_ERROR",
        _ => "IMPORT_FAILED",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_data_file_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/movies.json");
        let drafts = read_movies(&path).unwrap();
        assert!(drafts.len() >= 5);
        assert!(drafts.iter().all(|d| d.name.is_some() && d.created_by.is_none()));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = read_movies(Path::new("does/not/exist.json")).unwrap_err();
        assert!(err.to_string().contains("does/not/exist.json"));
    }
}
