pub mod commands;
pub mod utils;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "catalog")]
#[command(about = "Catalog CLI - offline loader for the movie catalog database")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Migrate, then load movies from a JSON array file")]
    Import {
        #[arg(long, help = "Path to the movie list", default_value = "data/movies.json")]
        file: PathBuf,
    },

    #[command(about = "Delete every movie in the catalog")]
    Delete,

    #[command(about = "Apply pending database migrations")]
    Migrate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Import { file } => commands::import::handle(file, output_format).await,
        Commands::Delete => commands::delete::handle(output_format).await,
        Commands::Migrate => commands::migrate::handle(output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_defaults_to_the_bundled_data_file() {
        let cli = Cli::parse_from(["catalog", "import"]);
        match cli.command {
            Commands::Import { file } => assert_eq!(file, PathBuf::from("data/movies.json")),
            _ => panic!("expected import"),
        }
    }

    #[test]
    fn output_flags_are_global() {
        let cli = Cli::parse_from(["catalog", "delete", "--json"]);
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        assert!(matches!(cli.command, Commands::Delete));

        let cli = Cli::parse_from(["catalog", "migrate"]);
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Text));
    }
}
