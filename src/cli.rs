use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::adapters::LedgerStore;
use crate::error::{LedgerError, Result};
use crate::services::{import_opportunities, ImportRequest, ImportSummary};

#[derive(Parser)]
#[command(name = "betledger")]
#[command(version)]
#[command(about = "Sports-betting ledger with arbitrage grouping and bet conversion", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config directory (default.toml plus the $BETLEDGER_ENV overlay)
    #[arg(short, long, default_value = "config")]
    pub config: PathBuf,

    /// Override the database URL from config
    #[arg(long)]
    pub database_url: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Run the REST API (default)
    Serve {
        /// Port to listen on, overriding config
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Apply database migrations and exit
    Migrate,
    /// Bulk import arbitrage opportunities from a JSON file
    Import {
        /// File holding an array of opportunities (or `{"opportunities": [...]}`)
        file: PathBuf,
        /// Delete existing opportunities before importing
        #[arg(long)]
        replace: bool,
    },
}

impl Cli {
    pub fn subcommand(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or(Commands::Serve { port: None })
    }
}

/// Read an export file and import it in one transaction
pub async fn import_file(store: &LedgerStore, path: &Path, replace: bool) -> Result<ImportSummary> {
    let raw = tokio::fs::read_to_string(path).await?;
    let request: ImportRequest = serde_json::from_str(&raw).map_err(|e| {
        LedgerError::validation(format!("{} is not an opportunity export: {e}", path.display()))
    })?;
    let (items, request_replace) = request.into_parts();
    import_opportunities(store, items, replace || request_replace).await
}

pub fn print_import_summary(summary: &ImportSummary) {
    println!("\nImport Summary:");
    println!("  Imported:  {}", summary.imported);
    println!("  Skipped:   {} (already present)", summary.skipped);
    println!("  Failed:    {}", summary.failed);
    if summary.cleared > 0 {
        println!("  Cleared:   {}", summary.cleared);
    }
    println!("  Processed: {}", summary.total_processed);
    for error in &summary.errors {
        println!("  \x1b[31m✗\x1b[0m {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_serve() {
        let cli = Cli::parse_from(["betledger"]);
        assert_eq!(cli.subcommand(), Commands::Serve { port: None });
        assert_eq!(cli.config, PathBuf::from("config"));
    }

    #[test]
    fn test_import_arguments() {
        let cli = Cli::parse_from(["betledger", "import", "data/arbs.json", "--replace"]);
        assert_eq!(
            cli.subcommand(),
            Commands::Import {
                file: PathBuf::from("data/arbs.json"),
                replace: true
            }
        );
    }

    #[tokio::test]
    async fn test_import_file_rejects_non_export() {
        let dir = std::env::temp_dir().join(format!("betledger-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.json");
        std::fs::write(&path, r#"{"not": "an export"}"#).unwrap();

        let store = LedgerStore::in_memory().await.unwrap();
        let err = import_file(&store, &path, false).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        std::fs::remove_dir_all(&dir).ok();
    }
}
