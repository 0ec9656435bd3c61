mod main_runtime;

use anyhow::{bail, Context};
use betledger::adapters::start_api_server;
use betledger::cli::{self, Cli, Commands};
use betledger::config::AppConfig;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use main_runtime::{init_logging, init_logging_simple, open_store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_from(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    if let Some(url) = &cli.database_url {
        config.database.url = url.clone();
    }

    match cli.subcommand() {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Err(errors) = config.validate() {
                bail!("invalid configuration:\n  {}", errors.join("\n  "));
            }
            let _guard = init_logging(&config.logging);
            info!(
                host = %config.server.host,
                port = config.server.port,
                "Starting betledger v{}",
                env!("CARGO_PKG_VERSION")
            );

            let store = open_store(&config).await?;
            start_api_server(store, Arc::new(config)).await?;
        }
        Commands::Migrate => {
            init_logging_simple();
            open_store(&config).await?;
            println!("Migrations applied to {}", config.database.url);
        }
        Commands::Import { file, replace } => {
            init_logging_simple();
            let store = open_store(&config).await?;
            let summary = cli::import_file(&store, &file, replace)
                .await
                .with_context(|| format!("importing {}", file.display()))?;
            cli::print_import_summary(&summary);
        }
    }

    Ok(())
}
