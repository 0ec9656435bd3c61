use betledger::adapters::LedgerStore;
use betledger::config::{AppConfig, LoggingConfig};
use betledger::error::Result;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. The returned guard flushes the file
/// writer and must live until shutdown.
pub fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::Layer;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},sqlx=warn", logging.level)));

    // `tracing_appender::rolling::daily` panics when it cannot create the
    // initial file, so check the directory is writable first.
    let mut guard = None;
    let file_layer = match logging.dir.as_deref() {
        Some(log_dir) if std::fs::create_dir_all(log_dir).is_ok() => {
            let test_path = std::path::Path::new(log_dir).join(".betledger_write_test");
            match std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&test_path)
            {
                Ok(_) => {
                    let _ = std::fs::remove_file(&test_path);

                    // Daily rotating file appender
                    let file_appender = tracing_appender::rolling::daily(log_dir, "betledger.log");
                    let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
                    guard = Some(worker_guard);

                    Some(
                        tracing_subscriber::fmt::layer()
                            .with_writer(non_blocking)
                            .with_ansi(false) // No color codes in file
                            .with_target(true),
                    )
                }
                Err(e) => {
                    eprintln!(
                        "Warning: Could not write to log directory {} ({}), file logging disabled",
                        log_dir, e
                    );
                    None
                }
            }
        }
        Some(log_dir) => {
            eprintln!(
                "Warning: Could not create log directory {}, file logging disabled",
                log_dir
            );
            None
        }
        None => None,
    };

    // Console layer
    let console_layer = if logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed()
    };

    let file_logging_enabled = file_layer.is_some();
    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    if let (true, Some(dir)) = (file_logging_enabled, logging.dir.as_deref()) {
        eprintln!("Logging to: {}/betledger.log", dir);
    }
    guard
}

pub fn init_logging_simple() {
    // Minimal logging for one-shot commands
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}

/// Connect and migrate
pub async fn open_store(config: &AppConfig) -> Result<Arc<LedgerStore>> {
    let store = LedgerStore::new(&config.database.url, config.database.max_connections).await?;
    store.migrate().await?;
    info!(url = %config.database.url, "Ledger store ready");
    Ok(Arc::new(store))
}
