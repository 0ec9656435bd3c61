use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::adapters::LedgerStore;
use crate::config::AppConfig;
use crate::services::{ConversionDefaults, PageRequest};

/// Shared application state for API handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub store: Arc<LedgerStore>,

    /// Loaded configuration
    pub config: Arc<AppConfig>,

    /// Application start time
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(store: Arc<LedgerStore>, config: Arc<AppConfig>) -> Self {
        Self {
            store,
            config,
            start_time: Utc::now(),
        }
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.start_time).num_seconds().max(0)
    }

    pub fn page_request(&self, page: Option<i64>, per_page: Option<i64>) -> PageRequest {
        PageRequest::new(
            page,
            per_page,
            self.config.ledger.default_per_page as usize,
            self.config.ledger.max_per_page as usize,
        )
    }

    pub fn conversion_defaults(&self) -> ConversionDefaults {
        ConversionDefaults {
            stake: self.config.ledger.default_stake,
            sport: self.config.ledger.default_sport.clone(),
        }
    }
}
