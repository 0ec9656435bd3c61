pub mod adapters;
pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;

pub use adapters::LedgerStore;
pub use api::{create_router, AppState};
pub use config::AppConfig;
pub use domain::{
    Account, ArbitrageFilter, ArbitrageOpportunity, Bet, BetStatus, LedgerTransaction, Reference,
    Sportsbook,
};
pub use error::{LedgerError, Result};
