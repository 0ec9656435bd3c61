use serde::{Deserialize, Serialize};

use crate::domain::{
    ArbitrageFilter, LedgerTransaction, SortKey, SortOrder, Sportsbook, SportsbookUsage,
};
use crate::services::Pagination;

// ============================================================================
// Arbitrage Types
// ============================================================================

/// Filters, sort and paging for arbitrage listings.
///
/// Kept flat because `serde(flatten)` loses number parsing in query strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArbitrageQuery {
    pub min_profit: Option<f64>,
    pub max_profit: Option<f64>,
    pub market: Option<String>,
    pub league: Option<String>,
    pub country: Option<String>,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub sort_by: SortKey,
    #[serde(default)]
    pub sort_order: SortOrder,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ArbitrageQuery {
    pub fn filter(&self) -> ArbitrageFilter {
        ArbitrageFilter {
            min_profit: self.min_profit,
            max_profit: self.max_profit,
            market: self.market.clone(),
            league: self.league.clone(),
            country: self.country.clone(),
            is_active: self.is_active,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SortQuery {
    #[serde(default)]
    pub sort_by: SortKey,
    #[serde(default)]
    pub sort_order: SortOrder,
}

// ============================================================================
// Ledger Types
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BetListQuery {
    pub status: Option<String>,
    pub sport: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SportsbookListQuery {
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionListQuery {
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionStatsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub sportsbook: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SportsbookToggleResponse {
    pub message: String,
    pub sportsbook: Sportsbook,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkSportsbookResponse {
    pub message: String,
    pub created_count: usize,
    pub skipped_count: usize,
    pub skipped_names: Vec<String>,
    pub created_sportsbooks: Vec<Sportsbook>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SportsbookStatsResponse {
    pub total_sportsbooks: i64,
    pub active_sportsbooks: i64,
    pub inactive_sportsbooks: i64,
    pub top_used_sportsbooks: Vec<SportsbookUsage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountStatsResponse {
    pub total_accounts: i64,
    pub active_accounts: i64,
    pub inactive_accounts: i64,
    pub email_accounts: i64,
    pub phone_accounts: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionPage {
    pub transactions: Vec<LedgerTransaction>,
    pub pagination: Pagination,
}

// ============================================================================
// System Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub db: String,
    pub uptime_secs: i64,
    pub version: String,
}
