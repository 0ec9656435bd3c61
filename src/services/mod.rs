pub mod converter;
pub mod grouping;
pub mod importer;
pub mod ledger;
pub mod pagination;
pub mod resolver;
pub mod stats;

pub use converter::{
    convert_to_bets, plan_conversion, ArbitrageBetPayload, ConversionDefaults, ConversionOutcome,
    ConversionPlan, ConversionRequest, ConversionSource, StakeOverrides,
};
pub use grouping::{group_opportunities, match_view, sort_opportunities, GroupSummary, GroupedPage, MatchView};
pub use importer::{import_opportunities, ImportRequest, ImportSummary};
pub use ledger::{create_bet, create_transaction, update_bet, update_transaction};
pub use pagination::{paginate, PageRequest, Pagination};
pub use resolver::{resolve_account, resolve_sportsbook, Resolved};
pub use stats::{
    compute_bet_stats, compute_stats, compute_transaction_stats, ArbitrageStats, BetStats,
    SportsbookFlow, TransactionFilter, TransactionStats,
};
