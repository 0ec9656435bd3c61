use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::domain::{
    parse_kickoff, ArbitrageOpportunity, Bet, BetStatus, LedgerTransaction, TransactionType,
    UNKNOWN,
};
use crate::error::{LedgerError, Result};

/// Aggregate view over a filtered opportunity set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArbitrageStats {
    pub total_opportunities: usize,
    pub active_opportunities: usize,
    pub average_profit: f64,
    pub max_profit: f64,
    pub min_profit: f64,
    pub most_common_market: Option<String>,
    pub most_common_league: Option<String>,
    pub market_distribution: BTreeMap<String, usize>,
    pub league_distribution: BTreeMap<String, usize>,
}

/// Counts in first-insertion order, so the mode can break ties by it
#[derive(Debug, Default)]
struct FrequencyTable {
    entries: Vec<(String, usize)>,
    index: HashMap<String, usize>,
}

impl FrequencyTable {
    fn add(&mut self, key: String) {
        match self.index.get(&key) {
            Some(&slot) => self.entries[slot].1 += 1,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, 1));
            }
        }
    }

    fn mode(&self) -> Option<String> {
        let mut best: Option<&(String, usize)> = None;
        for entry in &self.entries {
            if best.map_or(true, |b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map(|(key, _)| key.clone())
    }

    fn into_distribution(self) -> BTreeMap<String, usize> {
        self.entries.into_iter().collect()
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Per-opportunity statistics; grouping plays no part here.
pub fn compute_stats(opportunities: &[ArbitrageOpportunity]) -> ArbitrageStats {
    let mut markets = FrequencyTable::default();
    let mut leagues = FrequencyTable::default();
    let mut sum = 0.0;
    let mut max = f64::MIN;
    let mut min = f64::MAX;
    let mut active = 0;

    for opp in opportunities {
        sum += opp.profit;
        max = max.max(opp.profit);
        min = min.min(opp.profit);
        if opp.is_active {
            active += 1;
        }
        // Read the first leg once; unreadable legs land in "Unknown"
        match opp.first_leg() {
            Some(leg) => {
                markets.add(leg.market_or_unknown());
                leagues.add(leg.league_or_unknown());
            }
            None => {
                markets.add(UNKNOWN.to_string());
                leagues.add(UNKNOWN.to_string());
            }
        }
    }

    if opportunities.is_empty() {
        return ArbitrageStats {
            total_opportunities: 0,
            active_opportunities: 0,
            average_profit: 0.0,
            max_profit: 0.0,
            min_profit: 0.0,
            most_common_market: None,
            most_common_league: None,
            market_distribution: BTreeMap::new(),
            league_distribution: BTreeMap::new(),
        };
    }

    ArbitrageStats {
        total_opportunities: opportunities.len(),
        active_opportunities: active,
        average_profit: round2(sum / opportunities.len() as f64),
        max_profit: round2(max),
        min_profit: round2(min),
        most_common_market: markets.mode(),
        most_common_league: leagues.mode(),
        market_distribution: markets.into_distribution(),
        league_distribution: leagues.into_distribution(),
    }
}

// ==================== Bet statistics ====================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SportStats {
    pub total_bets: usize,
    pub total_staked: f64,
    pub profit_loss: f64,
    pub won: usize,
    pub lost: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BetStats {
    pub total_bets: usize,
    pub total_settled: usize,
    pub total_won: usize,
    pub total_lost: usize,
    pub total_staked: f64,
    pub total_profit_loss: f64,
    pub total_potential_winnings: f64,
    /// Percentage of settled bets that won
    pub win_rate: f64,
    /// Settled profit/loss over everything staked, as a percentage
    pub roi: f64,
    pub sports_stats: BTreeMap<String, SportStats>,
}

pub fn compute_bet_stats(bets: &[Bet]) -> BetStats {
    let mut settled = 0;
    let mut won = 0;
    let mut lost = 0;
    let mut staked = 0.0;
    let mut profit_loss = 0.0;
    let mut potential = 0.0;
    let mut sports: BTreeMap<String, SportStats> = BTreeMap::new();

    for bet in bets {
        staked += bet.stake;
        match bet.status {
            BetStatus::Pending => potential += bet.potential_payout,
            status => {
                settled += 1;
                profit_loss += bet.profit_loss;
                match status {
                    BetStatus::Won => won += 1,
                    BetStatus::Lost => lost += 1,
                    _ => {}
                }
            }
        }

        let sport = sports.entry(bet.sport.clone()).or_default();
        sport.total_bets += 1;
        sport.total_staked += bet.stake;
        sport.profit_loss += bet.profit_loss;
        match bet.status {
            BetStatus::Won => sport.won += 1,
            BetStatus::Lost => sport.lost += 1,
            _ => {}
        }
    }

    let win_rate = if settled > 0 {
        won as f64 / settled as f64 * 100.0
    } else {
        0.0
    };
    let roi = if staked > 0.0 {
        profit_loss / staked * 100.0
    } else {
        0.0
    };

    BetStats {
        total_bets: bets.len(),
        total_settled: settled,
        total_won: won,
        total_lost: lost,
        total_staked: round2(staked),
        total_profit_loss: round2(profit_loss),
        total_potential_winnings: round2(potential),
        win_rate: round2(win_rate),
        roi: round2(roi),
        sports_stats: sports,
    }
}

// ==================== Transaction statistics ====================

/// Which completed transactions feed the cash-flow summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    /// Inclusive bounds on `date_processed`
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Case-insensitive substring of the sportsbook name
    pub sportsbook: Option<String>,
}

impl TransactionFilter {
    /// Build from raw query values; blank values are ignored.
    pub fn parse(start: Option<&str>, end: Option<&str>, sportsbook: Option<&str>) -> Result<Self> {
        Ok(Self {
            start: start.map(|s| date_bound("start_date", s)).transpose()?.flatten(),
            end: end.map(|s| date_bound("end_date", s)).transpose()?.flatten(),
            sportsbook: sportsbook
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_lowercase),
        })
    }

    pub fn matches(&self, tx: &LedgerTransaction) -> bool {
        if self.start.is_some() || self.end.is_some() {
            let Some(processed) = tx.date_processed else {
                return false;
            };
            if self.start.is_some_and(|start| processed < start)
                || self.end.is_some_and(|end| processed > end)
            {
                return false;
            }
        }
        match &self.sportsbook {
            Some(needle) => tx
                .sportsbook
                .as_deref()
                .is_some_and(|name| name.to_lowercase().contains(needle)),
            None => true,
        }
    }
}

/// Accepts the kickoff formats plus a bare `YYYY-MM-DD` (midnight UTC)
fn date_bound(field: &str, raw: &str) -> Result<Option<DateTime<Utc>>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    parse_kickoff(raw)
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        })
        .map(Some)
        .ok_or_else(|| LedgerError::validation(format!("Invalid {field} format")))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SportsbookFlow {
    pub deposits: f64,
    pub withdrawals: f64,
    /// Deposits minus withdrawals
    pub net: f64,
    pub deposit_count: usize,
    pub withdrawal_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionStats {
    pub total_deposits: f64,
    pub total_withdrawals: f64,
    /// Withdrawals minus deposits, tax and charges
    pub net_position: f64,
    pub total_tax: f64,
    pub total_charges: f64,
    pub deposit_count: usize,
    pub withdrawal_count: usize,
    pub total_transactions: usize,
    pub sportsbook_breakdown: BTreeMap<String, SportsbookFlow>,
}

/// Summarise completed transactions that pass `filter`
pub fn compute_transaction_stats(
    transactions: &[LedgerTransaction],
    filter: &TransactionFilter,
) -> TransactionStats {
    let mut deposits = 0.0;
    let mut withdrawals = 0.0;
    let mut tax = 0.0;
    let mut charges = 0.0;
    let mut deposit_count = 0;
    let mut withdrawal_count = 0;
    let mut total = 0;
    let mut breakdown: BTreeMap<String, SportsbookFlow> = BTreeMap::new();

    for tx in transactions
        .iter()
        .filter(|tx| tx.status == "completed" && filter.matches(tx))
    {
        total += 1;
        tax += tx.tax;
        charges += tx.transaction_charges;

        let flow = breakdown
            .entry(tx.sportsbook.clone().unwrap_or_else(|| "Unknown".to_string()))
            .or_default();
        match tx.transaction_type {
            TransactionType::Deposit => {
                deposits += tx.amount;
                deposit_count += 1;
                flow.deposits += tx.amount;
                flow.deposit_count += 1;
            }
            TransactionType::Withdrawal => {
                withdrawals += tx.amount;
                withdrawal_count += 1;
                flow.withdrawals += tx.amount;
                flow.withdrawal_count += 1;
            }
        }
    }

    for flow in breakdown.values_mut() {
        flow.deposits = round2(flow.deposits);
        flow.withdrawals = round2(flow.withdrawals);
        flow.net = round2(flow.deposits - flow.withdrawals);
    }

    TransactionStats {
        total_deposits: round2(deposits),
        total_withdrawals: round2(withdrawals),
        net_position: round2(withdrawals - deposits - tax - charges),
        total_tax: round2(tax),
        total_charges: round2(charges),
        deposit_count,
        withdrawal_count,
        total_transactions: total,
        sportsbook_breakdown: breakdown,
    }
}
