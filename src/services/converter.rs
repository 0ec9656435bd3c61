//! Fan-out of one arbitrage opportunity into ledger bets.
//!
//! Conversion runs in two phases. [`plan_conversion`] validates every leg
//! and resolves stakes without touching storage; [`convert_to_bets`] then
//! writes the whole plan inside one transaction. A plan that fails never
//! reaches the database, and a write that fails rolls back every bet of
//! the request.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, instrument};

use crate::adapters::LedgerStore;
use crate::domain::reference::{self, Reference};
use crate::domain::{
    ensure_positive, legs_from_value, parse_kickoff, parse_number, ArbitrageOpportunity, Bet,
    LegRecord, NewBet,
};
use crate::error::{LedgerError, Result};
use crate::services::resolver::{resolve_account, resolve_sportsbook};

const DEFAULT_HOME: &str = "Team A";
const DEFAULT_AWAY: &str = "Team B";
const DEFAULT_BET_TYPE: &str = "Unknown Market";

/// Per-leg override in list form: `stakes: [{stake, account}]`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegOverride {
    #[serde(default)]
    pub stake: Option<Value>,
    #[serde(default, deserialize_with = "reference::deserialize_optional")]
    pub account: Option<Reference>,
}

/// `stakes` is either indexed by position or keyed by the leg index as text
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StakeOverrides {
    List(Vec<LegOverride>),
    Map(HashMap<String, Value>),
}

/// Caller options shared by both conversion routes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversionRequest {
    #[serde(default)]
    pub stake: Option<Value>,
    #[serde(default, deserialize_with = "reference::deserialize_optional")]
    pub account: Option<Reference>,
    #[serde(default)]
    pub stakes: Option<StakeOverrides>,
}

/// Body of the ad-hoc conversion route
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArbitrageBetPayload {
    #[serde(default)]
    pub combination_details: Option<Value>,
    #[serde(default)]
    pub match_signature: Option<String>,
    #[serde(default)]
    pub profit: Option<Value>,
    #[serde(default)]
    pub kickoff_datetime: Option<String>,
    #[serde(flatten)]
    pub request: ConversionRequest,
}

/// The opportunity data a conversion works from
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSource {
    pub arbitrage_id: Option<i64>,
    pub match_signature: Option<String>,
    pub profit: f64,
    pub kickoff_datetime: Option<String>,
    pub legs: Vec<LegRecord>,
}

impl ConversionSource {
    pub fn from_opportunity(opp: &ArbitrageOpportunity) -> Result<Self> {
        let legs = opp
            .legs()
            .map_err(|_| LedgerError::validation("Invalid combination details format"))?;
        Ok(Self {
            arbitrage_id: Some(opp.id),
            match_signature: Some(opp.match_signature.clone()),
            profit: opp.profit,
            kickoff_datetime: opp.kickoff_datetime.clone(),
            legs,
        })
    }

    pub fn from_payload(payload: &ArbitrageBetPayload) -> Result<Self> {
        let legs = match &payload.combination_details {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => legs_from_value(value)?.1,
        };
        let profit = match &payload.profit {
            None | Some(Value::Null) => 0.0,
            Some(v) => parse_number(v)
                .filter(|p| p.is_finite())
                .ok_or_else(|| LedgerError::validation(format!("profit must be numeric, got {v}")))?,
        };
        Ok(Self {
            arbitrage_id: None,
            match_signature: payload.match_signature.clone(),
            profit,
            kickoff_datetime: payload.kickoff_datetime.clone(),
            legs,
        })
    }
}

/// Fallbacks taken from configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionDefaults {
    pub stake: f64,
    pub sport: String,
}

/// One bet ready to insert once its references resolve
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedBet {
    pub bet: NewBet,
    pub bookmaker: Option<Reference>,
    pub account: Option<Reference>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionPlan {
    pub bets: Vec<PlannedBet>,
    pub total_stake: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutcome {
    pub message: String,
    pub bets_created: usize,
    pub total_stake: f64,
    pub expected_profit_percentage: f64,
    pub bets: Vec<Bet>,
}

/// Validate legs and resolve per-leg stakes and accounts. No I/O.
pub fn plan_conversion(
    source: &ConversionSource,
    request: &ConversionRequest,
    defaults: &ConversionDefaults,
) -> Result<ConversionPlan> {
    if source.legs.is_empty() {
        return Err(LedgerError::validation("No betting combinations found"));
    }
    let legs = source
        .legs
        .iter()
        .enumerate()
        .map(|(index, leg)| leg.validate(index))
        .collect::<Result<Vec<_>>>()?;

    let first = &legs[0];
    let home = first
        .home_team
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_HOME);
    let away = first
        .away_team
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_AWAY);
    let event_name = format!("{home} vs {away}");
    let bet_type = first
        .market
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_BET_TYPE)
        .to_string();
    let kickoff = source.kickoff_datetime.as_deref().and_then(parse_kickoff);
    // `{:?}` keeps the decimal point on whole numbers: "3.0", not "3"
    let notes = format!("Added from arbitrage opportunity (Profit: {:?}%)", source.profit);

    let request_stake = match &request.stake {
        None | Some(Value::Null) => None,
        Some(v) => Some(stake_value("stake", v)?),
    };

    let mut bets = Vec::with_capacity(legs.len());
    let mut total_stake = 0.0;
    for (index, leg) in legs.into_iter().enumerate() {
        let list_override = match &request.stakes {
            Some(StakeOverrides::List(list)) => list.get(index),
            _ => None,
        };

        let stake = match (&request.stakes, list_override) {
            (_, Some(LegOverride { stake: Some(v), .. })) if !v.is_null() => {
                stake_value(&format!("stakes[{index}].stake"), v)?
            }
            (Some(StakeOverrides::Map(map)), _) => match map.get(&index.to_string()) {
                Some(v) if !v.is_null() => stake_value(&format!("stakes[\"{index}\"]"), v)?,
                _ => request_stake.unwrap_or(defaults.stake),
            },
            _ => request_stake.unwrap_or(defaults.stake),
        };
        let account = list_override
            .and_then(|o| o.account.clone())
            .or_else(|| request.account.clone());

        total_stake += stake;
        bets.push(PlannedBet {
            bookmaker: Reference::parse(&leg.bookmaker),
            account,
            bet: NewBet {
                sport: defaults.sport.clone(),
                event_name: event_name.clone(),
                bet_type: bet_type.clone(),
                selection: leg.name,
                sportsbook_id: None,
                account_id: None,
                arbitrage_id: source.arbitrage_id,
                odds: leg.odds,
                stake,
                kickoff,
                notes: Some(notes.clone()),
            },
        });
    }

    Ok(ConversionPlan {
        bets,
        total_stake,
        profit: source.profit,
    })
}

fn stake_value(field: &str, value: &Value) -> Result<f64> {
    let stake = parse_number(value)
        .ok_or_else(|| LedgerError::validation(format!("{field} must be numeric, got {value}")))?;
    ensure_positive(field, stake)
}

/// Write a validated plan as one unit of work.
#[instrument(skip(store, plan), fields(bets = plan.bets.len(), profit = plan.profit))]
pub async fn convert_to_bets(store: &LedgerStore, plan: ConversionPlan) -> Result<ConversionOutcome> {
    let mut tx = store.begin().await?;
    let mut ids = Vec::with_capacity(plan.bets.len());

    for planned in &plan.bets {
        let sportsbook = resolve_sportsbook(&mut tx, planned.bookmaker.as_ref()).await?;
        let account = resolve_account(&mut tx, planned.account.as_ref()).await?;
        let bet = NewBet {
            sportsbook_id: sportsbook.map(|s| s.id),
            account_id: account.map(|a| a.id),
            ..planned.bet.clone()
        };
        ids.push(LedgerStore::insert_bet(&mut *tx, &bet).await?);
    }

    let mut bets = Vec::with_capacity(ids.len());
    for id in ids {
        let bet = LedgerStore::find_bet(&mut *tx, id)
            .await?
            .ok_or_else(|| LedgerError::Internal(format!("bet {id} vanished after insert")))?;
        bets.push(bet);
    }
    tx.commit().await?;

    info!(created = bets.len(), total_stake = plan.total_stake, "Converted arbitrage into bets");
    Ok(ConversionOutcome {
        message: format!(
            "Successfully created {} bets from arbitrage opportunity",
            bets.len()
        ),
        bets_created: bets.len(),
        total_stake: plan.total_stake,
        expected_profit_percentage: plan.profit,
        bets,
    })
}
