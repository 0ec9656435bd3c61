use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use super::arbitrage::{parse_kickoff, parse_number};
use super::reference::{self, Reference};
use crate::error::{LedgerError, Result};

/// Bet settlement states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetStatus {
    /// Placed, not yet settled
    Pending,
    Won,
    Lost,
    /// Cancelled by the book, stake returned
    Void,
}

impl BetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetStatus::Pending => "pending",
            BetStatus::Won => "won",
            BetStatus::Lost => "lost",
            BetStatus::Void => "void",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, BetStatus::Pending)
    }

    /// Only pending bets settle; settled bets stay where they are.
    pub fn can_transition_to(&self, target: BetStatus) -> bool {
        *self == target || (!self.is_terminal() && target.is_terminal())
    }
}

impl fmt::Display for BetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for BetStatus {
    type Error = LedgerError;

    fn try_from(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(BetStatus::Pending),
            "won" => Ok(BetStatus::Won),
            "lost" => Ok(BetStatus::Lost),
            "void" => Ok(BetStatus::Void),
            other => Err(LedgerError::validation(format!(
                "status must be one of pending, won, lost, void; got {other}"
            ))),
        }
    }
}

/// `stake * odds`
pub fn potential_payout(stake: f64, odds: f64) -> f64 {
    stake * odds
}

/// A ledger bet, joined with its sportsbook and account labels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bet {
    pub id: i64,
    pub sport: String,
    pub event_name: String,
    pub bet_type: String,
    pub selection: String,
    pub sportsbook_id: Option<i64>,
    pub sportsbook: Option<String>,
    pub account_id: Option<i64>,
    /// Account identifier (email or phone)
    pub account: Option<String>,
    pub account_name: Option<String>,
    /// Source opportunity when created by a conversion
    pub arbitrage_id: Option<i64>,
    pub odds: f64,
    pub stake: f64,
    pub status: BetStatus,
    pub potential_payout: f64,
    pub actual_payout: f64,
    pub profit_loss: f64,
    pub date_placed: DateTime<Utc>,
    pub date_settled: Option<DateTime<Utc>>,
    pub kickoff: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl Bet {
    /// Apply a settlement transition.
    ///
    /// Requesting the current status is a no-op. Moving a settled bet to a
    /// different status is rejected.
    pub fn settle(
        &mut self,
        target: BetStatus,
        actual_payout: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(LedgerError::InvalidStateTransition {
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }
        if self.status == target {
            return Ok(());
        }

        match target {
            BetStatus::Pending => {}
            BetStatus::Won => {
                let payout = actual_payout.unwrap_or(self.potential_payout);
                if !payout.is_finite() || payout < 0.0 {
                    return Err(LedgerError::validation(format!(
                        "actual_payout must be a non-negative number, got {payout}"
                    )));
                }
                self.actual_payout = payout;
                self.profit_loss = payout - self.stake;
            }
            BetStatus::Lost => {
                self.actual_payout = 0.0;
                self.profit_loss = -self.stake;
            }
            BetStatus::Void => {
                self.actual_payout = self.stake;
                self.profit_loss = 0.0;
            }
        }
        self.status = target;
        self.date_settled = Some(now);
        Ok(())
    }

    /// Recompute the potential payout after an odds or stake edit
    pub fn reprice(&mut self) {
        self.potential_payout = potential_payout(self.stake, self.odds);
    }
}

/// Insert-ready bet; payout fields are derived on insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewBet {
    pub sport: String,
    pub event_name: String,
    pub bet_type: String,
    pub selection: String,
    pub sportsbook_id: Option<i64>,
    pub account_id: Option<i64>,
    pub arbitrage_id: Option<i64>,
    pub odds: f64,
    pub stake: f64,
    pub kickoff: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl NewBet {
    pub fn potential_payout(&self) -> f64 {
        potential_payout(self.stake, self.odds)
    }
}

/// Check a stake or odds value coming from a request
pub fn ensure_positive(field: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(LedgerError::validation(format!(
            "{field} must be greater than 0, got {value}"
        )))
    }
}

/// Request body for a manually entered bet
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BetPayload {
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub bet_type: Option<String>,
    #[serde(default)]
    pub selection: Option<String>,
    #[serde(default, deserialize_with = "reference::deserialize_optional")]
    pub sportsbook: Option<Reference>,
    #[serde(default, deserialize_with = "reference::deserialize_optional")]
    pub account: Option<Reference>,
    #[serde(default)]
    pub odds: Option<Value>,
    #[serde(default)]
    pub stake: Option<Value>,
    #[serde(default)]
    pub kickoff: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A validated bet whose references still need resolving
#[derive(Debug, Clone, PartialEq)]
pub struct BetDraft {
    pub bet: NewBet,
    pub sportsbook: Option<Reference>,
    pub account: Option<Reference>,
}

impl BetPayload {
    pub fn validate(self, default_sport: &str) -> Result<BetDraft> {
        let odds = required_number("odds", self.odds.as_ref())?;
        let stake = required_number("stake", self.stake.as_ref())?;
        let kickoff = match self.kickoff.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(strict_kickoff(raw)?),
        };

        Ok(BetDraft {
            bet: NewBet {
                sport: non_blank(self.sport).unwrap_or_else(|| default_sport.to_string()),
                event_name: required_text("event_name", self.event_name)?,
                bet_type: required_text("bet_type", self.bet_type)?,
                selection: required_text("selection", self.selection)?,
                sportsbook_id: None,
                account_id: None,
                arbitrage_id: None,
                odds,
                stake,
                kickoff,
                notes: non_blank(self.notes),
            },
            sportsbook: self.sportsbook,
            account: self.account,
        })
    }
}

/// Partial edit of a bet, optionally settling it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BetUpdate {
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub bet_type: Option<String>,
    #[serde(default)]
    pub selection: Option<String>,
    #[serde(default, deserialize_with = "reference::deserialize_optional")]
    pub sportsbook: Option<Reference>,
    #[serde(default, deserialize_with = "reference::deserialize_optional")]
    pub account: Option<Reference>,
    #[serde(default)]
    pub odds: Option<Value>,
    #[serde(default)]
    pub stake: Option<Value>,
    /// Present-but-null clears the kickoff
    #[serde(default, deserialize_with = "present")]
    pub kickoff: Option<Value>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub actual_payout: Option<Value>,
}

/// Validated bet edit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BetChanges {
    pub sport: Option<String>,
    pub event_name: Option<String>,
    pub bet_type: Option<String>,
    pub selection: Option<String>,
    pub sportsbook: Option<Reference>,
    pub account: Option<Reference>,
    pub odds: Option<f64>,
    pub stake: Option<f64>,
    pub kickoff: Option<Option<DateTime<Utc>>>,
    pub notes: Option<String>,
    pub status: Option<BetStatus>,
    pub actual_payout: Option<f64>,
}

impl BetUpdate {
    pub fn validate(self) -> Result<BetChanges> {
        let odds = self
            .odds
            .as_ref()
            .map(|v| required_number("odds", Some(v)))
            .transpose()?;
        let stake = self
            .stake
            .as_ref()
            .map(|v| required_number("stake", Some(v)))
            .transpose()?;
        let kickoff = match self.kickoff {
            None => None,
            Some(Value::Null) => Some(None),
            Some(Value::String(s)) if s.trim().is_empty() => Some(None),
            Some(Value::String(s)) => Some(Some(strict_kickoff(&s)?)),
            Some(other) => {
                return Err(LedgerError::validation(format!(
                    "kickoff must be a datetime string, got {other}"
                )))
            }
        };
        let status = self.status.as_deref().map(BetStatus::try_from).transpose()?;
        let actual_payout = match &self.actual_payout {
            None | Some(Value::Null) => None,
            Some(v) => Some(parse_number(v).ok_or_else(|| {
                LedgerError::validation(format!("actual_payout must be numeric, got {v}"))
            })?),
        };

        Ok(BetChanges {
            sport: self.sport,
            event_name: self.event_name,
            bet_type: self.bet_type,
            selection: self.selection,
            sportsbook: self.sportsbook,
            account: self.account,
            odds,
            stake,
            kickoff,
            notes: self.notes,
            status,
            actual_payout,
        })
    }
}

impl Bet {
    /// Apply field edits, reprice, then settle if a status was requested.
    /// Reference changes are resolved by the caller.
    pub fn apply(&mut self, changes: &BetChanges, now: DateTime<Utc>) -> Result<()> {
        if let Some(sport) = &changes.sport {
            self.sport = sport.clone();
        }
        if let Some(event_name) = &changes.event_name {
            self.event_name = event_name.clone();
        }
        if let Some(bet_type) = &changes.bet_type {
            self.bet_type = bet_type.clone();
        }
        if let Some(selection) = &changes.selection {
            self.selection = selection.clone();
        }
        if let Some(kickoff) = changes.kickoff {
            self.kickoff = kickoff;
        }
        if let Some(notes) = &changes.notes {
            self.notes = Some(notes.clone());
        }
        if changes.odds.is_some() || changes.stake.is_some() {
            self.odds = changes.odds.unwrap_or(self.odds);
            self.stake = changes.stake.unwrap_or(self.stake);
            self.reprice();
        }
        if let Some(status) = changes.status {
            self.settle(status, changes.actual_payout, now)?;
        }
        Ok(())
    }
}

/// `deserialize_with` for fields where a present null differs from absent
pub(crate) fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Text counterpart of [`present`]: absent is `None`, null is `Some(None)`
pub(crate) fn present_text<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

fn required_number(field: &str, value: Option<&Value>) -> Result<f64> {
    let value = value.ok_or_else(|| LedgerError::validation(format!("{field} is required")))?;
    let number = parse_number(value)
        .ok_or_else(|| LedgerError::validation(format!("{field} must be numeric, got {value}")))?;
    ensure_positive(field, number)
}

fn required_text(field: &str, value: Option<String>) -> Result<String> {
    non_blank(value).ok_or_else(|| LedgerError::validation(format!("{field} is required")))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn strict_kickoff(raw: &str) -> Result<DateTime<Utc>> {
    parse_kickoff(raw).ok_or_else(|| LedgerError::validation("Invalid kickoff datetime format"))
}
