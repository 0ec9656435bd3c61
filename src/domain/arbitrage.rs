use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::{LedgerError, Result};

/// Placeholder used whenever a leg field cannot be read
pub const UNKNOWN: &str = "Unknown";

/// One selection of an arbitrage, read leniently from stored JSON.
///
/// Every field is optional so that partially filled legs still group and
/// count. Use [`LegRecord::validate`] at write boundaries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bookmaker: Option<String>,
    #[serde(default)]
    pub odds: Option<Value>,
    #[serde(default)]
    pub home_team: Option<String>,
    #[serde(default)]
    pub away_team: Option<String>,
    #[serde(default)]
    pub league: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub market: Option<String>,
}

/// A leg that passed boundary validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedLeg {
    pub name: String,
    pub bookmaker: String,
    pub odds: f64,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub league: Option<String>,
    pub country: Option<String>,
    pub market: Option<String>,
}

impl LegRecord {
    /// Check required fields (`name`, `bookmaker`, numeric `odds`).
    pub fn validate(&self, index: usize) -> Result<ValidatedLeg> {
        let name = non_empty(self.name.as_deref()).ok_or_else(|| {
            LedgerError::validation(format!("combination_details[{index}].name is required"))
        })?;
        let bookmaker = non_empty(self.bookmaker.as_deref()).ok_or_else(|| {
            LedgerError::validation(format!(
                "combination_details[{index}].bookmaker is required"
            ))
        })?;
        let odds = match &self.odds {
            Some(value) => parse_number(value).ok_or_else(|| {
                LedgerError::validation(format!(
                    "combination_details[{index}].odds must be numeric, got {value}"
                ))
            })?,
            None => {
                return Err(LedgerError::validation(format!(
                    "combination_details[{index}].odds is required"
                )))
            }
        };
        if !odds.is_finite() || odds < 1.0 {
            return Err(LedgerError::validation(format!(
                "combination_details[{index}].odds must be decimal odds >= 1.0, got {odds}"
            )));
        }

        Ok(ValidatedLeg {
            name: name.to_string(),
            bookmaker: bookmaker.to_string(),
            odds,
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            league: self.league.clone(),
            country: self.country.clone(),
            market: self.market.clone(),
        })
    }

    /// Read one leg object; fields of the wrong type count as absent
    pub fn from_value_lenient(value: &Value) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            name: text("name"),
            bookmaker: text("bookmaker"),
            odds: value.get("odds").filter(|v| !v.is_null()).cloned(),
            home_team: text("home_team"),
            away_team: text("away_team"),
            league: text("league"),
            country: text("country"),
            market: text("market"),
        }
    }

    pub fn market_or_unknown(&self) -> String {
        field_or_unknown(self.market.as_deref())
    }

    pub fn league_or_unknown(&self) -> String {
        field_or_unknown(self.league.as_deref())
    }

    pub fn country_or_unknown(&self) -> String {
        field_or_unknown(self.country.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn field_or_unknown(value: Option<&str>) -> String {
    non_empty(value).unwrap_or(UNKNOWN).to_string()
}

/// Numbers and numeric strings both count as numbers.
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Parse serialized legs. Accepts the stored text form only.
pub fn parse_legs(raw: &str) -> std::result::Result<Vec<LegRecord>, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Normalize request-supplied legs (a JSON array, or a string holding one)
/// into the text that gets stored. The original array text is kept so
/// extra leg fields survive a round trip.
pub fn legs_from_value(value: &Value) -> Result<(String, Vec<LegRecord>)> {
    let array = match value {
        Value::Array(_) => value.clone(),
        Value::String(s) => serde_json::from_str::<Value>(s).map_err(|e| {
            LedgerError::validation(format!("combination_details is not valid JSON: {e}"))
        })?,
        other => {
            return Err(LedgerError::validation(format!(
                "combination_details must be a list of legs, got {other}"
            )))
        }
    };
    if !array.is_array() {
        return Err(LedgerError::validation(
            "combination_details must be a list of legs",
        ));
    }
    let legs: Vec<LegRecord> = serde_json::from_value(array.clone())
        .map_err(|e| LedgerError::validation(format!("Invalid combination details format: {e}")))?;
    Ok((serde_json::to_string(&array)?, legs))
}

/// `"{home} vs {away} - {market}"`
pub fn derive_match_signature(home: &str, away: &str, market: &str) -> String {
    format!("{home} vs {away} - {market}")
}

/// Best-effort kickoff parsing.
///
/// Accepts RFC 3339 (`Z` or explicit offset), ISO-8601 without an offset
/// (read as UTC) and `YYYY-MM-DD HH:MM:SS`. Anything else is `None`.
pub fn parse_kickoff(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.contains('T') {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        let naive = raw.trim_end_matches('Z');
        for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
                return Some(dt.and_utc());
            }
        }
        return None;
    }

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.and_utc());
        }
    }
    None
}

/// A persisted arbitrage opportunity
#[derive(Debug, Clone, Serialize)]
pub struct ArbitrageOpportunity {
    pub id: i64,
    pub match_signature: String,
    pub profit: f64,
    pub kickoff_datetime: Option<String>,
    #[serde(serialize_with = "serialize_legs")]
    pub combination_details: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Emit stored legs as a JSON array; unreadable text becomes `[]`.
fn serialize_legs<S: Serializer>(raw: &str, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Array(_)) => value.serialize(serializer),
        _ => Vec::<Value>::new().serialize(serializer),
    }
}

impl ArbitrageOpportunity {
    pub fn legs(&self) -> std::result::Result<Vec<LegRecord>, serde_json::Error> {
        parse_legs(&self.combination_details)
    }

    /// First leg, if the stored text is a non-empty JSON array.
    ///
    /// Only element 0 is read, field by field, so a malformed later leg
    /// does not hide the first leg's market or league.
    pub fn first_leg(&self) -> Option<LegRecord> {
        let value: Value = serde_json::from_str(&self.combination_details).ok()?;
        value.as_array()?.first().map(LegRecord::from_value_lenient)
    }

    pub fn market(&self) -> String {
        self.first_leg()
            .map(|leg| leg.market_or_unknown())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    pub fn league(&self) -> String {
        self.first_leg()
            .map(|leg| leg.league_or_unknown())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    pub fn country(&self) -> String {
        self.first_leg()
            .map(|leg| leg.country_or_unknown())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    pub fn kickoff(&self) -> Option<DateTime<Utc>> {
        self.kickoff_datetime.as_deref().and_then(parse_kickoff)
    }
}

/// Validated input for a new opportunity
#[derive(Debug, Clone, PartialEq)]
pub struct NewArbitrage {
    pub match_signature: String,
    pub profit: f64,
    pub kickoff_datetime: Option<String>,
    pub combination_details: String,
    pub is_active: bool,
    /// First-leg market, used for import dedup
    pub market: String,
}

/// Request-shaped opportunity, shared by create and bulk import
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArbitragePayload {
    #[serde(default)]
    pub profit: Option<Value>,
    #[serde(default)]
    pub match_signature: Option<String>,
    #[serde(default)]
    pub kickoff_datetime: Option<String>,
    #[serde(default)]
    pub combination_details: Option<Value>,
    #[serde(default)]
    pub is_active: Option<bool>,
    // Flat fields carried by exported opportunity files
    #[serde(default)]
    pub home_team: Option<String>,
    #[serde(default)]
    pub away_team: Option<String>,
    #[serde(default, alias = "market_name")]
    pub market: Option<String>,
}

impl ArbitragePayload {
    pub fn into_new_arbitrage(self) -> Result<NewArbitrage> {
        let profit = self
            .profit
            .as_ref()
            .ok_or_else(|| LedgerError::validation("profit is required"))
            .and_then(|v| {
                parse_number(v)
                    .filter(|p| p.is_finite())
                    .ok_or_else(|| LedgerError::validation(format!("profit must be numeric, got {v}")))
            })?;

        let details = self
            .combination_details
            .as_ref()
            .ok_or_else(|| LedgerError::validation("combination_details is required"))?;
        let (combination_details, legs) = legs_from_value(details)?;
        if legs.is_empty() {
            return Err(LedgerError::validation("combination_details must not be empty"));
        }
        for (index, leg) in legs.iter().enumerate() {
            leg.validate(index)?;
        }

        let first = &legs[0];
        let market = non_empty(self.market.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| first.market_or_unknown());

        let match_signature = match non_empty(self.match_signature.as_deref()) {
            Some(signature) => signature.to_string(),
            None => {
                let home = non_empty(self.home_team.as_deref())
                    .or(non_empty(first.home_team.as_deref()));
                let away = non_empty(self.away_team.as_deref())
                    .or(non_empty(first.away_team.as_deref()));
                match (home, away) {
                    (Some(home), Some(away)) => derive_match_signature(home, away, &market),
                    _ => {
                        return Err(LedgerError::validation(
                            "match_signature is required when home_team/away_team are absent",
                        ))
                    }
                }
            }
        };

        Ok(NewArbitrage {
            match_signature,
            profit,
            kickoff_datetime: self
                .kickoff_datetime
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            combination_details,
            is_active: self.is_active.unwrap_or(true),
            market,
        })
    }
}

/// Partial update of an opportunity; absent fields stay unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArbitrageUpdate {
    #[serde(default)]
    pub profit: Option<Value>,
    #[serde(default)]
    pub match_signature: Option<String>,
    #[serde(default)]
    pub kickoff_datetime: Option<String>,
    #[serde(default)]
    pub combination_details: Option<Value>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Validated partial update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArbitrageChanges {
    pub profit: Option<f64>,
    pub match_signature: Option<String>,
    pub kickoff_datetime: Option<String>,
    pub combination_details: Option<String>,
    pub is_active: Option<bool>,
}

impl ArbitrageUpdate {
    pub fn validate(self) -> Result<ArbitrageChanges> {
        let profit = match self.profit {
            Some(v) => Some(
                parse_number(&v)
                    .filter(|p| p.is_finite())
                    .ok_or_else(|| LedgerError::validation(format!("profit must be numeric, got {v}")))?,
            ),
            None => None,
        };
        let match_signature = match self.match_signature {
            Some(s) if s.trim().is_empty() => {
                return Err(LedgerError::validation("match_signature must not be empty"))
            }
            other => other,
        };
        let combination_details = match self.combination_details {
            Some(value) => {
                let (raw, legs) = legs_from_value(&value)?;
                if legs.is_empty() {
                    return Err(LedgerError::validation("combination_details must not be empty"));
                }
                for (index, leg) in legs.iter().enumerate() {
                    leg.validate(index)?;
                }
                Some(raw)
            }
            None => None,
        };
        Ok(ArbitrageChanges {
            profit,
            match_signature,
            kickoff_datetime: self.kickoff_datetime,
            combination_details,
            is_active: self.is_active,
        })
    }
}

/// Predicates applied before grouping or statistics
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ArbitrageFilter {
    pub min_profit: Option<f64>,
    pub max_profit: Option<f64>,
    /// Case-insensitive substring of the first leg's market
    pub market: Option<String>,
    pub league: Option<String>,
    pub country: Option<String>,
    pub is_active: Option<bool>,
}

impl ArbitrageFilter {
    pub fn matches(&self, opp: &ArbitrageOpportunity) -> bool {
        if self.min_profit.is_some_and(|min| opp.profit < min) {
            return false;
        }
        if self.max_profit.is_some_and(|max| opp.profit > max) {
            return false;
        }
        if self.is_active.is_some_and(|active| opp.is_active != active) {
            return false;
        }
        if self.market.is_none() && self.league.is_none() && self.country.is_none() {
            return true;
        }

        let first = opp.first_leg().unwrap_or_default();
        contains_ci(&first.market_or_unknown(), self.market.as_deref())
            && contains_ci(&first.league_or_unknown(), self.league.as_deref())
            && contains_ci(&first.country_or_unknown(), self.country.as_deref())
    }
}

fn contains_ci(haystack: &str, needle: Option<&str>) -> bool {
    match needle.map(str::trim).filter(|n| !n.is_empty()) {
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
        None => true,
    }
}

/// Sort key for opportunity listings and group summaries.
/// Unrecognised keys sort by profit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum SortKey {
    #[default]
    Profit,
    KickoffDatetime,
    CreatedAt,
}

impl From<String> for SortKey {
    fn from(s: String) -> Self {
        match s.trim() {
            "kickoff_datetime" => SortKey::KickoffDatetime,
            "created_at" => SortKey::CreatedAt,
            _ => SortKey::Profit,
        }
    }
}

/// Anything other than `asc` sorts descending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl From<String> for SortOrder {
    fn from(s: String) -> Self {
        if s.trim() == "asc" {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_opportunity(id: i64, signature: &str, profit: f64) -> ArbitrageOpportunity {
    use chrono::TimeZone;

    let legs = serde_json::json!([
        {"name": "Home", "bookmaker": "Bet365", "odds": 2.1, "home_team": "A", "away_team": "B",
         "league": "Premier League", "country": "England", "market": "Match Result"},
        {"name": "Draw", "bookmaker": "Unibet", "odds": 3.6, "market": "Match Result"},
        {"name": "Away", "bookmaker": "Pinnacle", "odds": 4.2, "market": "Match Result"}
    ]);
    let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + chrono::Duration::minutes(id);
    ArbitrageOpportunity {
        id,
        match_signature: signature.to_string(),
        profit,
        kickoff_datetime: Some("2024-03-02T15:00:00Z".to_string()),
        combination_details: legs.to_string(),
        is_active: true,
        created_at: created,
        updated_at: created,
    }
}
