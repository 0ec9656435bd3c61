use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bet::present_text;
use crate::error::{LedgerError, Result};

/// A bookmaker the user holds balances with
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sportsbook {
    pub id: i64,
    pub name: String,
    pub display_name: Option<String>,
    pub website_url: Option<String>,
    pub logo_url: Option<String>,
    pub is_active: bool,
    pub country: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewSportsbook {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewSportsbook {
    /// Minimal active record, used by the resolver's auto-create path
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Trim text fields, blank optionals become `None`
    pub fn normalized(self) -> Result<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(LedgerError::validation("Sportsbook name is required"));
        }
        Ok(Self {
            name,
            display_name: blank_to_none(self.display_name),
            website_url: blank_to_none(self.website_url),
            logo_url: blank_to_none(self.logo_url),
            is_active: self.is_active,
            country: blank_to_none(self.country),
            description: blank_to_none(self.description),
        })
    }
}

/// Partial edit of a sportsbook; a present null clears an optional field
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SportsbookUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present_text")]
    pub display_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present_text")]
    pub website_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "present_text")]
    pub logo_url: Option<Option<String>>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "present_text")]
    pub country: Option<Option<String>>,
    #[serde(default, deserialize_with = "present_text")]
    pub description: Option<Option<String>>,
}

impl SportsbookUpdate {
    pub fn normalized(self) -> Result<Self> {
        let name = self
            .name
            .map(|n| {
                let n = n.trim().to_string();
                if n.is_empty() {
                    Err(LedgerError::validation("Sportsbook name is required"))
                } else {
                    Ok(n)
                }
            })
            .transpose()?;
        Ok(Self {
            name,
            display_name: self.display_name.map(blank_to_none),
            website_url: self.website_url.map(blank_to_none),
            logo_url: self.logo_url.map(blank_to_none),
            is_active: self.is_active,
            country: self.country.map(blank_to_none),
            description: self.description.map(blank_to_none),
        })
    }
}

impl Sportsbook {
    pub fn apply(&mut self, update: &SportsbookUpdate, now: DateTime<Utc>) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(display_name) = &update.display_name {
            self.display_name = display_name.clone();
        }
        if let Some(website_url) = &update.website_url {
            self.website_url = website_url.clone();
        }
        if let Some(logo_url) = &update.logo_url {
            self.logo_url = logo_url.clone();
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        if let Some(country) = &update.country {
            self.country = country.clone();
        }
        if let Some(description) = &update.description {
            self.description = description.clone();
        }
        self.updated_at = now;
    }
}

/// Bet volume at one sportsbook
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SportsbookUsage {
    pub sportsbook_name: String,
    pub sportsbook_id: i64,
    pub bet_count: i64,
    pub total_stake: f64,
    pub avg_odds: f64,
    /// Always true; unregistered names never reach the bet table
    pub is_registered: bool,
}

/// Body of the bulk sportsbook route
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkSportsbooks {
    #[serde(default)]
    pub sportsbooks: Option<Vec<NewSportsbook>>,
}

/// Lookup key for a sportsbook name: trimmed and Unicode-lowercased
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Email,
    Phone,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Email => "email",
            AccountType::Phone => "phone",
        }
    }

    /// Emails contain `@` and `.`; phone numbers are digits once `+ - ( )`
    /// and spaces are stripped. Anything else is treated as an email.
    pub fn detect(identifier: &str) -> Self {
        if identifier.contains('@') && identifier.contains('.') {
            return AccountType::Email;
        }
        let digits: String = identifier
            .chars()
            .filter(|c| !matches!(c, '+' | '-' | ' ' | '(' | ')'))
            .collect();
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            AccountType::Phone
        } else {
            AccountType::Email
        }
    }
}

impl TryFrom<&str> for AccountType {
    type Error = LedgerError;

    fn try_from(s: &str) -> Result<Self> {
        match s {
            "email" => Ok(AccountType::Email),
            "phone" => Ok(AccountType::Phone),
            other => Err(LedgerError::validation(format!(
                "account_type must be email or phone, got {other}"
            ))),
        }
    }
}

/// A login identity at one or more sportsbooks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    pub id: i64,
    pub account_identifier: String,
    pub account_type: AccountType,
    pub name: String,
    pub is_active: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewAccount {
    #[serde(default)]
    pub account_identifier: String,
    #[serde(default)]
    pub account_type: Option<AccountType>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewAccount {
    pub fn normalized(self) -> Result<Self> {
        let account_identifier = self.account_identifier.trim().to_string();
        if account_identifier.is_empty() {
            return Err(LedgerError::validation("account_identifier is required"));
        }
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(LedgerError::validation("name is required"));
        }
        let account_type = self
            .account_type
            .unwrap_or_else(|| AccountType::detect(&account_identifier));
        Ok(Self {
            account_identifier,
            account_type: Some(account_type),
            name,
            is_active: self.is_active,
            notes: blank_to_none(self.notes),
        })
    }
}

/// Partial edit of an account
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountUpdate {
    #[serde(default)]
    pub account_identifier: Option<String>,
    #[serde(default)]
    pub account_type: Option<AccountType>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "present_text")]
    pub notes: Option<Option<String>>,
}

impl AccountUpdate {
    pub fn normalized(self) -> Result<Self> {
        let account_identifier = self
            .account_identifier
            .map(|id| non_empty(id, "account_identifier cannot be empty"))
            .transpose()?;
        let name = self
            .name
            .map(|name| non_empty(name, "name cannot be empty"))
            .transpose()?;
        Ok(Self {
            account_identifier,
            account_type: self.account_type,
            name,
            is_active: self.is_active,
            notes: self.notes.map(blank_to_none),
        })
    }
}

impl Account {
    /// A new identifier re-detects the type unless one is given explicitly.
    pub fn apply(&mut self, update: &AccountUpdate, now: DateTime<Utc>) {
        if let Some(identifier) = &update.account_identifier {
            self.account_identifier = identifier.clone();
            self.account_type = AccountType::detect(identifier);
        }
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(account_type) = update.account_type {
            self.account_type = account_type;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        if let Some(notes) = &update.notes {
            self.notes = notes.clone();
        }
        self.updated_at = now;
    }
}

fn non_empty(value: String, message: &str) -> Result<String> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(LedgerError::validation(message));
    }
    Ok(value)
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
