use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::arbitrage::parse_number;
use super::bet::{present, present_text};
use super::reference::{self, Reference};
use crate::error::{LedgerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
        }
    }
}

impl TryFrom<&str> for TransactionType {
    type Error = LedgerError;

    fn try_from(s: &str) -> Result<Self> {
        match s {
            "deposit" => Ok(TransactionType::Deposit),
            "withdrawal" => Ok(TransactionType::Withdrawal),
            _ => Err(LedgerError::validation(
                "transaction_type must be either \"deposit\" or \"withdrawal\"",
            )),
        }
    }
}

/// A deposit to or withdrawal from a sportsbook balance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerTransaction {
    pub id: i64,
    pub transaction_type: TransactionType,
    pub sportsbook_id: Option<i64>,
    pub sportsbook: Option<String>,
    pub account_id: Option<i64>,
    pub account: Option<String>,
    pub account_name: Option<String>,
    pub amount: f64,
    pub tax: f64,
    pub transaction_charges: f64,
    pub payment_method: Option<String>,
    pub reference_id: Option<String>,
    pub status: String,
    pub date_created: DateTime<Utc>,
    pub date_processed: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Request body for a new transaction
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionPayload {
    #[serde(default)]
    pub transaction_type: Option<String>,
    #[serde(default, deserialize_with = "reference::deserialize_optional")]
    pub sportsbook: Option<Reference>,
    #[serde(default, deserialize_with = "reference::deserialize_optional")]
    pub account: Option<Reference>,
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub tax: Option<Value>,
    #[serde(default)]
    pub transaction_charges: Option<Value>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub reference_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Validated transaction, references still unresolved
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub transaction_type: TransactionType,
    pub sportsbook: Reference,
    pub account: Option<Reference>,
    pub amount: f64,
    pub tax: f64,
    pub transaction_charges: f64,
    pub payment_method: Option<String>,
    pub reference_id: Option<String>,
    pub status: String,
    pub notes: Option<String>,
}

impl TransactionPayload {
    pub fn validate(self) -> Result<TransactionDraft> {
        let transaction_type = self
            .transaction_type
            .as_deref()
            .ok_or_else(|| LedgerError::validation("transaction_type is required"))
            .and_then(TransactionType::try_from)?;
        let sportsbook = self
            .sportsbook
            .ok_or_else(|| LedgerError::validation("sportsbook is required"))?;
        let amount = self
            .amount
            .as_ref()
            .ok_or_else(|| LedgerError::validation("amount is required"))
            .and_then(|v| parse_number(v).ok_or_else(|| LedgerError::validation("Invalid amount format")))?;
        if !amount.is_finite() || amount <= 0.0 {
            return Err(LedgerError::validation("Amount must be greater than 0"));
        }

        Ok(TransactionDraft {
            transaction_type,
            sportsbook,
            account: self.account,
            amount,
            tax: optional_amount("tax", self.tax.as_ref())?,
            transaction_charges: optional_amount(
                "transaction_charges",
                self.transaction_charges.as_ref(),
            )?,
            payment_method: self.payment_method,
            reference_id: self.reference_id,
            status: self.status.unwrap_or_else(|| "completed".to_string()),
            notes: self.notes,
        })
    }
}

/// Partial edit of a transaction. Keys that are present apply, even when
/// null; absent keys leave the field alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionUpdate {
    #[serde(default)]
    pub transaction_type: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub sportsbook: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub account: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub amount: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub tax: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub transaction_charges: Option<Value>,
    #[serde(default, deserialize_with = "present_text")]
    pub payment_method: Option<Option<String>>,
    #[serde(default, deserialize_with = "present_text")]
    pub reference_id: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "present_text")]
    pub notes: Option<Option<String>>,
}

/// Validated transaction edit; `Some(None)` clears a field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionChanges {
    pub transaction_type: Option<TransactionType>,
    pub sportsbook: Option<Option<Reference>>,
    pub account: Option<Option<Reference>>,
    pub amount: Option<f64>,
    pub tax: Option<f64>,
    pub transaction_charges: Option<f64>,
    pub payment_method: Option<Option<String>>,
    pub reference_id: Option<Option<String>>,
    pub status: Option<String>,
    pub notes: Option<Option<String>>,
}

impl TransactionUpdate {
    pub fn validate(self) -> Result<TransactionChanges> {
        let transaction_type = self
            .transaction_type
            .as_deref()
            .map(TransactionType::try_from)
            .transpose()?;
        let amount = self
            .amount
            .as_ref()
            .map(|v| {
                let amount = parse_number(v)
                    .filter(|n| n.is_finite())
                    .ok_or_else(|| LedgerError::validation("Invalid amount format"))?;
                if amount <= 0.0 {
                    return Err(LedgerError::validation("Amount must be greater than 0"));
                }
                Ok(amount)
            })
            .transpose()?;

        Ok(TransactionChanges {
            transaction_type,
            sportsbook: self.sportsbook.map(|v| Reference::from_json(&v)),
            account: self.account.map(|v| Reference::from_json(&v)),
            amount,
            tax: self
                .tax
                .as_ref()
                .map(|v| optional_amount("tax", Some(v)))
                .transpose()?,
            transaction_charges: self
                .transaction_charges
                .as_ref()
                .map(|v| optional_amount("transaction_charges", Some(v)))
                .transpose()?,
            payment_method: self.payment_method,
            reference_id: self.reference_id,
            status: self.status,
            notes: self.notes,
        })
    }
}

impl LedgerTransaction {
    /// Apply scalar edits. References are resolved by the caller. Moving to
    /// `completed` stamps `date_processed` once.
    pub fn apply(&mut self, changes: &TransactionChanges, now: DateTime<Utc>) {
        if let Some(kind) = changes.transaction_type {
            self.transaction_type = kind;
        }
        if let Some(amount) = changes.amount {
            self.amount = amount;
        }
        if let Some(tax) = changes.tax {
            self.tax = tax;
        }
        if let Some(charges) = changes.transaction_charges {
            self.transaction_charges = charges;
        }
        if let Some(method) = &changes.payment_method {
            self.payment_method = method.clone();
        }
        if let Some(reference_id) = &changes.reference_id {
            self.reference_id = reference_id.clone();
        }
        if let Some(notes) = &changes.notes {
            self.notes = notes.clone();
        }
        if let Some(status) = &changes.status {
            self.status = status.clone();
            if status == "completed" && self.date_processed.is_none() {
                self.date_processed = Some(now);
            }
        }
    }
}

/// Missing, null or empty-string amounts count as zero
fn optional_amount(field: &str, value: Option<&Value>) -> Result<f64> {
    match value {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(0.0),
        Some(v) => parse_number(v)
            .filter(|n| n.is_finite())
            .ok_or_else(|| LedgerError::validation(format!("Invalid {field} format"))),
    }
}
