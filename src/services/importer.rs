use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::adapters::LedgerStore;
use crate::domain::ArbitragePayload;
use crate::error::{LedgerError, Result};

/// Body of the bulk import route: a bare array, or an object carrying one
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ImportRequest {
    Items(Vec<Value>),
    Wrapped {
        opportunities: Vec<Value>,
        #[serde(default)]
        replace: bool,
    },
}

impl ImportRequest {
    pub fn into_parts(self) -> (Vec<Value>, bool) {
        match self {
            ImportRequest::Items(items) => (items, false),
            ImportRequest::Wrapped {
                opportunities,
                replace,
            } => (opportunities, replace),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub total_processed: usize,
    pub imported: usize,
    /// Exact `{match_signature, market, profit}` repeats
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    /// Rows deleted first when `replace` was requested
    pub cleared: u64,
}

/// Import opportunity records in one transaction.
///
/// Malformed items are counted and reported but do not stop the batch.
/// Items whose signature, first-leg market and profit match an existing
/// row (including rows imported earlier in the same batch) are skipped.
pub async fn import_opportunities(
    store: &LedgerStore,
    items: Vec<Value>,
    replace: bool,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary {
        total_processed: items.len(),
        ..Default::default()
    };
    let mut tx = store.begin().await?;

    if replace {
        summary.cleared = LedgerStore::clear_arbitrages(&mut *tx).await?;
        info!(cleared = summary.cleared, "Cleared existing arbitrage opportunities");
    }

    for (index, item) in items.into_iter().enumerate() {
        let parsed = serde_json::from_value::<ArbitragePayload>(item)
            .map_err(LedgerError::from)
            .and_then(ArbitragePayload::into_new_arbitrage);
        let arb = match parsed {
            Ok(arb) => arb,
            Err(e) => {
                warn!(index, error = %e, "Skipping invalid arbitrage record");
                summary.failed += 1;
                summary.errors.push(format!("item {index}: {e}"));
                continue;
            }
        };

        if LedgerStore::arbitrage_exists(&mut *tx, &arb).await? {
            summary.skipped += 1;
            continue;
        }
        LedgerStore::insert_arbitrage(&mut *tx, &arb).await?;
        summary.imported += 1;
    }

    tx.commit().await?;
    info!(
        imported = summary.imported,
        skipped = summary.skipped,
        failed = summary.failed,
        "Arbitrage import finished"
    );
    Ok(summary)
}
