//! Bet and transaction writes that need reference resolution.

use chrono::Utc;
use tracing::{info, instrument};

use crate::adapters::LedgerStore;
use crate::domain::{
    Bet, BetChanges, BetDraft, LedgerTransaction, NewBet, TransactionChanges, TransactionDraft,
};
use crate::error::{LedgerError, Result};
use crate::services::resolver::{resolve_account, resolve_sportsbook};

#[instrument(skip(store, draft), fields(event = %draft.bet.event_name))]
pub async fn create_bet(store: &LedgerStore, draft: BetDraft) -> Result<Bet> {
    let mut tx = store.begin().await?;
    let sportsbook = resolve_sportsbook(&mut tx, draft.sportsbook.as_ref()).await?;
    let account = resolve_account(&mut tx, draft.account.as_ref()).await?;

    let bet = NewBet {
        sportsbook_id: sportsbook.map(|s| s.id),
        account_id: account.map(|a| a.id),
        ..draft.bet
    };
    let id = LedgerStore::insert_bet(&mut *tx, &bet).await?;
    let created = LedgerStore::find_bet(&mut *tx, id)
        .await?
        .ok_or_else(|| LedgerError::Internal(format!("bet {id} vanished after insert")))?;
    tx.commit().await?;

    info!(id, stake = created.stake, odds = created.odds, "Bet created");
    Ok(created)
}

/// Edit and optionally settle a bet. Returns `NotFound` for unknown ids.
#[instrument(skip(store, changes))]
pub async fn update_bet(store: &LedgerStore, id: i64, changes: BetChanges) -> Result<Bet> {
    let mut tx = store.begin().await?;
    let mut bet = LedgerStore::find_bet(&mut *tx, id)
        .await?
        .ok_or_else(|| LedgerError::not_found(format!("Bet {id} not found")))?;
    let previous = bet.status;

    if changes.sportsbook.is_some() {
        bet.sportsbook_id = resolve_sportsbook(&mut tx, changes.sportsbook.as_ref())
            .await?
            .map(|s| s.id);
    }
    if changes.account.is_some() {
        bet.account_id = resolve_account(&mut tx, changes.account.as_ref())
            .await?
            .map(|a| a.id);
    }
    bet.apply(&changes, Utc::now())?;

    LedgerStore::save_bet(&mut *tx, &bet).await?;
    let updated = LedgerStore::find_bet(&mut *tx, id)
        .await?
        .ok_or_else(|| LedgerError::not_found(format!("Bet {id} not found")))?;
    tx.commit().await?;

    if previous != updated.status {
        info!(
            id,
            from = %previous,
            to = %updated.status,
            profit_loss = updated.profit_loss,
            "Bet settled"
        );
    }
    Ok(updated)
}

/// Record a deposit or withdrawal. The sportsbook is auto-created when new;
/// an unknown account is stored as no account.
#[instrument(skip(store, draft), fields(kind = draft.transaction_type.as_str(), amount = draft.amount))]
pub async fn create_transaction(
    store: &LedgerStore,
    draft: TransactionDraft,
) -> Result<LedgerTransaction> {
    let mut tx = store.begin().await?;
    let sportsbook = resolve_sportsbook(&mut tx, Some(&draft.sportsbook)).await?;
    let account = resolve_account(&mut tx, draft.account.as_ref()).await?;

    let now = Utc::now();
    let record = LedgerTransaction {
        id: 0,
        transaction_type: draft.transaction_type,
        sportsbook_id: sportsbook.map(|s| s.id),
        sportsbook: None,
        account_id: account.map(|a| a.id),
        account: None,
        account_name: None,
        amount: draft.amount,
        tax: draft.tax,
        transaction_charges: draft.transaction_charges,
        payment_method: draft.payment_method,
        reference_id: draft.reference_id,
        date_processed: (draft.status == "completed").then_some(now),
        status: draft.status,
        date_created: now,
        notes: draft.notes,
    };
    let id = LedgerStore::insert_transaction(&mut *tx, &record).await?;
    let created = LedgerStore::find_transaction(&mut *tx, id)
        .await?
        .ok_or_else(|| LedgerError::Internal(format!("transaction {id} vanished after insert")))?;
    tx.commit().await?;
    Ok(created)
}

/// Edit a transaction. Present references are re-resolved, so a new
/// sportsbook name is auto-created and an unknown account clears the link.
#[instrument(skip(store, changes))]
pub async fn update_transaction(
    store: &LedgerStore,
    id: i64,
    changes: TransactionChanges,
) -> Result<LedgerTransaction> {
    let mut tx = store.begin().await?;
    let mut record = LedgerStore::find_transaction(&mut *tx, id)
        .await?
        .ok_or_else(|| LedgerError::not_found(format!("Transaction {id} not found")))?;

    if let Some(sportsbook) = &changes.sportsbook {
        record.sportsbook_id = resolve_sportsbook(&mut tx, sportsbook.as_ref())
            .await?
            .map(|s| s.id);
    }
    if let Some(account) = &changes.account {
        record.account_id = resolve_account(&mut tx, account.as_ref())
            .await?
            .map(|a| a.id);
    }
    record.apply(&changes, Utc::now());

    LedgerStore::save_transaction(&mut *tx, &record).await?;
    let updated = LedgerStore::find_transaction(&mut *tx, id)
        .await?
        .ok_or_else(|| LedgerError::not_found(format!("Transaction {id} not found")))?;
    tx.commit().await?;

    info!(id, status = %updated.status, amount = updated.amount, "Transaction updated");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        BetPayload, BetStatus, BetUpdate, TransactionPayload, TransactionType, TransactionUpdate,
    };
    use serde_json::json;

    async fn seeded_bet(store: &LedgerStore) -> Bet {
        let draft: BetPayload = serde_json::from_value(json!({
            "event_name": "Arsenal vs Chelsea",
            "bet_type": "Match Result",
            "selection": "Arsenal",
            "sportsbook": "Bet365",
            "odds": 2.0,
            "stake": 50
        }))
        .unwrap();
        create_bet(store, draft.validate("Football").unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_bet_resolves_sportsbook() {
        let store = LedgerStore::in_memory().await.unwrap();
        let bet = seeded_bet(&store).await;
        assert_eq!(bet.status, BetStatus::Pending);
        assert_eq!(bet.potential_payout, 100.0);
        assert_eq!(bet.sportsbook.as_deref(), Some("Bet365"));
        assert_eq!(bet.account_id, None);
    }

    #[tokio::test]
    async fn test_settle_then_reject_resettlement() {
        let store = LedgerStore::in_memory().await.unwrap();
        let bet = seeded_bet(&store).await;

        let won: BetUpdate = serde_json::from_value(json!({"status": "won"})).unwrap();
        let settled = update_bet(&store, bet.id, won.validate().unwrap()).await.unwrap();
        assert_eq!(settled.actual_payout, 100.0);
        assert_eq!(settled.profit_loss, 50.0);
        assert!(settled.date_settled.is_some());

        let lost: BetUpdate = serde_json::from_value(json!({"status": "lost"})).unwrap();
        let err = update_bet(&store, bet.id, lost.validate().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidStateTransition { .. }));

        let unchanged = store.get_bet(bet.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, BetStatus::Won);
    }

    #[tokio::test]
    async fn test_update_missing_bet() {
        let store = LedgerStore::in_memory().await.unwrap();
        let err = update_bet(&store, 404, BetChanges::default()).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_transaction() {
        let store = LedgerStore::in_memory().await.unwrap();
        let payload: TransactionPayload = serde_json::from_value(json!({
            "transaction_type": "deposit",
            "sportsbook": "Pinnacle",
            "account": "nobody@example.com",
            "amount": 200,
            "tax": 2.5
        }))
        .unwrap();
        let created = create_transaction(&store, payload.validate().unwrap())
            .await
            .unwrap();
        assert_eq!(created.transaction_type, TransactionType::Deposit);
        assert_eq!(created.sportsbook.as_deref(), Some("Pinnacle"));
        assert_eq!(created.account_id, None);
        assert_eq!(created.tax, 2.5);
        assert_eq!(created.transaction_charges, 0.0);
        assert!(created.date_processed.is_some());
    }

    #[tokio::test]
    async fn test_update_transaction_moves_sportsbook_and_completes() {
        let store = LedgerStore::in_memory().await.unwrap();
        let payload: TransactionPayload = serde_json::from_value(json!({
            "transaction_type": "withdrawal",
            "sportsbook": "Pinnacle",
            "amount": 80,
            "status": "pending"
        }))
        .unwrap();
        let created = create_transaction(&store, payload.validate().unwrap())
            .await
            .unwrap();
        assert!(created.date_processed.is_none());

        let update: TransactionUpdate = serde_json::from_value(json!({
            "sportsbook": "Betfair",
            "status": "completed",
            "tax": null,
            "notes": "cleared"
        }))
        .unwrap();
        let updated = update_transaction(&store, created.id, update.validate().unwrap())
            .await
            .unwrap();
        assert_eq!(updated.sportsbook.as_deref(), Some("Betfair"));
        assert_eq!(updated.status, "completed");
        assert!(updated.date_processed.is_some());
        assert_eq!(updated.tax, 0.0);
        assert_eq!(updated.amount, 80.0);
        assert_eq!(updated.notes.as_deref(), Some("cleared"));
        assert_eq!(updated.date_created, created.date_created);

        let err = update_transaction(&store, 999, TransactionChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }
}
