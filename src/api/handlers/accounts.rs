use axum::{extract::State, http::StatusCode, Json};

use crate::adapters::LedgerStore;
use crate::api::{
    error::ApiResult,
    extract::{EntityId, JsonBody},
    state::AppState,
    types::*,
};
use crate::domain::{Account, AccountUpdate, NewAccount};
use crate::error::LedgerError;

/// GET /api/accounts
pub async fn list_accounts(State(state): State<AppState>) -> ApiResult<Json<Vec<Account>>> {
    Ok(Json(state.store.list_accounts().await?))
}

/// POST /api/accounts
pub async fn create_account(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<NewAccount>,
) -> ApiResult<(StatusCode, Json<Account>)> {
    let created = state.store.create_account(&payload.normalized()?).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/accounts/:id
pub async fn get_account(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> ApiResult<Json<Account>> {
    LedgerStore::find_account(state.store.pool(), id)
        .await?
        .map(Json)
        .ok_or_else(|| account_not_found(id))
}

/// GET /api/accounts/stats
pub async fn get_account_stats(
    State(state): State<AppState>,
) -> ApiResult<Json<AccountStatsResponse>> {
    let (total, active, email, phone) = state.store.account_counts().await?;
    Ok(Json(AccountStatsResponse {
        total_accounts: total,
        active_accounts: active,
        inactive_accounts: total - active,
        email_accounts: email,
        phone_accounts: phone,
    }))
}

/// PUT /api/accounts/:id
pub async fn update_account(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    JsonBody(payload): JsonBody<AccountUpdate>,
) -> ApiResult<Json<Account>> {
    state
        .store
        .update_account(id, &payload.normalized()?)
        .await?
        .map(Json)
        .ok_or_else(|| account_not_found(id))
}

/// DELETE /api/accounts/:id
pub async fn delete_account(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> ApiResult<Json<MessageResponse>> {
    if !state.store.delete_account(id).await? {
        return Err(account_not_found(id));
    }
    Ok(Json(MessageResponse::new("Account deleted successfully")))
}

fn account_not_found(id: i64) -> LedgerError {
    LedgerError::not_found(format!("Account {id} not found"))
}
