use axum::{extract::State, http::StatusCode, Json};

use crate::adapters::TransactionQuery;
use crate::api::{
    error::ApiResult,
    extract::{EntityId, JsonBody, QueryParams},
    state::AppState,
    types::*,
};
use crate::domain::{LedgerTransaction, TransactionPayload, TransactionType, TransactionUpdate};
use crate::error::LedgerError;
use crate::services::{self, Pagination, TransactionFilter, TransactionStats};

/// GET /api/transactions?type=&status=&page=&per_page=
pub async fn list_transactions(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<TransactionListQuery>,
) -> ApiResult<Json<TransactionPage>> {
    let transaction_type = query
        .transaction_type
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(TransactionType::try_from)
        .transpose()?;
    let page = state.page_request(query.page, query.per_page);

    let (transactions, total) = state
        .store
        .list_transactions(&TransactionQuery {
            transaction_type: transaction_type.map(|t| t.as_str().to_string()),
            status: query.status.filter(|s| !s.is_empty()),
            limit: page.per_page as i64,
            offset: page.offset() as i64,
        })
        .await?;

    Ok(Json(TransactionPage {
        transactions,
        pagination: Pagination::new(page, total.max(0) as usize),
    }))
}

/// POST /api/transactions
pub async fn create_transaction(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<TransactionPayload>,
) -> ApiResult<(StatusCode, Json<LedgerTransaction>)> {
    let created = services::create_transaction(&state.store, payload.validate()?).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/transactions/:id
pub async fn update_transaction(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    JsonBody(payload): JsonBody<TransactionUpdate>,
) -> ApiResult<Json<LedgerTransaction>> {
    let updated = services::update_transaction(&state.store, id, payload.validate()?).await?;
    Ok(Json(updated))
}

/// GET /api/transactions/stats?start_date=&end_date=&sportsbook=
pub async fn get_transaction_stats(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<TransactionStatsQuery>,
) -> ApiResult<Json<TransactionStats>> {
    let filter = TransactionFilter::parse(
        query.start_date.as_deref(),
        query.end_date.as_deref(),
        query.sportsbook.as_deref(),
    )?;
    let transactions = state.store.completed_transactions().await?;
    Ok(Json(services::compute_transaction_stats(&transactions, &filter)))
}

/// DELETE /api/transactions/:id
pub async fn delete_transaction(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> ApiResult<Json<MessageResponse>> {
    if !state.store.delete_transaction(id).await? {
        return Err(LedgerError::not_found(format!("Transaction {id} not found")));
    }
    Ok(Json(MessageResponse::new("Transaction deleted successfully")))
}
