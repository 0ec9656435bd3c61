use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use crate::api::{
    error::ApiResult,
    extract::{EntityId, JsonBody, QueryParams},
    state::AppState,
    types::*,
};
use crate::domain::{Bet, BetPayload, BetStatus, BetUpdate};
use crate::error::LedgerError;
use crate::services::{self, BetStats};

/// GET /api/bets?status=&sport=
pub async fn list_bets(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<BetListQuery>,
) -> ApiResult<Json<Vec<Bet>>> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(BetStatus::try_from)
        .transpose()?;
    let sport = query.sport.as_deref().filter(|s| !s.is_empty());
    let bets = state
        .store
        .list_bets(status.as_ref().map(BetStatus::as_str), sport)
        .await?;
    Ok(Json(bets))
}

/// POST /api/bets
pub async fn create_bet(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<BetPayload>,
) -> ApiResult<(StatusCode, Json<Bet>)> {
    let draft = payload.validate(&state.config.ledger.default_sport)?;
    let bet = services::create_bet(&state.store, draft).await?;
    Ok((StatusCode::CREATED, Json(bet)))
}

/// GET /api/bets/stats
pub async fn get_bet_stats(State(state): State<AppState>) -> ApiResult<Json<BetStats>> {
    let bets = state.store.list_bets(None, None).await?;
    Ok(Json(services::compute_bet_stats(&bets)))
}

/// GET /api/bets/:id
pub async fn get_bet(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> ApiResult<Json<Bet>> {
    state
        .store
        .get_bet(id)
        .await?
        .map(Json)
        .ok_or_else(|| bet_not_found(id))
}

/// PUT /api/bets/:id
pub async fn update_bet(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    JsonBody(update): JsonBody<BetUpdate>,
) -> ApiResult<Json<Bet>> {
    let changes = update.validate()?;
    let bet = services::update_bet(&state.store, id, changes).await?;
    Ok(Json(bet))
}

/// DELETE /api/bets/:id
pub async fn delete_bet(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> ApiResult<Json<MessageResponse>> {
    if !state.store.delete_bet(id).await? {
        return Err(bet_not_found(id));
    }
    info!(id, "Bet deleted");
    Ok(Json(MessageResponse::new("Bet deleted successfully")))
}

fn bet_not_found(id: i64) -> LedgerError {
    LedgerError::not_found(format!("Bet {id} not found"))
}
