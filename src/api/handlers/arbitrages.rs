use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{debug, info};

use crate::api::{
    error::ApiResult,
    extract::{EntityId, JsonBody, OptionalJson, QueryParams},
    state::AppState,
    types::*,
};
use crate::domain::{ArbitrageOpportunity, ArbitragePayload, ArbitrageUpdate};
use crate::error::LedgerError;
use crate::services::{
    self, ArbitrageBetPayload, ArbitrageStats, ConversionOutcome, ConversionRequest,
    ConversionSource, GroupedPage, ImportRequest, ImportSummary, MatchView,
};

/// GET /api/arbitrages
pub async fn list_arbitrages(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ArbitrageQuery>,
) -> ApiResult<Json<Vec<ArbitrageOpportunity>>> {
    let mut items = state.store.list_arbitrages(&query.filter()).await?;
    services::sort_opportunities(&mut items, query.sort_by, query.sort_order);
    Ok(Json(items))
}

/// POST /api/arbitrages
pub async fn create_arbitrage(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ArbitragePayload>,
) -> ApiResult<(StatusCode, Json<ArbitrageOpportunity>)> {
    let new = payload.into_new_arbitrage()?;
    let created = state.store.create_arbitrage(&new).await?;
    info!(id = created.id, signature = %created.match_signature, "Arbitrage created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /api/arbitrages/import
pub async fn import_arbitrages(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ImportRequest>,
) -> ApiResult<Json<ImportSummary>> {
    let (items, replace) = request.into_parts();
    let summary = services::import_opportunities(&state.store, items, replace).await?;
    Ok(Json(summary))
}

/// GET /api/arbitrages/grouped
pub async fn get_grouped_arbitrages(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ArbitrageQuery>,
) -> ApiResult<Json<GroupedPage>> {
    let items = state.store.list_arbitrages(&query.filter()).await?;
    let page = state.page_request(query.page, query.per_page);
    let grouped = services::group_opportunities(items, query.sort_by, query.sort_order, page);
    debug!(
        groups = grouped.groups.len(),
        total = grouped.pagination.total,
        "Grouped arbitrage opportunities"
    );
    Ok(Json(grouped))
}

/// GET /api/arbitrages/stats
pub async fn get_arbitrage_stats(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ArbitrageQuery>,
) -> ApiResult<Json<ArbitrageStats>> {
    let items = state.store.list_arbitrages(&query.filter()).await?;
    Ok(Json(services::compute_stats(&items)))
}

/// GET /api/arbitrages/match/:signature
pub async fn get_match_arbitrages(
    State(state): State<AppState>,
    Path(signature): Path<String>,
    QueryParams(query): QueryParams<SortQuery>,
) -> ApiResult<Json<MatchView>> {
    let items = state.store.arbitrages_by_signature(&signature).await?;
    services::match_view(&signature, items, query.sort_by, query.sort_order)
        .map(Json)
        .ok_or_else(|| LedgerError::not_found("No arbitrages found for this match signature"))
}

/// GET /api/arbitrages/:id
pub async fn get_arbitrage(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> ApiResult<Json<ArbitrageOpportunity>> {
    state
        .store
        .get_arbitrage(id)
        .await?
        .map(Json)
        .ok_or_else(|| arbitrage_not_found(id))
}

/// PUT /api/arbitrages/:id
pub async fn update_arbitrage(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    JsonBody(update): JsonBody<ArbitrageUpdate>,
) -> ApiResult<Json<ArbitrageOpportunity>> {
    let changes = update.validate()?;
    state
        .store
        .update_arbitrage(id, &changes)
        .await?
        .map(Json)
        .ok_or_else(|| arbitrage_not_found(id))
}

/// DELETE /api/arbitrages/:id
pub async fn delete_arbitrage(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> ApiResult<Json<MessageResponse>> {
    if !state.store.delete_arbitrage(id).await? {
        return Err(arbitrage_not_found(id));
    }
    Ok(Json(MessageResponse::new(
        "Arbitrage opportunity deleted successfully",
    )))
}

/// POST /api/arbitrages/:id/add-to-bets
pub async fn add_arbitrage_to_bets(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    OptionalJson(request): OptionalJson<ConversionRequest>,
) -> ApiResult<(StatusCode, Json<ConversionOutcome>)> {
    let opportunity = state
        .store
        .get_arbitrage(id)
        .await?
        .ok_or_else(|| arbitrage_not_found(id))?;
    let source = ConversionSource::from_opportunity(&opportunity)?;
    convert(&state, &source, &request).await
}

/// POST /api/arbitrages/add-to-bets
pub async fn add_payload_to_bets(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ArbitrageBetPayload>,
) -> ApiResult<(StatusCode, Json<ConversionOutcome>)> {
    let source = ConversionSource::from_payload(&payload)?;
    convert(&state, &source, &payload.request).await
}

async fn convert(
    state: &AppState,
    source: &ConversionSource,
    request: &ConversionRequest,
) -> ApiResult<(StatusCode, Json<ConversionOutcome>)> {
    let plan = services::plan_conversion(source, request, &state.conversion_defaults())?;
    let outcome = services::convert_to_bets(&state.store, plan).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

fn arbitrage_not_found(id: i64) -> LedgerError {
    LedgerError::not_found(format!("Arbitrage {id} not found"))
}
