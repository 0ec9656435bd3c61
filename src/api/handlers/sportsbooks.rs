use axum::{extract::State, http::StatusCode, Json};

use crate::adapters::LedgerStore;
use crate::api::{
    error::ApiResult,
    extract::{EntityId, JsonBody, QueryParams},
    state::AppState,
    types::*,
};
use crate::domain::{BulkSportsbooks, NewSportsbook, Sportsbook, SportsbookUpdate};
use crate::error::LedgerError;

/// GET /api/sportsbooks?active=true
pub async fn list_sportsbooks(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<SportsbookListQuery>,
) -> ApiResult<Json<Vec<Sportsbook>>> {
    let books = state
        .store
        .list_sportsbooks(query.active.unwrap_or(false))
        .await?;
    Ok(Json(books))
}

/// POST /api/sportsbooks
pub async fn create_sportsbook(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<NewSportsbook>,
) -> ApiResult<(StatusCode, Json<Sportsbook>)> {
    let created = state.store.create_sportsbook(&payload.normalized()?).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/sportsbooks/active
pub async fn list_active_sportsbooks(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Sportsbook>>> {
    Ok(Json(state.store.list_sportsbooks(true).await?))
}

/// POST /api/sportsbooks/bulk-create
pub async fn bulk_create_sportsbooks(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<BulkSportsbooks>,
) -> ApiResult<(StatusCode, Json<BulkSportsbookResponse>)> {
    let items = payload
        .sportsbooks
        .filter(|items| !items.is_empty())
        .ok_or_else(|| LedgerError::validation("No sportsbooks data provided"))?;
    let (created, skipped) = state.store.create_sportsbooks(items).await?;
    Ok((
        StatusCode::CREATED,
        Json(BulkSportsbookResponse {
            message: format!("Successfully created {} sportsbooks", created.len()),
            created_count: created.len(),
            skipped_count: skipped.len(),
            skipped_names: skipped,
            created_sportsbooks: created,
        }),
    ))
}

/// GET /api/sportsbooks/stats
pub async fn get_sportsbook_stats(
    State(state): State<AppState>,
) -> ApiResult<Json<SportsbookStatsResponse>> {
    let (total, active) = state.store.sportsbook_counts().await?;
    let top_used = state.store.sportsbook_usage(10).await?;
    Ok(Json(SportsbookStatsResponse {
        total_sportsbooks: total,
        active_sportsbooks: active,
        inactive_sportsbooks: total - active,
        top_used_sportsbooks: top_used,
    }))
}

/// GET /api/sportsbooks/:id
pub async fn get_sportsbook(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> ApiResult<Json<Sportsbook>> {
    LedgerStore::find_sportsbook(state.store.pool(), id)
        .await?
        .map(Json)
        .ok_or_else(|| sportsbook_not_found(id))
}

/// PUT /api/sportsbooks/:id
pub async fn update_sportsbook(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    JsonBody(payload): JsonBody<SportsbookUpdate>,
) -> ApiResult<Json<Sportsbook>> {
    state
        .store
        .update_sportsbook(id, &payload.normalized()?)
        .await?
        .map(Json)
        .ok_or_else(|| sportsbook_not_found(id))
}

/// PATCH /api/sportsbooks/:id/toggle-active
pub async fn toggle_sportsbook_active(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> ApiResult<Json<SportsbookToggleResponse>> {
    let sportsbook = state
        .store
        .toggle_sportsbook(id)
        .await?
        .ok_or_else(|| sportsbook_not_found(id))?;
    let verb = if sportsbook.is_active {
        "activated"
    } else {
        "deactivated"
    };
    Ok(Json(SportsbookToggleResponse {
        message: format!("Sportsbook {verb} successfully"),
        sportsbook,
    }))
}

/// DELETE /api/sportsbooks/:id
pub async fn delete_sportsbook(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> ApiResult<Json<MessageResponse>> {
    if !state.store.delete_sportsbook(id).await? {
        return Err(sportsbook_not_found(id));
    }
    Ok(Json(MessageResponse::new("Sportsbook deleted successfully")))
}

fn sportsbook_not_found(id: i64) -> LedgerError {
    LedgerError::not_found(format!("Sportsbook {id} not found"))
}
