use axum::{extract::State, http::StatusCode, http::Uri, Json};
use serde_json::{json, Value};

use crate::api::{state::AppState, types::*};

/// GET /api/health -- liveness plus a database ping
pub async fn health_handler(
    State(state): State<AppState>,
) -> std::result::Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let db_status = match state.store.ping().await {
        Ok(()) => "connected".to_string(),
        Err(_) => "disconnected".to_string(),
    };

    let ok = db_status == "connected";
    let resp = HealthResponse {
        status: if ok {
            "ok".to_string()
        } else {
            "degraded".to_string()
        },
        db: db_status,
        uptime_secs: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    if ok {
        Ok(Json(resp))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(resp)))
    }
}

/// Unknown routes answer with JSON rather than an empty 404
pub async fn not_found_handler(uri: Uri) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("No route for {}", uri.path()) })),
    )
}
