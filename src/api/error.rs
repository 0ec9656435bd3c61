use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::error::LedgerError;

/// Handler result; every error renders as `{"error": message}`
pub type ApiResult<T> = std::result::Result<T, LedgerError>;

impl LedgerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::Validation(_)
            | LedgerError::Conflict(_)
            | LedgerError::InvalidStateTransition { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_client_error() {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        } else {
            error!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
