//! Extractors that turn axum rejections into JSON 400s.

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::LedgerError;

/// Required JSON body
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = LedgerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(LedgerError::validation(rejection.body_text())),
        }
    }
}

/// JSON body that may be absent; an empty body yields `T::default()`.
/// The content type is not checked.
pub struct OptionalJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = LedgerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| LedgerError::validation(rejection.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalJson(T::default()));
        }
        serde_json::from_slice(&bytes)
            .map(OptionalJson)
            .map_err(|e| LedgerError::validation(format!("Invalid JSON body: {e}")))
    }
}

/// Query string
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = LedgerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| QueryParams(value))
            .map_err(|rejection| LedgerError::validation(rejection.body_text()))
    }
}

/// Integer primary key from the path
pub struct EntityId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for EntityId
where
    S: Send + Sync,
{
    type Rejection = LedgerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| LedgerError::validation(rejection.body_text()))?;
        raw.parse::<i64>()
            .map(EntityId)
            .map_err(|_| LedgerError::validation(format!("Invalid id: {raw}")))
    }
}
