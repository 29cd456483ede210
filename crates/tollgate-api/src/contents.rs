//! Handlers for `/contents` endpoints.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use tollgate_core::{
  purchase::{Content, NewContent},
  store::{LedgerStore, SessionStore},
};
use uuid::Uuid;

use crate::error::ApiError;

/// `POST /contents` — returns 201 + the registered content. The creator must
/// already exist.
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewContent>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SessionStore + LedgerStore,
{
  let content = store
    .add_content(body)
    .await
    .map_err(|e| ApiError::from_ledger(e.into()))?;
  Ok((StatusCode::CREATED, Json(content)))
}

/// `GET /contents/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Content>, ApiError>
where
  S: SessionStore + LedgerStore,
{
  let content = store
    .get_content(id)
    .await
    .map_err(|e| ApiError::from_ledger(e.into()))?
    .ok_or_else(|| ApiError::NotFound(format!("content {id} not found")))?;
  Ok(Json(content))
}
