//! Handler for `/access/:token` — the per-view verification endpoint.
//!
//! This runs on every content view, so it is a single store call: one
//! indexed lookup plus the in-transaction view metering. Denials come back
//! as typed outcomes and map to 403/404 with a stable `code`; no internal
//! identifiers appear in denial bodies.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::HeaderMap,
};
use tollgate_core::{
  access::{AccessOutcome, ContentGrant},
  store::{LedgerStore, SessionStore},
};

use crate::error::ApiError;

/// `GET /access/:token` — optional `x-session-token` header.
///
/// The header is compared against the purchasing session when present;
/// call sites without a session (email-delivered links) simply omit it.
pub async fn verify<S>(
  State(store): State<Arc<S>>,
  Path(token): Path<String>,
  headers: HeaderMap,
) -> Result<Json<ContentGrant>, ApiError>
where
  S: SessionStore + LedgerStore,
{
  let session_token = headers
    .get("x-session-token")
    .and_then(|v| v.to_str().ok());

  let outcome = store
    .verify_access(&token, session_token)
    .await
    .map_err(|e| ApiError::from_ledger(e.into()))?;

  match outcome {
    AccessOutcome::Granted(grant) => Ok(Json(grant)),
    AccessOutcome::Denied(denied) => Err(ApiError::Access(denied)),
  }
}
