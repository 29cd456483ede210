//! Handler for the manual release trigger.

use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::Utc;
use tollgate_core::{
  release::{ReleaseSummary, run_release},
  store::{LedgerStore, SessionStore},
};

use crate::error::ApiError;

/// `POST /release` — run the release routine synchronously and report
/// `{released, total}`. The same logic the scheduler runs on its interval.
pub async fn trigger<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<ReleaseSummary>, ApiError>
where
  S: SessionStore + LedgerStore,
{
  let summary = run_release(store.as_ref(), Utc::now())
    .await
    .map_err(|e| ApiError::from_ledger(e.into()))?;
  Ok(Json(summary))
}
