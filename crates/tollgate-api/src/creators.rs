//! Handlers for `/creators` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/creators` | Body: `{"currency":"USD"}` (optional) |
//! | `POST` | `/creators/:id/verification` | Identity-collaborator callback |
//! | `GET`  | `/creators/:id/balance` | Derived balances + currency |
//! | `POST` | `/creators/:id/payout-request` | 200 allow / 403 with the full requirement list |
//! | `POST` | `/creators/:id/payouts` | Payout-execution success callback |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tollgate_core::{
  balance::CreatorBalance,
  creator::{CreatorProfile, VerificationUpdate},
  payout::{self, Payout, PayoutEligibility},
  store::{LedgerStore, SessionStore},
};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub currency: Option<String>,
}

/// `POST /creators` — returns 201 + the unverified profile.
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SessionStore + LedgerStore,
{
  let currency = body.currency.unwrap_or_else(|| "USD".to_owned());
  let profile = store
    .add_creator(currency)
    .await
    .map_err(|e| ApiError::from_ledger(e.into()))?;
  Ok((StatusCode::CREATED, Json(profile)))
}

// ─── Verification ─────────────────────────────────────────────────────────────

/// `POST /creators/:id/verification` — the identity/payout collaborators
/// report fresh facts; absent fields are left untouched.
pub async fn update_verification<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(update): Json<VerificationUpdate>,
) -> Result<Json<CreatorProfile>, ApiError>
where
  S: SessionStore + LedgerStore,
{
  let profile = store
    .update_verification(id, update)
    .await
    .map_err(|e| ApiError::from_ledger(e.into()))?;
  Ok(Json(profile))
}

// ─── Balance ──────────────────────────────────────────────────────────────────

/// `GET /creators/:id/balance`
pub async fn balance<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<CreatorBalance>, ApiError>
where
  S: SessionStore + LedgerStore,
{
  let balance = store
    .creator_balance(id)
    .await
    .map_err(|e| ApiError::from_ledger(e.into()))?;
  Ok(Json(balance))
}

// ─── Payout request ───────────────────────────────────────────────────────────

/// `POST /creators/:id/payout-request`
///
/// Eligibility is evaluated fresh on every request — verification status
/// can regress, so nothing is cached. An unknown creator is a 404, not a
/// missing requirement.
pub async fn payout_request<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: SessionStore + LedgerStore,
{
  let profile = store
    .get_creator(id)
    .await
    .map_err(|e| ApiError::from_ledger(e.into()))?
    .ok_or_else(|| ApiError::NotFound(format!("creator {id} not found")))?;

  match payout::check_eligibility(&profile) {
    PayoutEligibility::Eligible => Ok(Json(json!({ "eligible": true }))),
    PayoutEligibility::Ineligible { missing } => {
      Err(ApiError::PayoutIneligible(missing))
    }
  }
}

// ─── Record payout ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RecordPayoutBody {
  pub amount_cents: i64,
}

/// `POST /creators/:id/payouts` — the payout-execution collaborator confirms
/// a payout landed; the amount joins `total_payouts`.
pub async fn record_payout<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<RecordPayoutBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SessionStore + LedgerStore,
{
  if body.amount_cents <= 0 {
    return Err(ApiError::BadRequest(
      "payout amount must be positive".to_owned(),
    ));
  }

  let payout: Payout = store
    .record_payout(id, body.amount_cents)
    .await
    .map_err(|e| ApiError::from_ledger(e.into()))?;
  Ok((StatusCode::CREATED, Json(payout)))
}
