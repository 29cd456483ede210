//! Handlers for `/purchases` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/purchases` | Body: [`InitiateBody`]; resolves the buyer session, prices from the content row |
//! | `GET`  | `/purchases/:id` | 404 if not found |
//! | `POST` | `/purchases/:id/complete` | Payment collaborator callback; idempotent |
//! | `POST` | `/purchases/:id/fail` | Payment collaborator callback |
//! | `POST` | `/purchases/:id/refund` | Marks only; no money movement here |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::{HeaderMap, StatusCode, header},
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tollgate_core::{
  purchase::{NewPurchase, Purchase},
  session::ResolveSession,
  store::{LedgerStore, SessionStore},
};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Initiate ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct InitiateBody {
  pub content_id:    Uuid,
  /// Returning buyers send their token; first-timers send neither.
  pub session_token: Option<String>,
  /// Raw client fingerprint; used only as a session-merge hint.
  pub fingerprint:   Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InitiateResponse {
  pub purchase:      Purchase,
  /// Echoed so the client can persist it (it may be freshly created).
  pub session_token: String,
}

/// `POST /purchases` — returns 201 + the `Pending` purchase.
pub async fn initiate<S>(
  State(store): State<Arc<S>>,
  headers: HeaderMap,
  Json(body): Json<InitiateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SessionStore + LedgerStore,
{
  let content = store
    .get_content(body.content_id)
    .await
    .map_err(|e| ApiError::from_ledger(e.into()))?
    .ok_or_else(|| {
      ApiError::NotFound(format!("content {} not found", body.content_id))
    })?;

  let session = store
    .resolve_session(ResolveSession {
      session_token: body.session_token,
      fingerprint:   body.fingerprint,
      ip:            client_ip(&headers),
      user_agent:    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned),
    })
    .await
    .map_err(|e| ApiError::from_ledger(e.into()))?;

  // Priced from the content row, never from the client.
  let purchase = store
    .initiate_purchase(NewPurchase {
      content_id:   content.content_id,
      session_id:   session.session_id,
      amount_cents: content.price_cents,
      currency:     content.currency.clone(),
    })
    .await
    .map_err(|e| ApiError::from_ledger(e.into()))?;

  Ok((
    StatusCode::CREATED,
    Json(InitiateResponse { purchase, session_token: session.session_token }),
  ))
}

fn client_ip(headers: &HeaderMap) -> String {
  headers
    .get("x-forwarded-for")
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.split(',').next())
    .map(|v| v.trim().to_owned())
    .unwrap_or_else(|| "unknown".to_owned())
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /purchases/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Purchase>, ApiError>
where
  S: SessionStore + LedgerStore,
{
  let purchase = store
    .get_purchase(id)
    .await
    .map_err(|e| ApiError::from_ledger(e.into()))?
    .ok_or_else(|| ApiError::NotFound(format!("purchase {id} not found")))?;
  Ok(Json(purchase))
}

// ─── Complete ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CompleteBody {
  pub payment_intent_id: String,
}

/// `POST /purchases/:id/complete` — the payment collaborator's
/// charge-succeeded callback. Safe to retry.
pub async fn complete<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<CompleteBody>,
) -> Result<Json<Purchase>, ApiError>
where
  S: SessionStore + LedgerStore,
{
  let purchase = store
    .complete_purchase(id, body.payment_intent_id)
    .await
    .map_err(|e| ApiError::from_ledger(e.into()))?;
  Ok(Json(purchase))
}

// ─── Fail ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FailBody {
  pub reason: Option<String>,
}

/// `POST /purchases/:id/fail` — the payment collaborator's charge-failed
/// callback.
pub async fn fail<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<FailBody>,
) -> Result<Json<Purchase>, ApiError>
where
  S: SessionStore + LedgerStore,
{
  let purchase = store
    .fail_purchase(id, body.reason)
    .await
    .map_err(|e| ApiError::from_ledger(e.into()))?;
  Ok(Json(purchase))
}

// ─── Refund ───────────────────────────────────────────────────────────────────

/// `POST /purchases/:id/refund` — marks the purchase refunded so the release
/// scheduler and the access verifier stop honouring it.
pub async fn refund<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Purchase>, ApiError>
where
  S: SessionStore + LedgerStore,
{
  let purchase = store
    .refund_purchase(id)
    .await
    .map_err(|e| ApiError::from_ledger(e.into()))?;
  Ok(Json(purchase))
}
