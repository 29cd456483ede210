//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Business denials (access denial, payout ineligibility) are carried as
//! typed variants with machine-readable codes and map to 403/404; only
//! storage faults become 500s, and their details never reach the caller.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tollgate_core::{access::AccessDenied, payout::MissingRequirement};

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("access denied: {}", .0.message())]
  Access(AccessDenied),

  #[error("payout requirements not met")]
  PayoutIneligible(Vec<MissingRequirement>),

  #[error("internal error: {0}")]
  Internal(String),
}

impl ApiError {
  /// Map a store error onto the API taxonomy: structural absences are 404s,
  /// illegal state-machine moves are 409s, backend faults are 500s.
  pub fn from_ledger(e: tollgate_core::Error) -> Self {
    use tollgate_core::Error as E;
    match e {
      E::CreatorNotFound(_)
      | E::ContentNotFound(_)
      | E::PurchaseNotFound(_)
      | E::SessionNotFound(_) => Self::NotFound(e.to_string()),
      E::InvalidTransition { .. } => Self::Conflict(e.to_string()),
      E::Storage(msg) => Self::Internal(msg),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      Self::NotFound(m) => {
        (StatusCode::NOT_FOUND, Json(json!({ "error": m }))).into_response()
      }
      Self::BadRequest(m) => {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": m }))).into_response()
      }
      Self::Conflict(m) => {
        (StatusCode::CONFLICT, Json(json!({ "error": m }))).into_response()
      }
      Self::Access(denied) => {
        let status = match denied {
          AccessDenied::NotFound => StatusCode::NOT_FOUND,
          _ => StatusCode::FORBIDDEN,
        };
        let body =
          json!({ "error": denied.message(), "code": denied.code() });
        (status, Json(body)).into_response()
      }
      Self::PayoutIneligible(missing) => {
        let reasons: Vec<&str> =
          missing.iter().map(MissingRequirement::as_str).collect();
        let body = json!({
          "error": "payout requirements not met",
          "missing_requirements": reasons,
        });
        (StatusCode::FORBIDDEN, Json(body)).into_response()
      }
      Self::Internal(m) => {
        tracing::error!(error = %m, "request failed on a storage fault");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "error": "internal error" })),
        )
          .into_response()
      }
    }
  }
}
