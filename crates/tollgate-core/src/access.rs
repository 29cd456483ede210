//! Content access verification outcomes.
//!
//! A denial is an expected business outcome, not an error: the verifier
//! returns [`AccessOutcome`] and reserves its error channel for storage
//! faults. Denial bodies carry only a stable reason code; internal ids
//! never leak to the caller.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A successful verification: the content payload reference, never bytes.
#[derive(Debug, Clone, Serialize)]
pub struct ContentGrant {
  pub purchase_id:       Uuid,
  pub content_id:        Uuid,
  pub creator_id:        Uuid,
  pub title:             String,
  /// Object-storage pointer for the delivery collaborator.
  pub media_key:         String,
  /// This purchase's view count, including the view just metered.
  pub view_count:        i64,
  pub access_expires_at: Option<DateTime<Utc>>,
}

/// Why access was denied, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenied {
  /// No purchase carries this access token.
  NotFound,
  /// The purchase exists but is not currently `Completed` (e.g. refunded).
  NotCompleted,
  /// A session token was presented and is not the purchasing session's.
  SessionMismatch,
  /// `access_expires_at` has passed.
  Expired,
}

impl AccessDenied {
  /// Machine-readable reason code for the wire.
  pub fn code(&self) -> &'static str {
    match self {
      Self::NotFound        => "NOT_FOUND",
      Self::NotCompleted    => "NOT_COMPLETED",
      Self::SessionMismatch => "SESSION_MISMATCH",
      Self::Expired         => "EXPIRED",
    }
  }

  pub fn message(&self) -> &'static str {
    match self {
      Self::NotFound        => "access token not found",
      Self::NotCompleted    => "purchase not completed",
      Self::SessionMismatch => "session mismatch",
      Self::Expired         => "access expired",
    }
  }
}

/// The verifier's result for one view attempt.
#[derive(Debug, Clone)]
pub enum AccessOutcome {
  Granted(ContentGrant),
  Denied(AccessDenied),
}
