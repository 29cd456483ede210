//! Error types for `tollgate-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::purchase::PurchaseStatus;

/// The domain error taxonomy shared by every storage backend.
///
/// Structural absences (`*NotFound`) and illegal state-machine moves
/// (`InvalidTransition`) are distinct from backend faults (`Storage`) so the
/// API layer can map them to different response classes. Business denials
/// (access denial, payout ineligibility) are *not* errors; they are typed
/// outcomes in [`crate::access`] and [`crate::payout`].
#[derive(Debug, Error)]
pub enum Error {
  #[error("creator not found: {0}")]
  CreatorNotFound(Uuid),

  #[error("content not found: {0}")]
  ContentNotFound(Uuid),

  #[error("purchase not found: {0}")]
  PurchaseNotFound(Uuid),

  #[error("buyer session not found: {0}")]
  SessionNotFound(Uuid),

  #[error("purchase {purchase} cannot move from {from:?} to {to:?}")]
  InvalidTransition {
    purchase: Uuid,
    from:     PurchaseStatus,
    to:       PurchaseStatus,
  },

  #[error("storage error: {0}")]
  Storage(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
