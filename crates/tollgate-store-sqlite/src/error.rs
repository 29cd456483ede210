//! Error type for `tollgate-store-sqlite`.

use thiserror::Error;
use uuid::Uuid;

use tollgate_core::purchase::PurchaseStatus;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("cannot decode stored value: {0}")]
  Decode(String),

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
}

/// Collapse onto the shared domain taxonomy for API status mapping.
impl From<Error> for tollgate_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::CreatorNotFound(id) => Self::CreatorNotFound(id),
      Error::ContentNotFound(id) => Self::ContentNotFound(id),
      Error::PurchaseNotFound(id) => Self::PurchaseNotFound(id),
      Error::SessionNotFound(id) => Self::SessionNotFound(id),
      Error::InvalidTransition { purchase, from, to } => {
        Self::InvalidTransition { purchase, from, to }
      }
      other => Self::Storage(other.to_string()),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
