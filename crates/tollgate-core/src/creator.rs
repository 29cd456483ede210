//! Creator profiles and the verification facts consumed by the payout gate.
//!
//! Verification state is owned by the identity-verification collaborator;
//! this core stores the latest reported facts and only ever reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity-verification progress as reported by the external provider.
/// Status can regress (e.g. `Rejected` after a re-review), which is why
/// payout eligibility is re-evaluated on every request and never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
  Pending,
  InProgress,
  Verified,
  Rejected,
  Expired,
}

/// A creator account as this core sees it: payout-eligibility facts plus the
/// settlement currency. Everything else about a creator lives elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatorProfile {
  pub creator_id:             Uuid,
  pub email_verified:         bool,
  pub verification_status:    VerificationStatus,
  pub payout_setup_completed: bool,
  pub currency:               String,
  pub created_at:             DateTime<Utc>,
}

/// Partial update applied by the identity/payout collaborators' callbacks.
/// Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerificationUpdate {
  pub email_verified:         Option<bool>,
  pub verification_status:    Option<VerificationStatus>,
  pub payout_setup_completed: Option<bool>,
}
