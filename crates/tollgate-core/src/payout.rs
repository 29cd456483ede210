//! Payout records and the payout eligibility gate.
//!
//! The gate is a pure function over the creator profile, evaluated fresh on
//! every payout request. It checks all three requirements rather than
//! short-circuiting, so a creator sees the complete remediation list in one
//! response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::creator::{CreatorProfile, VerificationStatus};

// ─── Payout record ───────────────────────────────────────────────────────────

/// A completed payout, appended by the payout-execution collaborator's
/// success callback. Lowers the available balance through the derived
/// formula; nothing is decremented in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payout {
  pub payout_id:    Uuid,
  pub creator_id:   Uuid,
  pub amount_cents: i64,
  pub completed_at: DateTime<Utc>,
}

// ─── Eligibility gate ────────────────────────────────────────────────────────

/// A requirement the creator has not yet satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingRequirement {
  EmailUnverified,
  IdentityUnverified,
  PayoutMethodUnconfigured,
}

impl MissingRequirement {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::EmailUnverified          => "email_unverified",
      Self::IdentityUnverified       => "identity_unverified",
      Self::PayoutMethodUnconfigured => "payout_method_unconfigured",
    }
  }
}

/// The gate's verdict. An absent profile is a structural error handled
/// before the gate runs, never a missing requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayoutEligibility {
  Eligible,
  Ineligible { missing: Vec<MissingRequirement> },
}

/// Evaluate payout eligibility for a creator profile.
///
/// All three facts are independent and all are checked: verified email,
/// `Verified` identity status, and a configured payout method.
pub fn check_eligibility(profile: &CreatorProfile) -> PayoutEligibility {
  let mut missing = Vec::new();

  if !profile.email_verified {
    missing.push(MissingRequirement::EmailUnverified);
  }
  if profile.verification_status != VerificationStatus::Verified {
    missing.push(MissingRequirement::IdentityUnverified);
  }
  if !profile.payout_setup_completed {
    missing.push(MissingRequirement::PayoutMethodUnconfigured);
  }

  if missing.is_empty() {
    PayoutEligibility::Eligible
  } else {
    PayoutEligibility::Ineligible { missing }
  }
}
