//! Buyer sessions — anonymous buyer identity across requests.
//!
//! A session is identified by a cryptographically random token, the sole
//! authority for access-session binding. The fingerprint digest is a weak,
//! best-effort lookup hint for merging sessions across token loss; it never
//! participates in access verification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use uuid::Uuid;

/// An anonymous buyer session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyerSession {
  pub session_id:         Uuid,
  /// Opaque random token; the only credential a buyer holds.
  pub session_token:      String,
  /// SHA-256 hex of the client-supplied fingerprint. Raw fingerprints are
  /// never stored.
  pub fingerprint_digest: Option<String>,
  pub ip:                 String,
  pub user_agent:         Option<String>,
  pub created_at:         DateTime<Utc>,
  pub last_active_at:     DateTime<Utc>,
  pub expires_at:         DateTime<Utc>,
}

impl BuyerSession {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool { self.expires_at <= now }
}

/// Input to [`crate::store::SessionStore::resolve_session`].
///
/// Resolution order: a valid token match wins; otherwise a valid fingerprint
/// match (most recently active); otherwise a new session is created. Expired
/// matches are treated as absent, never as errors.
#[derive(Debug, Clone)]
pub struct ResolveSession {
  pub session_token: Option<String>,
  /// Raw client-derived fingerprint; digested before any lookup or storage.
  pub fingerprint:   Option<String>,
  pub ip:            String,
  pub user_agent:    Option<String>,
}

/// Digest a raw client fingerprint for storage and lookup.
pub fn fingerprint_digest(raw: &str) -> String {
  hex::encode(Sha256::digest(raw.as_bytes()))
}
