//! Purchase and content types — the fundamental units of the ledger.
//!
//! A purchase is the authoritative record of a single transaction. Its row is
//! never deleted; the status field and the metering/earnings fields are the
//! only parts that ever change, and every change is one of the transitions
//! below.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Status ──────────────────────────────────────────────────────────────────

/// The purchase state machine.
///
/// `Pending → Completed` and `Pending → Failed` are driven by the payment
/// collaborator's confirmation events. `Completed → Refunded` is a marking
/// transition only; refund money movement happens outside this core. There
/// is no internal timeout — a purchase whose confirmation never arrives
/// stays `Pending` until an external sweeper fails it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
  Pending,
  Completed,
  Failed,
  Refunded,
}

// ─── Content ─────────────────────────────────────────────────────────────────

/// A piece of paid content registered by a creator.
///
/// `media_key` is an opaque pointer into object storage; byte delivery is an
/// external collaborator's job. `base_price_cents`, when present, is the
/// creator's-cut basis used by the fee policy instead of the gross amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
  pub content_id:       Uuid,
  pub creator_id:       Uuid,
  pub title:            String,
  pub media_key:        String,
  pub price_cents:      i64,
  pub base_price_cents: Option<i64>,
  pub currency:         String,
  /// When set, completion stamps `access_expires_at` this many days out.
  pub access_ttl_days:  Option<i64>,
  /// Aggregate views across all purchases of this content.
  pub view_count:       i64,
  pub created_at:       DateTime<Utc>,
}

/// Input to [`crate::store::LedgerStore::add_content`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewContent {
  pub creator_id:       Uuid,
  pub title:            String,
  pub media_key:        String,
  pub price_cents:      i64,
  pub base_price_cents: Option<i64>,
  pub currency:         String,
  pub access_ttl_days:  Option<i64>,
}

// ─── Purchase ────────────────────────────────────────────────────────────────

/// The authoritative record of one transaction.
///
/// Invariants maintained by the store:
/// - `access_token` is unique and exists exactly when `status` has reached
///   `Completed` (a refund keeps the token but access is denied on status).
/// - `earnings_released` goes `false → true` at most once, only while
///   `Completed` and only after `earnings_pending_until`.
/// - `creator_share_cents` is computed once, at completion, by the fee
///   policy; balance queries sum the stored value and never recompute it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
  pub purchase_id:            Uuid,
  pub content_id:             Uuid,
  /// Copied from the content at initiation so ledger queries stay
  /// single-table. Contents are immutable after registration.
  pub creator_id:             Uuid,
  pub session_id:             Uuid,
  pub amount_cents:           i64,
  pub currency:               String,
  pub status:                 PurchaseStatus,
  pub payment_intent_id:      Option<String>,
  pub access_token:           Option<String>,
  pub access_expires_at:      Option<DateTime<Utc>>,
  pub base_price_cents:       Option<i64>,
  pub creator_share_cents:    Option<i64>,
  pub view_count:             i64,
  pub last_viewed_at:         Option<DateTime<Utc>>,
  pub earnings_pending_until: Option<DateTime<Utc>>,
  pub earnings_released:      bool,
  pub failure_reason:         Option<String>,
  pub created_at:             DateTime<Utc>,
  pub completed_at:           Option<DateTime<Utc>>,
}

/// Input to [`crate::store::LedgerStore::initiate_purchase`].
/// `creator_id` is resolved from the content by the store; the caller never
/// supplies it.
#[derive(Debug, Clone)]
pub struct NewPurchase {
  pub content_id:   Uuid,
  pub session_id:   Uuid,
  pub amount_cents: i64,
  pub currency:     String,
}
