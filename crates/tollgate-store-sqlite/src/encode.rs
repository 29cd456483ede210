//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings (which compare
//! lexicographically, so SQL `<=` on them is a time comparison). UUIDs are
//! stored as hyphenated lowercase strings; enums as their lowercase
//! discriminants; booleans as 0/1 integers.

use chrono::{DateTime, Utc};
use tollgate_core::{
  creator::{CreatorProfile, VerificationStatus},
  purchase::{Content, Purchase, PurchaseStatus},
  session::BuyerSession,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_dt_opt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

// ─── PurchaseStatus ──────────────────────────────────────────────────────────

// Status literals are written inline in SQL; only the read side needs a
// helper.
pub fn decode_status(s: &str) -> Result<PurchaseStatus> {
  match s {
    "pending" => Ok(PurchaseStatus::Pending),
    "completed" => Ok(PurchaseStatus::Completed),
    "failed" => Ok(PurchaseStatus::Failed),
    "refunded" => Ok(PurchaseStatus::Refunded),
    other => Err(Error::Decode(format!("unknown purchase status: {other:?}"))),
  }
}

// ─── VerificationStatus ──────────────────────────────────────────────────────

pub fn encode_verification(v: VerificationStatus) -> &'static str {
  match v {
    VerificationStatus::Pending => "pending",
    VerificationStatus::InProgress => "in_progress",
    VerificationStatus::Verified => "verified",
    VerificationStatus::Rejected => "rejected",
    VerificationStatus::Expired => "expired",
  }
}

pub fn decode_verification(s: &str) -> Result<VerificationStatus> {
  match s {
    "pending" => Ok(VerificationStatus::Pending),
    "in_progress" => Ok(VerificationStatus::InProgress),
    "verified" => Ok(VerificationStatus::Verified),
    "rejected" => Ok(VerificationStatus::Rejected),
    "expired" => Ok(VerificationStatus::Expired),
    other => {
      Err(Error::Decode(format!("unknown verification status: {other:?}")))
    }
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `buyer_sessions` row.
pub struct RawSession {
  pub session_id:         String,
  pub session_token:      String,
  pub fingerprint_digest: Option<String>,
  pub ip:                 String,
  pub user_agent:         Option<String>,
  pub created_at:         String,
  pub last_active_at:     String,
  pub expires_at:         String,
}

/// Column list matching [`RawSession::from_row`].
pub const SESSION_COLUMNS: &str = "session_id, session_token, \
   fingerprint_digest, ip, user_agent, created_at, last_active_at, expires_at";

impl RawSession {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_id:         row.get(0)?,
      session_token:      row.get(1)?,
      fingerprint_digest: row.get(2)?,
      ip:                 row.get(3)?,
      user_agent:         row.get(4)?,
      created_at:         row.get(5)?,
      last_active_at:     row.get(6)?,
      expires_at:         row.get(7)?,
    })
  }

  pub fn into_session(self) -> Result<BuyerSession> {
    Ok(BuyerSession {
      session_id:         decode_uuid(&self.session_id)?,
      session_token:      self.session_token,
      fingerprint_digest: self.fingerprint_digest,
      ip:                 self.ip,
      user_agent:         self.user_agent,
      created_at:         decode_dt(&self.created_at)?,
      last_active_at:     decode_dt(&self.last_active_at)?,
      expires_at:         decode_dt(&self.expires_at)?,
    })
  }
}

/// Raw values read directly from a `creators` row.
pub struct RawCreator {
  pub creator_id:             String,
  pub email_verified:         bool,
  pub verification_status:    String,
  pub payout_setup_completed: bool,
  pub currency:               String,
  pub created_at:             String,
}

pub const CREATOR_COLUMNS: &str = "creator_id, email_verified, \
   verification_status, payout_setup_completed, currency, created_at";

impl RawCreator {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      creator_id:             row.get(0)?,
      email_verified:         row.get(1)?,
      verification_status:    row.get(2)?,
      payout_setup_completed: row.get(3)?,
      currency:               row.get(4)?,
      created_at:             row.get(5)?,
    })
  }

  pub fn into_profile(self) -> Result<CreatorProfile> {
    Ok(CreatorProfile {
      creator_id:             decode_uuid(&self.creator_id)?,
      email_verified:         self.email_verified,
      verification_status:    decode_verification(&self.verification_status)?,
      payout_setup_completed: self.payout_setup_completed,
      currency:               self.currency,
      created_at:             decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `contents` row.
pub struct RawContent {
  pub content_id:       String,
  pub creator_id:       String,
  pub title:            String,
  pub media_key:        String,
  pub price_cents:      i64,
  pub base_price_cents: Option<i64>,
  pub currency:         String,
  pub access_ttl_days:  Option<i64>,
  pub view_count:       i64,
  pub created_at:       String,
}

pub const CONTENT_COLUMNS: &str = "content_id, creator_id, title, media_key, \
   price_cents, base_price_cents, currency, access_ttl_days, view_count, \
   created_at";

impl RawContent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      content_id:       row.get(0)?,
      creator_id:       row.get(1)?,
      title:            row.get(2)?,
      media_key:        row.get(3)?,
      price_cents:      row.get(4)?,
      base_price_cents: row.get(5)?,
      currency:         row.get(6)?,
      access_ttl_days:  row.get(7)?,
      view_count:       row.get(8)?,
      created_at:       row.get(9)?,
    })
  }

  pub fn into_content(self) -> Result<Content> {
    Ok(Content {
      content_id:       decode_uuid(&self.content_id)?,
      creator_id:       decode_uuid(&self.creator_id)?,
      title:            self.title,
      media_key:        self.media_key,
      price_cents:      self.price_cents,
      base_price_cents: self.base_price_cents,
      currency:         self.currency,
      access_ttl_days:  self.access_ttl_days,
      view_count:       self.view_count,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `purchases` row.
pub struct RawPurchase {
  pub purchase_id:            String,
  pub content_id:             String,
  pub creator_id:             String,
  pub session_id:             String,
  pub amount_cents:           i64,
  pub currency:               String,
  pub status:                 String,
  pub payment_intent_id:      Option<String>,
  pub access_token:           Option<String>,
  pub access_expires_at:      Option<String>,
  pub base_price_cents:       Option<i64>,
  pub creator_share_cents:    Option<i64>,
  pub view_count:             i64,
  pub last_viewed_at:         Option<String>,
  pub earnings_pending_until: Option<String>,
  pub earnings_released:      bool,
  pub failure_reason:         Option<String>,
  pub created_at:             String,
  pub completed_at:           Option<String>,
}

pub const PURCHASE_COLUMNS: &str = "purchase_id, content_id, creator_id, \
   session_id, amount_cents, currency, status, payment_intent_id, \
   access_token, access_expires_at, base_price_cents, creator_share_cents, \
   view_count, last_viewed_at, earnings_pending_until, earnings_released, \
   failure_reason, created_at, completed_at";

impl RawPurchase {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      purchase_id:            row.get(0)?,
      content_id:             row.get(1)?,
      creator_id:             row.get(2)?,
      session_id:             row.get(3)?,
      amount_cents:           row.get(4)?,
      currency:               row.get(5)?,
      status:                 row.get(6)?,
      payment_intent_id:      row.get(7)?,
      access_token:           row.get(8)?,
      access_expires_at:      row.get(9)?,
      base_price_cents:       row.get(10)?,
      creator_share_cents:    row.get(11)?,
      view_count:             row.get(12)?,
      last_viewed_at:         row.get(13)?,
      earnings_pending_until: row.get(14)?,
      earnings_released:      row.get(15)?,
      failure_reason:         row.get(16)?,
      created_at:             row.get(17)?,
      completed_at:           row.get(18)?,
    })
  }

  pub fn into_purchase(self) -> Result<Purchase> {
    Ok(Purchase {
      purchase_id:            decode_uuid(&self.purchase_id)?,
      content_id:             decode_uuid(&self.content_id)?,
      creator_id:             decode_uuid(&self.creator_id)?,
      session_id:             decode_uuid(&self.session_id)?,
      amount_cents:           self.amount_cents,
      currency:               self.currency,
      status:                 decode_status(&self.status)?,
      payment_intent_id:      self.payment_intent_id,
      access_token:           self.access_token,
      access_expires_at:      decode_dt_opt(self.access_expires_at.as_deref())?,
      base_price_cents:       self.base_price_cents,
      creator_share_cents:    self.creator_share_cents,
      view_count:             self.view_count,
      last_viewed_at:         decode_dt_opt(self.last_viewed_at.as_deref())?,
      earnings_pending_until: decode_dt_opt(
        self.earnings_pending_until.as_deref(),
      )?,
      earnings_released:      self.earnings_released,
      failure_reason:         self.failure_reason,
      created_at:             decode_dt(&self.created_at)?,
      completed_at:           decode_dt_opt(self.completed_at.as_deref())?,
    })
  }
}
