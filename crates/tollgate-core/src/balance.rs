//! Creator balances — computed views over the purchase and payout ledgers,
//! never stored.
//!
//! Deriving the balance at read time removes the conservation invariant as a
//! runtime risk: there are no counters to drift, and the release transaction
//! only flips a flag. The clamp in [`CreatorBalance::derive`] covers reads
//! that race an in-flight release or payout; a racing read may under-report
//! `available_balance_cents` but can never over-report it.

use serde::Serialize;
use uuid::Uuid;

/// Per-creator aggregate balances, all in minor units of `currency`.
#[derive(Debug, Clone, Serialize)]
pub struct CreatorBalance {
  pub creator_id:              Uuid,
  /// Sum of creator shares over all completed purchases.
  pub lifetime_earnings_cents: i64,
  /// The subset of lifetime earnings still inside the hold window.
  pub pending_balance_cents:   i64,
  /// `max(0, lifetime − pending − payouts)`.
  pub available_balance_cents: i64,
  /// Sum over completed payouts.
  pub total_payouts_cents:     i64,
  pub currency:                String,
}

impl CreatorBalance {
  /// The single place the balance formula lives. Backends supply the three
  /// sums; nothing else ever computes `available_balance_cents`.
  pub fn derive(
    creator_id:     Uuid,
    currency:       String,
    lifetime_cents: i64,
    pending_cents:  i64,
    payouts_cents:  i64,
  ) -> Self {
    Self {
      creator_id,
      lifetime_earnings_cents: lifetime_cents,
      pending_balance_cents:   pending_cents,
      available_balance_cents: (lifetime_cents - pending_cents - payouts_cents)
        .max(0),
      total_payouts_cents:     payouts_cents,
      currency,
    }
  }
}
