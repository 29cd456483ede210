//! Ledger policy knobs: the earnings hold window, session retention, and the
//! creator-share fee rates.

use chrono::Duration;

/// Tunable policy constants, injected into the store at construction.
#[derive(Debug, Clone, Copy)]
pub struct LedgerPolicy {
  /// How long a completed purchase's earnings stay pending before the
  /// release scheduler may promote them.
  pub hold_period:          Duration,
  /// Buyer-session retention window.
  pub session_ttl:          Duration,
  /// Creator share of `base_price_cents`, in basis points, when the content
  /// recorded a base price.
  pub base_price_share_bps: i64,
  /// Creator share of the gross amount, in basis points, otherwise.
  pub amount_share_bps:     i64,
}

impl Default for LedgerPolicy {
  fn default() -> Self {
    Self {
      hold_period:          Duration::days(7),
      session_ttl:          Duration::days(90),
      base_price_share_bps: 9_000,
      amount_share_bps:     8_500,
    }
  }
}

impl LedgerPolicy {
  /// The creator's earnings share for one purchase, fixed at completion
  /// time and stored on the purchase row.
  ///
  /// The basis differs: 90% of the base price when one was recorded, else
  /// 85% of the gross amount. Integer arithmetic truncates toward zero;
  /// sub-cent remainders stay with the platform.
  // TODO: product has not confirmed whether the two rates should converge;
  // change them here only, nothing else recomputes shares.
  pub fn creator_share_cents(
    &self,
    amount_cents:     i64,
    base_price_cents: Option<i64>,
  ) -> i64 {
    match base_price_cents {
      Some(base) => base * self.base_price_share_bps / 10_000,
      None       => amount_cents * self.amount_share_bps / 10_000,
    }
  }
}
