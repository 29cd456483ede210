//! The `SessionStore` and `LedgerStore` traits.
//!
//! The traits are implemented by storage backends (e.g.
//! `tollgate-store-sqlite`). Higher layers (`tollgate-api`,
//! `tollgate-server`) depend on these abstractions, not on any concrete
//! backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`). The associated
//! error type must convert into [`crate::Error`] so the API layer can map
//! backend errors onto the shared domain taxonomy.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  access::AccessOutcome,
  balance::CreatorBalance,
  creator::{CreatorProfile, VerificationUpdate},
  payout::Payout,
  purchase::{Content, NewContent, NewPurchase, Purchase},
  release::ReleaseOutcome,
  session::{BuyerSession, ResolveSession},
};

// ─── Sessions ────────────────────────────────────────────────────────────────

/// Abstraction over the buyer-session store.
pub trait SessionStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  /// Resolve an existing session or create a new one.
  ///
  /// A valid non-expired token match refreshes `last_active_at` and wins; a
  /// valid fingerprint match rebinds ip/user-agent and refreshes; otherwise
  /// a new session is created with a fresh random token and the policy TTL.
  /// Expired matches are treated as absent — this method never errors on a
  /// stale session.
  fn resolve_session(
    &self,
    input: ResolveSession,
  ) -> impl Future<Output = Result<BuyerSession, Self::Error>> + Send + '_;

  /// Look up a session by token. Expired sessions resolve to `None`.
  fn get_session<'a>(
    &'a self,
    session_token: &'a str,
  ) -> impl Future<Output = Result<Option<BuyerSession>, Self::Error>> + Send + 'a;
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

/// Abstraction over the purchase ledger, earnings accumulator, and access
/// verifier.
///
/// Every multi-step mutation (completion, release, view metering) must be
/// one atomic unit in the backing store; partial application of any of them
/// is a correctness bug, not a recoverable state.
pub trait LedgerStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  // ── Creators ──────────────────────────────────────────────────────────

  /// Register a creator with the given settlement currency. The profile
  /// starts fully unverified.
  fn add_creator(
    &self,
    currency: String,
  ) -> impl Future<Output = Result<CreatorProfile, Self::Error>> + Send + '_;

  /// Retrieve a creator profile. Returns `None` if not found.
  fn get_creator(
    &self,
    creator_id: Uuid,
  ) -> impl Future<Output = Result<Option<CreatorProfile>, Self::Error>> + Send + '_;

  /// Apply the identity/payout collaborators' verification facts. Absent
  /// fields are left untouched.
  fn update_verification(
    &self,
    creator_id: Uuid,
    update: VerificationUpdate,
  ) -> impl Future<Output = Result<CreatorProfile, Self::Error>> + Send + '_;

  // ── Contents ──────────────────────────────────────────────────────────

  /// Register a piece of paid content for an existing creator.
  fn add_content(
    &self,
    input: NewContent,
  ) -> impl Future<Output = Result<Content, Self::Error>> + Send + '_;

  /// Retrieve content metadata. Returns `None` if not found.
  fn get_content(
    &self,
    content_id: Uuid,
  ) -> impl Future<Output = Result<Option<Content>, Self::Error>> + Send + '_;

  // ── Purchase lifecycle ────────────────────────────────────────────────

  /// Record a new purchase in `Pending`. No access token, no earnings
  /// stamp. Errors structurally if the content or session is unknown.
  fn initiate_purchase(
    &self,
    input: NewPurchase,
  ) -> impl Future<Output = Result<Purchase, Self::Error>> + Send + '_;

  /// Retrieve a purchase. Returns `None` if not found.
  fn get_purchase(
    &self,
    purchase_id: Uuid,
  ) -> impl Future<Output = Result<Option<Purchase>, Self::Error>> + Send + '_;

  /// `Pending → Completed`: one transaction that issues the unique access
  /// token, stamps the earnings hold deadline, and fixes the creator share
  /// via the fee policy.
  ///
  /// Idempotent under webhook retry: re-completing an already-`Completed`
  /// purchase returns the stored row unchanged. Completing a `Failed` or
  /// `Refunded` purchase is an invalid transition.
  fn complete_purchase(
    &self,
    purchase_id: Uuid,
    payment_intent_id: String,
  ) -> impl Future<Output = Result<Purchase, Self::Error>> + Send + '_;

  /// `Pending → Failed`. Never issues a token. Idempotent on an
  /// already-`Failed` purchase.
  fn fail_purchase(
    &self,
    purchase_id: Uuid,
    reason: Option<String>,
  ) -> impl Future<Output = Result<Purchase, Self::Error>> + Send + '_;

  /// `Completed → Refunded` — marking only; refund money movement is an
  /// external concern. A refunded purchase is never promoted by the
  /// release routine. Idempotent on an already-`Refunded` purchase.
  fn refund_purchase(
    &self,
    purchase_id: Uuid,
  ) -> impl Future<Output = Result<Purchase, Self::Error>> + Send + '_;

  // ── Access verification ───────────────────────────────────────────────

  /// Validate an access token and meter the view.
  ///
  /// Checks, in order: token exists, purchase is `Completed`, a presented
  /// session token matches the purchasing session, access has not expired.
  /// A missing session token is tolerated (email-delivered links carry
  /// none). On grant, the purchase and content view counters are
  /// incremented atomically in the store — no read-modify-write.
  fn verify_access<'a>(
    &'a self,
    access_token: &'a str,
    session_token: Option<&'a str>,
  ) -> impl Future<Output = Result<AccessOutcome, Self::Error>> + Send + 'a;

  // ── Balances & payouts ────────────────────────────────────────────────

  /// Derive the creator's balances. Errors structurally if the creator is
  /// unknown.
  fn creator_balance(
    &self,
    creator_id: Uuid,
  ) -> impl Future<Output = Result<CreatorBalance, Self::Error>> + Send + '_;

  /// Append a completed payout (payout-execution success callback).
  fn record_payout(
    &self,
    creator_id: Uuid,
    amount_cents: i64,
  ) -> impl Future<Output = Result<Payout, Self::Error>> + Send + '_;

  // ── Earnings release ──────────────────────────────────────────────────

  /// Purchases whose earnings are due for release: `Completed`, not yet
  /// released, hold deadline at or before `now`.
  fn due_releases(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  /// Release one purchase's earnings.
  ///
  /// The implementation must re-verify the full precondition (`Completed`,
  /// unreleased, deadline passed) inside the same transaction that flips
  /// `earnings_released`, so a purchase selected from a stale batch
  /// snapshot — or refunded concurrently — is skipped, not promoted.
  fn release_earnings(
    &self,
    purchase_id: Uuid,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<ReleaseOutcome, Self::Error>> + Send + '_;
}
