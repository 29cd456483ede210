//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc};
use tollgate_core::{
  access::{AccessDenied, AccessOutcome},
  creator::{VerificationStatus, VerificationUpdate},
  policy::LedgerPolicy,
  purchase::{NewContent, NewPurchase, Purchase, PurchaseStatus},
  release::{ReleaseOutcome, run_release},
  session::{BuyerSession, ResolveSession},
  store::{LedgerStore, SessionStore},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory(LedgerPolicy::default())
    .await
    .expect("in-memory store")
}

/// A store whose hold window is zero, so completed purchases are
/// immediately due for release.
async fn zero_hold_store() -> SqliteStore {
  SqliteStore::open_in_memory(LedgerPolicy {
    hold_period: Duration::zero(),
    ..LedgerPolicy::default()
  })
  .await
  .expect("in-memory store")
}

fn resolve_input() -> ResolveSession {
  ResolveSession {
    session_token: None,
    fingerprint:   None,
    ip:            "203.0.113.7".into(),
    user_agent:    Some("tollgate-tests".into()),
  }
}

async fn new_session(s: &SqliteStore) -> BuyerSession {
  s.resolve_session(resolve_input()).await.unwrap()
}

/// Seed one creator with one piece of content; returns `(creator, content)`.
async fn seed_content(
  s:                &SqliteStore,
  price_cents:      i64,
  base_price_cents: Option<i64>,
  access_ttl_days:  Option<i64>,
) -> (Uuid, Uuid) {
  let creator = s.add_creator("USD".into()).await.unwrap();
  let content = s
    .add_content(NewContent {
      creator_id: creator.creator_id,
      title: "Field Recording No. 4".into(),
      media_key: "media/field-recording-4.mp4".into(),
      price_cents,
      base_price_cents,
      currency: "USD".into(),
      access_ttl_days,
    })
    .await
    .unwrap();
  (creator.creator_id, content.content_id)
}

/// Initiate and confirm a purchase of `content_id` from a fresh session.
async fn completed_purchase(s: &SqliteStore, content_id: Uuid) -> Purchase {
  let session = new_session(s).await;
  let content = s.get_content(content_id).await.unwrap().unwrap();
  let pending = s
    .initiate_purchase(NewPurchase {
      content_id,
      session_id: session.session_id,
      amount_cents: content.price_cents,
      currency: content.currency,
    })
    .await
    .unwrap();
  s.complete_purchase(pending.purchase_id, "pi_test_1".into())
    .await
    .unwrap()
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn resolve_creates_a_new_session() {
  let s = store().await;
  let session = new_session(&s).await;

  assert!(!session.session_token.is_empty());
  assert!(session.expires_at > Utc::now() + Duration::days(89));
  assert_eq!(session.ip, "203.0.113.7");
}

#[tokio::test]
async fn resolve_reuses_a_valid_token() {
  let s = store().await;
  let first = new_session(&s).await;

  let second = s
    .resolve_session(ResolveSession {
      session_token: Some(first.session_token.clone()),
      ..resolve_input()
    })
    .await
    .unwrap();

  assert_eq!(second.session_id, first.session_id);
  assert_eq!(second.session_token, first.session_token);
  assert!(second.last_active_at >= first.last_active_at);
}

#[tokio::test]
async fn resolve_by_fingerprint_rebinds_ip_and_agent() {
  let s = store().await;
  let first = s
    .resolve_session(ResolveSession {
      fingerprint: Some("canvas:widget:tz".into()),
      ..resolve_input()
    })
    .await
    .unwrap();

  // Token lost; same device fingerprint from a new address.
  let second = s
    .resolve_session(ResolveSession {
      session_token: None,
      fingerprint:   Some("canvas:widget:tz".into()),
      ip:            "198.51.100.9".into(),
      user_agent:    Some("tollgate-tests/2".into()),
    })
    .await
    .unwrap();

  assert_eq!(second.session_id, first.session_id);
  assert_eq!(second.session_token, first.session_token);
  assert_eq!(second.ip, "198.51.100.9");
  assert_eq!(second.user_agent.as_deref(), Some("tollgate-tests/2"));
}

#[tokio::test]
async fn unknown_token_without_fingerprint_creates_fresh_session() {
  let s = store().await;
  let first = new_session(&s).await;

  let second = s
    .resolve_session(ResolveSession {
      session_token: Some("no-such-token".into()),
      ..resolve_input()
    })
    .await
    .unwrap();

  assert_ne!(second.session_id, first.session_id);
  assert_ne!(second.session_token, first.session_token);
}

#[tokio::test]
async fn expired_session_is_treated_as_absent() {
  let s = SqliteStore::open_in_memory(LedgerPolicy {
    session_ttl: Duration::zero(),
    ..LedgerPolicy::default()
  })
  .await
  .unwrap();

  let first = new_session(&s).await;
  assert!(first.is_expired(Utc::now()));

  // The token exists but the session is expired, so resolution must fall
  // through to creation rather than erroring.
  let second = s
    .resolve_session(ResolveSession {
      session_token: Some(first.session_token.clone()),
      ..resolve_input()
    })
    .await
    .unwrap();
  assert_ne!(second.session_id, first.session_id);

  assert!(s.get_session(&first.session_token).await.unwrap().is_none());
}

#[tokio::test]
async fn get_session_returns_live_session() {
  let s = store().await;
  let created = new_session(&s).await;

  let fetched = s.get_session(&created.session_token).await.unwrap().unwrap();
  assert_eq!(fetched.session_id, created.session_id);
}

// ─── Purchase lifecycle ──────────────────────────────────────────────────────

#[tokio::test]
async fn initiate_requires_known_content() {
  let s = store().await;
  let session = new_session(&s).await;

  let err = s
    .initiate_purchase(NewPurchase {
      content_id:   Uuid::new_v4(),
      session_id:   session.session_id,
      amount_cents: 1_000,
      currency:     "USD".into(),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::ContentNotFound(_)));
}

#[tokio::test]
async fn initiate_requires_known_session() {
  let s = store().await;
  let (_, content_id) = seed_content(&s, 1_000, None, None).await;

  let err = s
    .initiate_purchase(NewPurchase {
      content_id,
      session_id:   Uuid::new_v4(),
      amount_cents: 1_000,
      currency:     "USD".into(),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::SessionNotFound(_)));
}

#[tokio::test]
async fn initiate_is_pending_with_no_token() {
  let s = store().await;
  let (creator_id, content_id) = seed_content(&s, 1_000, None, None).await;
  let session = new_session(&s).await;

  let purchase = s
    .initiate_purchase(NewPurchase {
      content_id,
      session_id:   session.session_id,
      amount_cents: 1_000,
      currency:     "USD".into(),
    })
    .await
    .unwrap();

  assert_eq!(purchase.status, PurchaseStatus::Pending);
  assert_eq!(purchase.creator_id, creator_id);
  assert!(purchase.access_token.is_none());
  assert!(purchase.earnings_pending_until.is_none());
  assert!(purchase.creator_share_cents.is_none());
}

#[tokio::test]
async fn complete_issues_token_and_stamps_earnings() {
  let s = store().await;
  let (_, content_id) = seed_content(&s, 1_000, None, None).await;

  let purchase = completed_purchase(&s, content_id).await;

  assert_eq!(purchase.status, PurchaseStatus::Completed);
  assert_eq!(purchase.payment_intent_id.as_deref(), Some("pi_test_1"));
  assert!(purchase.access_token.is_some());
  assert!(purchase.completed_at.is_some());
  // 85% of the gross amount when no base price was recorded.
  assert_eq!(purchase.creator_share_cents, Some(850));
  // Hold deadline is seven days out under the default policy.
  let pending_until = purchase.earnings_pending_until.unwrap();
  assert!(pending_until > Utc::now() + Duration::days(6));
  assert!(!purchase.earnings_released);
}

#[tokio::test]
async fn complete_uses_base_price_share_when_recorded() {
  let s = store().await;
  let (_, content_id) = seed_content(&s, 1_200, Some(1_000), None).await;

  let purchase = completed_purchase(&s, content_id).await;

  // 90% of the base price, not 85% of the gross amount.
  assert_eq!(purchase.base_price_cents, Some(1_000));
  assert_eq!(purchase.creator_share_cents, Some(900));
}

#[tokio::test]
async fn complete_is_idempotent_under_webhook_retry() {
  let s = store().await;
  let (creator_id, content_id) = seed_content(&s, 1_000, None, None).await;

  let first = completed_purchase(&s, content_id).await;
  let second = s
    .complete_purchase(first.purchase_id, "pi_test_retry".into())
    .await
    .unwrap();

  // The retry is a no-op: same token, same intent, no double-counting.
  assert_eq!(second.access_token, first.access_token);
  assert_eq!(second.payment_intent_id, first.payment_intent_id);

  let balance = s.creator_balance(creator_id).await.unwrap();
  assert_eq!(balance.lifetime_earnings_cents, 850);
}

#[tokio::test]
async fn complete_unknown_purchase_errors() {
  let s = store().await;
  let err = s
    .complete_purchase(Uuid::new_v4(), "pi_test_1".into())
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::PurchaseNotFound(_)));
}

#[tokio::test]
async fn complete_failed_purchase_is_invalid() {
  let s = store().await;
  let (_, content_id) = seed_content(&s, 1_000, None, None).await;
  let session = new_session(&s).await;

  let pending = s
    .initiate_purchase(NewPurchase {
      content_id,
      session_id:   session.session_id,
      amount_cents: 1_000,
      currency:     "USD".into(),
    })
    .await
    .unwrap();
  s.fail_purchase(pending.purchase_id, Some("card declined".into()))
    .await
    .unwrap();

  let err = s
    .complete_purchase(pending.purchase_id, "pi_test_late".into())
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::InvalidTransition { from: PurchaseStatus::Failed, .. }
  ));
}

#[tokio::test]
async fn fail_purchase_never_issues_token_and_is_idempotent() {
  let s = store().await;
  let (_, content_id) = seed_content(&s, 1_000, None, None).await;
  let session = new_session(&s).await;

  let pending = s
    .initiate_purchase(NewPurchase {
      content_id,
      session_id:   session.session_id,
      amount_cents: 1_000,
      currency:     "USD".into(),
    })
    .await
    .unwrap();

  let failed = s
    .fail_purchase(pending.purchase_id, Some("card declined".into()))
    .await
    .unwrap();
  assert_eq!(failed.status, PurchaseStatus::Failed);
  assert_eq!(failed.failure_reason.as_deref(), Some("card declined"));
  assert!(failed.access_token.is_none());

  let again = s.fail_purchase(pending.purchase_id, None).await.unwrap();
  assert_eq!(again.status, PurchaseStatus::Failed);
}

#[tokio::test]
async fn refund_requires_a_completed_purchase() {
  let s = store().await;
  let (_, content_id) = seed_content(&s, 1_000, None, None).await;
  let session = new_session(&s).await;

  let pending = s
    .initiate_purchase(NewPurchase {
      content_id,
      session_id:   session.session_id,
      amount_cents: 1_000,
      currency:     "USD".into(),
    })
    .await
    .unwrap();

  let err = s.refund_purchase(pending.purchase_id).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::InvalidTransition { from: PurchaseStatus::Pending, .. }
  ));
}

// ─── Access verification ─────────────────────────────────────────────────────

#[tokio::test]
async fn verify_unknown_token_is_not_found() {
  let s = store().await;
  let outcome = s.verify_access("no-such-token", None).await.unwrap();
  assert!(matches!(
    outcome,
    AccessOutcome::Denied(AccessDenied::NotFound)
  ));
}

#[tokio::test]
async fn verify_refunded_purchase_is_not_completed() {
  let s = store().await;
  let (_, content_id) = seed_content(&s, 1_000, None, None).await;

  let purchase = completed_purchase(&s, content_id).await;
  s.refund_purchase(purchase.purchase_id).await.unwrap();

  let outcome = s
    .verify_access(purchase.access_token.as_deref().unwrap(), None)
    .await
    .unwrap();
  assert!(matches!(
    outcome,
    AccessOutcome::Denied(AccessDenied::NotCompleted)
  ));
}

#[tokio::test]
async fn verify_binds_to_the_purchasing_session() {
  let s = store().await;
  let (_, content_id) = seed_content(&s, 1_000, None, None).await;

  let purchase = completed_purchase(&s, content_id).await;
  let token = purchase.access_token.as_deref().unwrap();
  let other = new_session(&s).await;

  // A different valid session is still a mismatch.
  let outcome = s
    .verify_access(token, Some(&other.session_token))
    .await
    .unwrap();
  assert!(matches!(
    outcome,
    AccessOutcome::Denied(AccessDenied::SessionMismatch)
  ));

  // The purchase is untouched by a denied attempt.
  let after = s.get_purchase(purchase.purchase_id).await.unwrap().unwrap();
  assert_eq!(after.view_count, 0);
}

#[tokio::test]
async fn verify_without_session_header_is_tolerated() {
  let s = store().await;
  let (_, content_id) = seed_content(&s, 1_000, None, None).await;

  let purchase = completed_purchase(&s, content_id).await;
  let outcome = s
    .verify_access(purchase.access_token.as_deref().unwrap(), None)
    .await
    .unwrap();
  assert!(matches!(outcome, AccessOutcome::Granted(_)));
}

#[tokio::test]
async fn verify_grants_and_meters_views() {
  let s = store().await;
  let (_, content_id) = seed_content(&s, 1_000, None, None).await;

  let owner = new_session(&s).await;
  let pending = s
    .initiate_purchase(NewPurchase {
      content_id,
      session_id:   owner.session_id,
      amount_cents: 1_000,
      currency:     "USD".into(),
    })
    .await
    .unwrap();
  let purchase = s
    .complete_purchase(pending.purchase_id, "pi_test_1".into())
    .await
    .unwrap();
  let token = purchase.access_token.clone().unwrap();

  let AccessOutcome::Granted(first) = s
    .verify_access(&token, Some(&owner.session_token))
    .await
    .unwrap()
  else {
    panic!("expected grant");
  };
  assert_eq!(first.view_count, 1);
  assert_eq!(first.media_key, "media/field-recording-4.mp4");

  let AccessOutcome::Granted(second) =
    s.verify_access(&token, None).await.unwrap()
  else {
    panic!("expected grant");
  };
  assert_eq!(second.view_count, 2);

  // The content-level aggregate moves with every grant.
  let content = s.get_content(content_id).await.unwrap().unwrap();
  assert_eq!(content.view_count, 2);

  let after = s.get_purchase(purchase.purchase_id).await.unwrap().unwrap();
  assert_eq!(after.view_count, 2);
  assert!(after.last_viewed_at.is_some());
}

#[tokio::test]
async fn verify_expired_access_is_denied() {
  let s = store().await;
  // A zero-day TTL expires the moment completion stamps it.
  let (_, content_id) = seed_content(&s, 1_000, None, Some(0)).await;

  let purchase = completed_purchase(&s, content_id).await;
  assert!(purchase.access_expires_at.is_some());

  let outcome = s
    .verify_access(purchase.access_token.as_deref().unwrap(), None)
    .await
    .unwrap();
  assert!(matches!(
    outcome,
    AccessOutcome::Denied(AccessDenied::Expired)
  ));
}

// ─── Balances & release ──────────────────────────────────────────────────────

#[tokio::test]
async fn completed_purchase_is_pending_until_hold_elapses() {
  let s = store().await;
  let (creator_id, content_id) = seed_content(&s, 1_000, None, None).await;

  completed_purchase(&s, content_id).await;

  let balance = s.creator_balance(creator_id).await.unwrap();
  assert_eq!(balance.lifetime_earnings_cents, 850);
  assert_eq!(balance.pending_balance_cents, 850);
  assert_eq!(balance.available_balance_cents, 0);
  assert_eq!(balance.total_payouts_cents, 0);

  // Nothing is due yet under the seven-day hold.
  assert!(s.due_releases(Utc::now()).await.unwrap().is_empty());
}

#[tokio::test]
async fn release_moves_pending_to_available_exactly_once() {
  let s = zero_hold_store().await;
  let (creator_id, content_id) = seed_content(&s, 1_000, None, None).await;

  let purchase = completed_purchase(&s, content_id).await;

  let summary = run_release(&s, Utc::now()).await.unwrap();
  assert_eq!(summary.released, 1);
  assert_eq!(summary.total, 1);

  let after = s.get_purchase(purchase.purchase_id).await.unwrap().unwrap();
  assert!(after.earnings_released);

  let balance = s.creator_balance(creator_id).await.unwrap();
  assert_eq!(balance.pending_balance_cents, 0);
  assert_eq!(balance.available_balance_cents, 850);

  // A second run finds nothing due and changes nothing.
  let summary = run_release(&s, Utc::now()).await.unwrap();
  assert_eq!(summary.released, 0);
  assert_eq!(summary.total, 0);

  let balance = s.creator_balance(creator_id).await.unwrap();
  assert_eq!(balance.pending_balance_cents, 0);
  assert_eq!(balance.available_balance_cents, 850);
}

#[tokio::test]
async fn release_earnings_rechecks_the_precondition() {
  let s = zero_hold_store().await;
  let (_, content_id) = seed_content(&s, 1_000, None, None).await;
  let purchase = completed_purchase(&s, content_id).await;

  // First release wins.
  let outcome = s
    .release_earnings(purchase.purchase_id, Utc::now())
    .await
    .unwrap();
  assert!(matches!(outcome, ReleaseOutcome::Released { amount_cents: 850, .. }));

  // An overlapping run selecting the same purchase observes the flag.
  let outcome = s
    .release_earnings(purchase.purchase_id, Utc::now())
    .await
    .unwrap();
  assert_eq!(outcome, ReleaseOutcome::Skipped);
}

#[tokio::test]
async fn release_skips_a_purchase_refunded_since_selection() {
  let s = zero_hold_store().await;
  let (creator_id, content_id) = seed_content(&s, 1_000, None, None).await;
  let purchase = completed_purchase(&s, content_id).await;

  // Refund lands between batch selection and the release transaction.
  s.refund_purchase(purchase.purchase_id).await.unwrap();

  let outcome = s
    .release_earnings(purchase.purchase_id, Utc::now())
    .await
    .unwrap();
  assert_eq!(outcome, ReleaseOutcome::Skipped);

  let balance = s.creator_balance(creator_id).await.unwrap();
  assert_eq!(balance.available_balance_cents, 0);
}

#[tokio::test]
async fn release_before_the_hold_deadline_is_skipped() {
  let s = store().await;
  let (_, content_id) = seed_content(&s, 1_000, None, None).await;
  let purchase = completed_purchase(&s, content_id).await;

  let outcome = s
    .release_earnings(purchase.purchase_id, Utc::now())
    .await
    .unwrap();
  assert_eq!(outcome, ReleaseOutcome::Skipped);
}

#[tokio::test]
async fn release_unknown_purchase_errors() {
  let s = store().await;
  let err = s
    .release_earnings(Uuid::new_v4(), Utc::now())
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::PurchaseNotFound(_)));
}

#[tokio::test]
async fn balances_conserve_across_completions_releases_and_payouts() {
  let s = zero_hold_store().await;
  let creator = s.add_creator("USD".into()).await.unwrap();
  let creator_id = creator.creator_id;

  let content = s
    .add_content(NewContent {
      creator_id,
      title: "Longform Essay".into(),
      media_key: "media/longform-essay.pdf".into(),
      price_cents: 1_000,
      base_price_cents: None,
      currency: "USD".into(),
      access_ttl_days: None,
    })
    .await
    .unwrap();

  completed_purchase(&s, content.content_id).await;
  completed_purchase(&s, content.content_id).await;
  run_release(&s, Utc::now()).await.unwrap();
  s.record_payout(creator_id, 600).await.unwrap();
  completed_purchase(&s, content.content_id).await;
  run_release(&s, Utc::now()).await.unwrap();
  completed_purchase(&s, content.content_id).await;

  // 4 completions at 850 each, 3 released, one payout of 600. The last
  // purchase was completed after the final run, so it is still pending.
  let b = s.creator_balance(creator_id).await.unwrap();
  assert_eq!(b.lifetime_earnings_cents, 3_400);
  assert_eq!(b.pending_balance_cents, 850);
  assert_eq!(b.total_payouts_cents, 600);
  assert_eq!(
    b.available_balance_cents,
    (b.lifetime_earnings_cents - b.pending_balance_cents - b.total_payouts_cents)
      .max(0)
  );
  assert_eq!(b.available_balance_cents, 1_950);
}

#[tokio::test]
async fn available_balance_clamps_at_zero() {
  let s = zero_hold_store().await;
  let (creator_id, content_id) = seed_content(&s, 1_000, None, None).await;

  completed_purchase(&s, content_id).await;
  run_release(&s, Utc::now()).await.unwrap();

  // An out-of-order payout callback larger than lifetime earnings must not
  // drive the balance negative.
  s.record_payout(creator_id, 5_000).await.unwrap();

  let b = s.creator_balance(creator_id).await.unwrap();
  assert_eq!(b.total_payouts_cents, 5_000);
  assert_eq!(b.available_balance_cents, 0);
}

#[tokio::test]
async fn balance_for_unknown_creator_errors() {
  let s = store().await;
  let err = s.creator_balance(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, crate::Error::CreatorNotFound(_)));
}

#[tokio::test]
async fn payout_for_unknown_creator_errors() {
  let s = store().await;
  let err = s.record_payout(Uuid::new_v4(), 100).await.unwrap_err();
  assert!(matches!(err, crate::Error::CreatorNotFound(_)));
}

// ─── Creators ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_creator_starts_fully_unverified() {
  let s = store().await;
  let creator = s.add_creator("EUR".into()).await.unwrap();

  let fetched = s.get_creator(creator.creator_id).await.unwrap().unwrap();
  assert!(!fetched.email_verified);
  assert_eq!(fetched.verification_status, VerificationStatus::Pending);
  assert!(!fetched.payout_setup_completed);
  assert_eq!(fetched.currency, "EUR");
}

#[tokio::test]
async fn update_verification_applies_only_present_fields() {
  let s = store().await;
  let creator = s.add_creator("USD".into()).await.unwrap();

  let updated = s
    .update_verification(creator.creator_id, VerificationUpdate {
      email_verified: Some(true),
      ..VerificationUpdate::default()
    })
    .await
    .unwrap();
  assert!(updated.email_verified);
  assert_eq!(updated.verification_status, VerificationStatus::Pending);
  assert!(!updated.payout_setup_completed);

  let updated = s
    .update_verification(creator.creator_id, VerificationUpdate {
      verification_status:    Some(VerificationStatus::Verified),
      payout_setup_completed: Some(true),
      ..VerificationUpdate::default()
    })
    .await
    .unwrap();
  assert!(updated.email_verified);
  assert_eq!(updated.verification_status, VerificationStatus::Verified);
  assert!(updated.payout_setup_completed);
}

#[tokio::test]
async fn update_verification_unknown_creator_errors() {
  let s = store().await;
  let err = s
    .update_verification(Uuid::new_v4(), VerificationUpdate::default())
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::CreatorNotFound(_)));
}
