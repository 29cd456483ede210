//! The earnings release routine.
//!
//! Runs over the set of due purchases and releases each one in its own
//! store transaction. One purchase's failure never blocks the rest of the
//! batch; the unmet precondition persists, so the purchase stays due and is
//! retried on the next run. The server binary drives this on a recurring
//! interval and also exposes it as a manual operational trigger.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::store::LedgerStore;

/// The result of releasing a single purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
  /// The flag was flipped and the share moved from pending to available.
  Released { creator_id: Uuid, amount_cents: i64 },
  /// The precondition no longer held inside the transaction — already
  /// released by an overlapping run, or refunded since selection.
  Skipped,
}

/// Summary of one release run.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReleaseSummary {
  /// Purchases actually released this run.
  pub released: usize,
  /// Purchases considered (the due set at selection time).
  pub total:    usize,
}

/// Release every purchase due at `now`.
///
/// Errors only if the due-set query itself fails; per-purchase failures are
/// logged and counted out.
pub async fn run_release<S: LedgerStore>(
  store: &S,
  now: DateTime<Utc>,
) -> Result<ReleaseSummary, S::Error> {
  let due = store.due_releases(now).await?;
  let total = due.len();
  let mut released = 0;

  for purchase_id in due {
    match store.release_earnings(purchase_id, now).await {
      Ok(ReleaseOutcome::Released { creator_id, amount_cents }) => {
        tracing::debug!(
          purchase = %purchase_id,
          creator = %creator_id,
          amount_cents,
          "earnings released"
        );
        released += 1;
      }
      Ok(ReleaseOutcome::Skipped) => {
        tracing::debug!(
          purchase = %purchase_id,
          "release skipped: precondition no longer holds"
        );
      }
      Err(e) => {
        tracing::warn!(
          purchase = %purchase_id,
          error = %e,
          "release failed; purchase stays due for the next run"
        );
      }
    }
  }

  Ok(ReleaseSummary { released, total })
}
