//! [`SqliteStore`] — the SQLite implementation of [`SessionStore`] and
//! [`LedgerStore`].

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior, params};
use uuid::Uuid;

use tollgate_core::{
  access::{AccessDenied, AccessOutcome, ContentGrant},
  balance::CreatorBalance,
  creator::{CreatorProfile, VerificationStatus, VerificationUpdate},
  payout::Payout,
  policy::LedgerPolicy,
  purchase::{Content, NewContent, NewPurchase, Purchase, PurchaseStatus},
  release::ReleaseOutcome,
  session::{self, BuyerSession, ResolveSession},
  store::{LedgerStore, SessionStore},
  token::opaque_token,
};

use crate::{
  Error, Result,
  encode::{
    CONTENT_COLUMNS, CREATOR_COLUMNS, PURCHASE_COLUMNS, RawContent, RawCreator,
    RawPurchase, RawSession, SESSION_COLUMNS, decode_status, decode_uuid,
    encode_dt, encode_uuid, encode_verification,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Tollgate ledger backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:   tokio_rusqlite::Connection,
  policy: LedgerPolicy,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>, policy: LedgerPolicy) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, policy };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory(policy: LedgerPolicy) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, policy };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row lookup helpers ──────────────────────────────────────────────────────

fn purchase_by_id(
  conn: &rusqlite::Connection,
  id:   &str,
) -> rusqlite::Result<Option<RawPurchase>> {
  conn
    .query_row(
      &format!("SELECT {PURCHASE_COLUMNS} FROM purchases WHERE purchase_id = ?1"),
      params![id],
      |row| RawPurchase::from_row(row),
    )
    .optional()
}

fn creator_by_id(
  conn: &rusqlite::Connection,
  id:   &str,
) -> rusqlite::Result<Option<RawCreator>> {
  conn
    .query_row(
      &format!("SELECT {CREATOR_COLUMNS} FROM creators WHERE creator_id = ?1"),
      params![id],
      |row| RawCreator::from_row(row),
    )
    .optional()
}

fn session_by_token(
  conn:    &rusqlite::Connection,
  token:   &str,
  now_str: &str,
) -> rusqlite::Result<Option<RawSession>> {
  conn
    .query_row(
      &format!(
        "SELECT {SESSION_COLUMNS} FROM buyer_sessions
         WHERE session_token = ?1 AND expires_at > ?2"
      ),
      params![token, now_str],
      |row| RawSession::from_row(row),
    )
    .optional()
}

/// Most recently active non-expired session for a fingerprint digest.
fn session_by_fingerprint(
  conn:    &rusqlite::Connection,
  digest:  &str,
  now_str: &str,
) -> rusqlite::Result<Option<RawSession>> {
  conn
    .query_row(
      &format!(
        "SELECT {SESSION_COLUMNS} FROM buyer_sessions
         WHERE fingerprint_digest = ?1 AND expires_at > ?2
         ORDER BY last_active_at DESC LIMIT 1"
      ),
      params![digest, now_str],
      |row| RawSession::from_row(row),
    )
    .optional()
}

// ─── Closure result carriers ─────────────────────────────────────────────────

/// Outcome of a status-transition attempt, decided inside the transaction.
enum TransitionRow {
  /// The row after the transition (or unchanged, for an idempotent retry).
  Applied(RawPurchase),
  /// The stored status string the transition is not legal from.
  Invalid(String),
}

enum InitiateRow {
  Inserted { creator_id: String },
  NoContent,
  NoSession,
}

/// Pre-decode access verification result, built inside the transaction.
enum RawAccess {
  Granted {
    purchase_id:       String,
    content_id:        String,
    creator_id:        String,
    title:             String,
    media_key:         String,
    view_count:        i64,
    access_expires_at: Option<String>,
  },
  Denied(AccessDenied),
}

enum RawRelease {
  Released { creator_id: String, amount_cents: i64 },
  Skipped,
}

// ─── SessionStore impl ───────────────────────────────────────────────────────

impl SessionStore for SqliteStore {
  type Error = Error;

  async fn resolve_session(
    &self,
    input: ResolveSession,
  ) -> Result<BuyerSession> {
    let now = Utc::now();
    let now_str = encode_dt(now);
    let expires_str = encode_dt(now + self.policy.session_ttl);

    let ResolveSession { session_token, fingerprint, ip, user_agent } = input;
    let digest = fingerprint.as_deref().map(session::fingerprint_digest);

    // Values for the creation path; unused when an existing session wins.
    let new_id = encode_uuid(Uuid::new_v4());
    let new_token = opaque_token();
    let created_str = now_str.clone();

    let raw: RawSession = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if let Some(token) = session_token.as_deref() {
          if let Some(found) = session_by_token(&tx, token, &now_str)? {
            tx.execute(
              "UPDATE buyer_sessions SET last_active_at = ?1
               WHERE session_id = ?2",
              params![now_str, found.session_id],
            )?;
            tx.commit()?;
            return Ok(RawSession { last_active_at: now_str, ..found });
          }
        }

        if let Some(digest) = digest.as_deref() {
          if let Some(found) = session_by_fingerprint(&tx, digest, &now_str)? {
            tx.execute(
              "UPDATE buyer_sessions
               SET ip = ?1, user_agent = ?2, last_active_at = ?3
               WHERE session_id = ?4",
              params![ip, user_agent, now_str, found.session_id],
            )?;
            tx.commit()?;
            return Ok(RawSession {
              ip,
              user_agent,
              last_active_at: now_str,
              ..found
            });
          }
        }

        tx.execute(
          "INSERT INTO buyer_sessions (
             session_id, session_token, fingerprint_digest, ip, user_agent,
             created_at, last_active_at, expires_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          params![
            new_id,
            new_token,
            digest,
            ip,
            user_agent,
            created_str,
            now_str,
            expires_str,
          ],
        )?;
        tx.commit()?;

        Ok(RawSession {
          session_id:         new_id,
          session_token:      new_token,
          fingerprint_digest: digest,
          ip,
          user_agent,
          created_at:         created_str,
          last_active_at:     now_str,
          expires_at:         expires_str,
        })
      })
      .await?;

    raw.into_session()
  }

  async fn get_session(
    &self,
    session_token: &str,
  ) -> Result<Option<BuyerSession>> {
    let token = session_token.to_owned();
    let now_str = encode_dt(Utc::now());

    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| Ok(session_by_token(conn, &token, &now_str)?))
      .await?;

    raw.map(RawSession::into_session).transpose()
  }
}

// ─── LedgerStore impl ────────────────────────────────────────────────────────

impl LedgerStore for SqliteStore {
  type Error = Error;

  // ── Creators ──────────────────────────────────────────────────────────────

  async fn add_creator(&self, currency: String) -> Result<CreatorProfile> {
    let profile = CreatorProfile {
      creator_id:             Uuid::new_v4(),
      email_verified:         false,
      verification_status:    VerificationStatus::Pending,
      payout_setup_completed: false,
      currency,
      created_at:             Utc::now(),
    };

    let id_str = encode_uuid(profile.creator_id);
    let at_str = encode_dt(profile.created_at);
    let currency = profile.currency.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO creators (
             creator_id, email_verified, verification_status,
             payout_setup_completed, currency, created_at
           ) VALUES (?1, 0, 'pending', 0, ?2, ?3)",
          params![id_str, currency, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(profile)
  }

  async fn get_creator(
    &self,
    creator_id: Uuid,
  ) -> Result<Option<CreatorProfile>> {
    let id_str = encode_uuid(creator_id);

    let raw: Option<RawCreator> = self
      .conn
      .call(move |conn| Ok(creator_by_id(conn, &id_str)?))
      .await?;

    raw.map(RawCreator::into_profile).transpose()
  }

  async fn update_verification(
    &self,
    creator_id: Uuid,
    update: VerificationUpdate,
  ) -> Result<CreatorProfile> {
    let id_str = encode_uuid(creator_id);
    let status_str =
      update.verification_status.map(|s| encode_verification(s).to_owned());

    let raw: Option<RawCreator> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let Some(found) = creator_by_id(&tx, &id_str)? else {
          return Ok(None);
        };

        let email = update.email_verified.unwrap_or(found.email_verified);
        let status =
          status_str.unwrap_or_else(|| found.verification_status.clone());
        let payout = update
          .payout_setup_completed
          .unwrap_or(found.payout_setup_completed);

        tx.execute(
          "UPDATE creators
           SET email_verified = ?1, verification_status = ?2,
               payout_setup_completed = ?3
           WHERE creator_id = ?4",
          params![email, status, payout, id_str],
        )?;
        tx.commit()?;

        Ok(Some(RawCreator {
          email_verified: email,
          verification_status: status,
          payout_setup_completed: payout,
          ..found
        }))
      })
      .await?;

    raw
      .ok_or(Error::CreatorNotFound(creator_id))?
      .into_profile()
  }

  // ── Contents ──────────────────────────────────────────────────────────────

  async fn add_content(&self, input: NewContent) -> Result<Content> {
    let content = Content {
      content_id:       Uuid::new_v4(),
      creator_id:       input.creator_id,
      title:            input.title,
      media_key:        input.media_key,
      price_cents:      input.price_cents,
      base_price_cents: input.base_price_cents,
      currency:         input.currency,
      access_ttl_days:  input.access_ttl_days,
      view_count:       0,
      created_at:       Utc::now(),
    };

    let id_str = encode_uuid(content.content_id);
    let creator_str = encode_uuid(content.creator_id);
    let at_str = encode_dt(content.created_at);
    let title = content.title.clone();
    let media_key = content.media_key.clone();
    let currency = content.currency.clone();
    let price = content.price_cents;
    let base_price = content.base_price_cents;
    let ttl_days = content.access_ttl_days;

    let inserted: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let creator_exists: bool = tx
          .query_row(
            "SELECT 1 FROM creators WHERE creator_id = ?1",
            params![creator_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !creator_exists {
          return Ok(false);
        }

        tx.execute(
          "INSERT INTO contents (
             content_id, creator_id, title, media_key, price_cents,
             base_price_cents, currency, access_ttl_days, view_count,
             created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9)",
          params![
            id_str, creator_str, title, media_key, price, base_price,
            currency, ttl_days, at_str,
          ],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(Error::CreatorNotFound(content.creator_id));
    }
    Ok(content)
  }

  async fn get_content(&self, content_id: Uuid) -> Result<Option<Content>> {
    let id_str = encode_uuid(content_id);

    let raw: Option<RawContent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CONTENT_COLUMNS} FROM contents WHERE content_id = ?1"
              ),
              params![id_str],
              |row| RawContent::from_row(row),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawContent::into_content).transpose()
  }

  // ── Purchase lifecycle ────────────────────────────────────────────────────

  async fn initiate_purchase(&self, input: NewPurchase) -> Result<Purchase> {
    let purchase_id = Uuid::new_v4();
    let created_at = Utc::now();

    let id_str = encode_uuid(purchase_id);
    let content_str = encode_uuid(input.content_id);
    let session_str = encode_uuid(input.session_id);
    let at_str = encode_dt(created_at);
    let amount = input.amount_cents;
    let currency = input.currency.clone();

    let row: InitiateRow = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let creator_id: Option<String> = tx
          .query_row(
            "SELECT creator_id FROM contents WHERE content_id = ?1",
            params![content_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(creator_id) = creator_id else {
          return Ok(InitiateRow::NoContent);
        };

        let session_exists: bool = tx
          .query_row(
            "SELECT 1 FROM buyer_sessions WHERE session_id = ?1",
            params![session_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !session_exists {
          return Ok(InitiateRow::NoSession);
        }

        tx.execute(
          "INSERT INTO purchases (
             purchase_id, content_id, creator_id, session_id, amount_cents,
             currency, status, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7)",
          params![
            id_str, content_str, creator_id, session_str, amount, currency,
            at_str,
          ],
        )?;
        tx.commit()?;
        Ok(InitiateRow::Inserted { creator_id })
      })
      .await?;

    let creator_id = match row {
      InitiateRow::Inserted { creator_id } => decode_uuid(&creator_id)?,
      InitiateRow::NoContent => {
        return Err(Error::ContentNotFound(input.content_id));
      }
      InitiateRow::NoSession => {
        return Err(Error::SessionNotFound(input.session_id));
      }
    };

    Ok(Purchase {
      purchase_id,
      content_id: input.content_id,
      creator_id,
      session_id: input.session_id,
      amount_cents: input.amount_cents,
      currency: input.currency,
      status: PurchaseStatus::Pending,
      payment_intent_id: None,
      access_token: None,
      access_expires_at: None,
      base_price_cents: None,
      creator_share_cents: None,
      view_count: 0,
      last_viewed_at: None,
      earnings_pending_until: None,
      earnings_released: false,
      failure_reason: None,
      created_at,
      completed_at: None,
    })
  }

  async fn get_purchase(&self, purchase_id: Uuid) -> Result<Option<Purchase>> {
    let id_str = encode_uuid(purchase_id);

    let raw: Option<RawPurchase> = self
      .conn
      .call(move |conn| Ok(purchase_by_id(conn, &id_str)?))
      .await?;

    raw.map(RawPurchase::into_purchase).transpose()
  }

  async fn complete_purchase(
    &self,
    purchase_id: Uuid,
    payment_intent_id: String,
  ) -> Result<Purchase> {
    let id_str = encode_uuid(purchase_id);
    let now = Utc::now();
    let now_str = encode_dt(now);
    let pending_until_str = encode_dt(now + self.policy.hold_period);
    let policy = self.policy;
    // Generated up front; discarded if the purchase was already completed.
    let access_token = opaque_token();

    let row: Option<TransitionRow> = self
      .conn
      .call(move |conn| {
        let tx =
          conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(found) = purchase_by_id(&tx, &id_str)? else {
          return Ok(None);
        };

        match found.status.as_str() {
          // At-least-once webhook delivery: a repeat confirmation is a
          // no-op, not an error.
          "completed" => Ok(Some(TransitionRow::Applied(found))),
          "pending" => {
            let (base_price, ttl_days): (Option<i64>, Option<i64>) = tx
              .query_row(
                "SELECT base_price_cents, access_ttl_days FROM contents
                 WHERE content_id = ?1",
                params![found.content_id],
                |r| Ok((r.get(0)?, r.get(1)?)),
              )?;

            let share =
              policy.creator_share_cents(found.amount_cents, base_price);
            let expires_str =
              ttl_days.map(|d| encode_dt(now + Duration::days(d)));

            tx.execute(
              "UPDATE purchases
               SET status = 'completed', payment_intent_id = ?1,
                   access_token = ?2, access_expires_at = ?3,
                   base_price_cents = ?4, creator_share_cents = ?5,
                   earnings_pending_until = ?6, completed_at = ?7
               WHERE purchase_id = ?8",
              params![
                payment_intent_id,
                access_token,
                expires_str,
                base_price,
                share,
                pending_until_str,
                now_str,
                id_str,
              ],
            )?;

            let updated = purchase_by_id(&tx, &id_str)?
              .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            tx.commit()?;
            Ok(Some(TransitionRow::Applied(updated)))
          }
          other => Ok(Some(TransitionRow::Invalid(other.to_owned()))),
        }
      })
      .await?;

    match row {
      None => Err(Error::PurchaseNotFound(purchase_id)),
      Some(TransitionRow::Applied(raw)) => raw.into_purchase(),
      Some(TransitionRow::Invalid(from)) => Err(Error::InvalidTransition {
        purchase: purchase_id,
        from:     decode_status(&from)?,
        to:       PurchaseStatus::Completed,
      }),
    }
  }

  async fn fail_purchase(
    &self,
    purchase_id: Uuid,
    reason: Option<String>,
  ) -> Result<Purchase> {
    let id_str = encode_uuid(purchase_id);

    let row: Option<TransitionRow> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let Some(found) = purchase_by_id(&tx, &id_str)? else {
          return Ok(None);
        };

        match found.status.as_str() {
          "failed" => Ok(Some(TransitionRow::Applied(found))),
          "pending" => {
            tx.execute(
              "UPDATE purchases SET status = 'failed', failure_reason = ?1
               WHERE purchase_id = ?2",
              params![reason, id_str],
            )?;
            let updated = purchase_by_id(&tx, &id_str)?
              .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            tx.commit()?;
            Ok(Some(TransitionRow::Applied(updated)))
          }
          other => Ok(Some(TransitionRow::Invalid(other.to_owned()))),
        }
      })
      .await?;

    match row {
      None => Err(Error::PurchaseNotFound(purchase_id)),
      Some(TransitionRow::Applied(raw)) => raw.into_purchase(),
      Some(TransitionRow::Invalid(from)) => Err(Error::InvalidTransition {
        purchase: purchase_id,
        from:     decode_status(&from)?,
        to:       PurchaseStatus::Failed,
      }),
    }
  }

  async fn refund_purchase(&self, purchase_id: Uuid) -> Result<Purchase> {
    let id_str = encode_uuid(purchase_id);

    let row: Option<TransitionRow> = self
      .conn
      .call(move |conn| {
        let tx =
          conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(found) = purchase_by_id(&tx, &id_str)? else {
          return Ok(None);
        };

        match found.status.as_str() {
          "refunded" => Ok(Some(TransitionRow::Applied(found))),
          "completed" => {
            tx.execute(
              "UPDATE purchases SET status = 'refunded'
               WHERE purchase_id = ?1",
              params![id_str],
            )?;
            let updated = purchase_by_id(&tx, &id_str)?
              .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            tx.commit()?;
            Ok(Some(TransitionRow::Applied(updated)))
          }
          other => Ok(Some(TransitionRow::Invalid(other.to_owned()))),
        }
      })
      .await?;

    match row {
      None => Err(Error::PurchaseNotFound(purchase_id)),
      Some(TransitionRow::Applied(raw)) => raw.into_purchase(),
      Some(TransitionRow::Invalid(from)) => Err(Error::InvalidTransition {
        purchase: purchase_id,
        from:     decode_status(&from)?,
        to:       PurchaseStatus::Refunded,
      }),
    }
  }

  // ── Access verification ───────────────────────────────────────────────────

  async fn verify_access(
    &self,
    access_token: &str,
    session_token: Option<&str>,
  ) -> Result<AccessOutcome> {
    let token = access_token.to_owned();
    let presented = session_token.map(str::to_owned);
    let now_str = encode_dt(Utc::now());

    let raw: RawAccess = self
      .conn
      .call(move |conn| {
        let tx =
          conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let found = tx
          .query_row(
            "SELECT p.purchase_id, p.content_id, p.creator_id, p.status,
                    p.access_expires_at, p.view_count,
                    c.title, c.media_key, s.session_token
             FROM purchases p
             JOIN contents       c ON c.content_id = p.content_id
             JOIN buyer_sessions s ON s.session_id = p.session_id
             WHERE p.access_token = ?1",
            params![token],
            |r| {
              Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, Option<String>>(4)?,
                r.get::<_, i64>(5)?,
                r.get::<_, String>(6)?,
                r.get::<_, String>(7)?,
                r.get::<_, String>(8)?,
              ))
            },
          )
          .optional()?;

        let Some((
          purchase_id,
          content_id,
          creator_id,
          status,
          access_expires_at,
          view_count,
          title,
          media_key,
          owner_token,
        )) = found
        else {
          return Ok(RawAccess::Denied(AccessDenied::NotFound));
        };

        if status != "completed" {
          return Ok(RawAccess::Denied(AccessDenied::NotCompleted));
        }
        if let Some(presented) = presented.as_deref() {
          if presented != owner_token {
            return Ok(RawAccess::Denied(AccessDenied::SessionMismatch));
          }
        }
        if let Some(expires) = access_expires_at.as_deref() {
          if *expires <= *now_str {
            return Ok(RawAccess::Denied(AccessDenied::Expired));
          }
        }

        // Meter the view. Both increments happen SQL-side so concurrent
        // views of the same purchase never lose counts.
        tx.execute(
          "UPDATE purchases
           SET view_count = view_count + 1, last_viewed_at = ?1
           WHERE purchase_id = ?2",
          params![now_str, purchase_id],
        )?;
        tx.execute(
          "UPDATE contents SET view_count = view_count + 1
           WHERE content_id = ?1",
          params![content_id],
        )?;
        tx.commit()?;

        Ok(RawAccess::Granted {
          purchase_id,
          content_id,
          creator_id,
          title,
          media_key,
          view_count: view_count + 1,
          access_expires_at,
        })
      })
      .await?;

    match raw {
      RawAccess::Denied(denied) => Ok(AccessOutcome::Denied(denied)),
      RawAccess::Granted {
        purchase_id,
        content_id,
        creator_id,
        title,
        media_key,
        view_count,
        access_expires_at,
      } => Ok(AccessOutcome::Granted(ContentGrant {
        purchase_id: decode_uuid(&purchase_id)?,
        content_id: decode_uuid(&content_id)?,
        creator_id: decode_uuid(&creator_id)?,
        title,
        media_key,
        view_count,
        access_expires_at: crate::encode::decode_dt_opt(
          access_expires_at.as_deref(),
        )?,
      })),
    }
  }

  // ── Balances & payouts ────────────────────────────────────────────────────

  async fn creator_balance(&self, creator_id: Uuid) -> Result<CreatorBalance> {
    let id_str = encode_uuid(creator_id);

    let sums: Option<(String, i64, i64, i64)> = self
      .conn
      .call(move |conn| {
        let currency: Option<String> = conn
          .query_row(
            "SELECT currency FROM creators WHERE creator_id = ?1",
            params![id_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(currency) = currency else {
          return Ok(None);
        };

        // Lifetime and pending come from one statement so they can never
        // disagree about a row's release flag.
        let (lifetime, pending): (i64, i64) = conn.query_row(
          "SELECT
             COALESCE(SUM(creator_share_cents), 0),
             COALESCE(SUM(CASE WHEN earnings_released = 0
                               THEN creator_share_cents ELSE 0 END), 0)
           FROM purchases
           WHERE creator_id = ?1 AND status = 'completed'",
          params![id_str],
          |r| Ok((r.get(0)?, r.get(1)?)),
        )?;

        let payouts: i64 = conn.query_row(
          "SELECT COALESCE(SUM(amount_cents), 0) FROM payouts
           WHERE creator_id = ?1",
          params![id_str],
          |r| r.get(0),
        )?;

        Ok(Some((currency, lifetime, pending, payouts)))
      })
      .await?;

    let (currency, lifetime, pending, payouts) =
      sums.ok_or(Error::CreatorNotFound(creator_id))?;

    Ok(CreatorBalance::derive(
      creator_id, currency, lifetime, pending, payouts,
    ))
  }

  async fn record_payout(
    &self,
    creator_id: Uuid,
    amount_cents: i64,
  ) -> Result<Payout> {
    let payout = Payout {
      payout_id: Uuid::new_v4(),
      creator_id,
      amount_cents,
      completed_at: Utc::now(),
    };

    let id_str = encode_uuid(payout.payout_id);
    let creator_str = encode_uuid(creator_id);
    let at_str = encode_dt(payout.completed_at);

    let inserted: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let creator_exists: bool = tx
          .query_row(
            "SELECT 1 FROM creators WHERE creator_id = ?1",
            params![creator_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !creator_exists {
          return Ok(false);
        }

        tx.execute(
          "INSERT INTO payouts (payout_id, creator_id, amount_cents, completed_at)
           VALUES (?1, ?2, ?3, ?4)",
          params![id_str, creator_str, amount_cents, at_str],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(Error::CreatorNotFound(creator_id));
    }
    Ok(payout)
  }

  // ── Earnings release ──────────────────────────────────────────────────────

  async fn due_releases(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
    let now_str = encode_dt(now);

    let ids: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT purchase_id FROM purchases
           WHERE status = 'completed' AND earnings_released = 0
             AND earnings_pending_until <= ?1
           ORDER BY earnings_pending_until ASC",
        )?;
        let rows = stmt
          .query_map(params![now_str], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    ids.iter().map(|s| decode_uuid(s)).collect()
  }

  async fn release_earnings(
    &self,
    purchase_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<ReleaseOutcome> {
    let id_str = encode_uuid(purchase_id);
    let now_str = encode_dt(now);

    let raw: Option<RawRelease> = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock before the precondition re-check,
        // so a concurrent refund or overlapping run is serialised here.
        let tx =
          conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx.execute(
          "UPDATE purchases SET earnings_released = 1
           WHERE purchase_id = ?1 AND status = 'completed'
             AND earnings_released = 0 AND earnings_pending_until <= ?2",
          params![id_str, now_str],
        )?;

        if changed == 0 {
          let exists: bool = tx
            .query_row(
              "SELECT 1 FROM purchases WHERE purchase_id = ?1",
              params![id_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
          return if exists { Ok(Some(RawRelease::Skipped)) } else { Ok(None) };
        }

        let (creator_id, share): (String, Option<i64>) = tx.query_row(
          "SELECT creator_id, creator_share_cents FROM purchases
           WHERE purchase_id = ?1",
          params![id_str],
          |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        tx.commit()?;

        Ok(Some(RawRelease::Released {
          creator_id,
          amount_cents: share.unwrap_or(0),
        }))
      })
      .await?;

    match raw {
      None => Err(Error::PurchaseNotFound(purchase_id)),
      Some(RawRelease::Skipped) => Ok(ReleaseOutcome::Skipped),
      Some(RawRelease::Released { creator_id, amount_cents }) => {
        Ok(ReleaseOutcome::Released {
          creator_id: decode_uuid(&creator_id)?,
          amount_cents,
        })
      }
    }
  }
}
