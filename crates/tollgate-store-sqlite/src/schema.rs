//! SQL schema for the Tollgate SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;

CREATE TABLE IF NOT EXISTS buyer_sessions (
    session_id         TEXT PRIMARY KEY,
    session_token      TEXT NOT NULL UNIQUE,
    fingerprint_digest TEXT,            -- SHA-256 hex; lookup hint only
    ip                 TEXT NOT NULL,
    user_agent         TEXT,
    created_at         TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    last_active_at     TEXT NOT NULL,
    expires_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS creators (
    creator_id             TEXT PRIMARY KEY,
    email_verified         INTEGER NOT NULL DEFAULT 0,
    verification_status    TEXT NOT NULL DEFAULT 'pending',
    payout_setup_completed INTEGER NOT NULL DEFAULT 0,
    currency               TEXT NOT NULL,
    created_at             TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS contents (
    content_id       TEXT PRIMARY KEY,
    creator_id       TEXT NOT NULL REFERENCES creators(creator_id),
    title            TEXT NOT NULL,
    media_key        TEXT NOT NULL,   -- object-storage pointer; bytes live elsewhere
    price_cents      INTEGER NOT NULL,
    base_price_cents INTEGER,
    currency         TEXT NOT NULL,
    access_ttl_days  INTEGER,
    view_count       INTEGER NOT NULL DEFAULT 0,
    created_at       TEXT NOT NULL
);

-- The authoritative ledger: one row per transaction, never deleted.
-- Only status, metering, and earnings fields ever change.
CREATE TABLE IF NOT EXISTS purchases (
    purchase_id            TEXT PRIMARY KEY,
    content_id             TEXT NOT NULL REFERENCES contents(content_id),
    creator_id             TEXT NOT NULL REFERENCES creators(creator_id),
    session_id             TEXT NOT NULL REFERENCES buyer_sessions(session_id),
    amount_cents           INTEGER NOT NULL,
    currency               TEXT NOT NULL,
    status                 TEXT NOT NULL DEFAULT 'pending',
                           -- 'pending' | 'completed' | 'failed' | 'refunded'
    payment_intent_id      TEXT,
    access_token           TEXT UNIQUE,     -- issued only at completion
    access_expires_at      TEXT,
    base_price_cents       INTEGER,
    creator_share_cents    INTEGER,         -- fee policy output, fixed at completion
    view_count             INTEGER NOT NULL DEFAULT 0,
    last_viewed_at         TEXT,
    earnings_pending_until TEXT,
    earnings_released      INTEGER NOT NULL DEFAULT 0,
    failure_reason         TEXT,
    created_at             TEXT NOT NULL,
    completed_at           TEXT
);

-- Completed payouts only; appended by the payout collaborator's callback.
CREATE TABLE IF NOT EXISTS payouts (
    payout_id    TEXT PRIMARY KEY,
    creator_id   TEXT NOT NULL REFERENCES creators(creator_id),
    amount_cents INTEGER NOT NULL,
    completed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS sessions_fingerprint_idx ON buyer_sessions(fingerprint_digest);
CREATE INDEX IF NOT EXISTS purchases_creator_idx    ON purchases(creator_id);
CREATE INDEX IF NOT EXISTS purchases_session_idx    ON purchases(session_id);
CREATE INDEX IF NOT EXISTS purchases_release_idx    ON purchases(earnings_pending_until)
    WHERE status = 'completed' AND earnings_released = 0;
CREATE INDEX IF NOT EXISTS payouts_creator_idx      ON payouts(creator_id);

PRAGMA user_version = 1;
";
