//! SQL schema for the Laurel SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS rules (
    rule_id              TEXT PRIMARY KEY,
    rule_name            TEXT NOT NULL,
    scope_json           TEXT NOT NULL,   -- JSON-encoded RuleScope
    trigger_event        TEXT NOT NULL,
    conditions_json      TEXT NOT NULL,   -- JSON array of conditions
    logic                TEXT NOT NULL,   -- 'AND' | 'OR'
    award_points         INTEGER NOT NULL,
    badge_id             TEXT REFERENCES badges(badge_id),
    priority             INTEGER NOT NULL,
    frequency_limit      TEXT NOT NULL,
    multipliers_json     TEXT NOT NULL,
    notify_on_award      INTEGER NOT NULL,
    notification_message TEXT,
    is_active            INTEGER NOT NULL DEFAULT 1,
    created_date         TEXT NOT NULL    -- ISO 8601 UTC; server-assigned
);

-- The ledger is strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS ledger (
    entry_id         TEXT PRIMARY KEY,
    user_email       TEXT NOT NULL,
    amount           INTEGER NOT NULL,   -- signed; negative for debits
    transaction_type TEXT NOT NULL,
    reference_type   TEXT,
    reference_id     TEXT,
    description      TEXT NOT NULL,
    created_date     TEXT NOT NULL
);

-- Idempotency markers. One row per applied (trigger, rule, user) triple,
-- written in the same transaction as the ledger entry it guards.
CREATE TABLE IF NOT EXISTS rule_executions (
    idem_key            TEXT PRIMARY KEY,
    trigger_instance_id TEXT NOT NULL,
    rule_id             TEXT,            -- NULL for manual adjustments
    user_email          TEXT NOT NULL,
    recorded_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS badges (
    badge_id     TEXT PRIMARY KEY,
    badge_name   TEXT NOT NULL,
    points_value INTEGER NOT NULL,
    is_active    INTEGER NOT NULL DEFAULT 1,
    created_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS badge_awards (
    award_id        TEXT PRIMARY KEY,
    user_email      TEXT NOT NULL,
    badge_id        TEXT NOT NULL REFERENCES badges(badge_id),
    awarded_by_json TEXT NOT NULL,       -- JSON-encoded AwardedBy
    reason          TEXT NOT NULL,
    awarded_date    TEXT NOT NULL,
    UNIQUE (user_email, badge_id)
);

-- Materialized view over the ledger; rebuilt by the executor, never the
-- source of truth.
CREATE TABLE IF NOT EXISTS user_points (
    user_email         TEXT PRIMARY KEY,
    total_points       INTEGER NOT NULL,
    tier               TEXT NOT NULL,
    current_streak     INTEGER NOT NULL,
    last_activity_date TEXT,             -- calendar date, YYYY-MM-DD
    badges_earned      INTEGER NOT NULL,
    updated_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS rewards (
    reward_id      TEXT PRIMARY KEY,
    reward_name    TEXT NOT NULL,
    points_cost    INTEGER NOT NULL,
    stock_quantity INTEGER NOT NULL,     -- -1 = unlimited
    is_available   INTEGER NOT NULL DEFAULT 1,
    created_date   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS redemptions (
    redemption_id TEXT PRIMARY KEY,
    reward_id     TEXT NOT NULL REFERENCES rewards(reward_id),
    user_email    TEXT NOT NULL,
    points_spent  INTEGER NOT NULL,      -- frozen at redemption time
    status        TEXT NOT NULL,
    created_date  TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS suggestions (
    suggestion_id        TEXT PRIMARY KEY,
    suggestion_type      TEXT NOT NULL,
    title                TEXT NOT NULL,
    description          TEXT NOT NULL,
    confidence_score     REAL NOT NULL,
    proposed_change_json TEXT NOT NULL,  -- JSON-encoded ProposedChange
    status               TEXT NOT NULL,
    created_date         TEXT NOT NULL,
    reviewed_by          TEXT,
    reviewed_at          TEXT
);

CREATE INDEX IF NOT EXISTS rules_trigger_idx    ON rules(trigger_event, is_active);
CREATE INDEX IF NOT EXISTS ledger_user_idx      ON ledger(user_email);
CREATE INDEX IF NOT EXISTS ledger_ref_idx       ON ledger(reference_type, reference_id);
CREATE INDEX IF NOT EXISTS ledger_created_idx   ON ledger(created_date);
CREATE INDEX IF NOT EXISTS awards_user_idx      ON badge_awards(user_email);
CREATE INDEX IF NOT EXISTS redemptions_user_idx ON redemptions(user_email);
CREATE INDEX IF NOT EXISTS suggestions_status_idx ON suggestions(status);

PRAGMA user_version = 1;
";
