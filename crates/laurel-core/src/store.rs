//! Store traits implemented by storage backends (e.g. `laurel-store-sqlite`).
//!
//! The engine and API depend on these abstractions, not on any concrete
//! backend. All traits share [`crate::Error`] so callers can act on the
//! taxonomy (conflicts as no-ops, transient faults as retryable) without
//! knowing the backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  Result,
  badge::{Badge, BadgeAward, BadgeUpdate, NewBadge, NewBadgeAward},
  ledger::{IdempotencyKey, LedgerEntry, NewLedgerEntry},
  points::UserPoints,
  reward::{NewRedemption, NewReward, Redemption, RedemptionStatus, Reward, RewardUpdate},
  rule::{NewRule, Rule, RuleUpdate, TriggerEvent},
  suggestion::{DraftSuggestion, Suggestion, SuggestionStatus},
};

// ─── Rules ───────────────────────────────────────────────────────────────────

/// Repository of rule definitions. Rules are soft-deactivated, never
/// hard-deleted, so ledger references stay resolvable.
pub trait RuleStore: Send + Sync {
  fn create_rule(
    &self,
    input: NewRule,
  ) -> impl Future<Output = Result<Rule>> + Send + '_;

  fn update_rule(
    &self,
    rule_id: Uuid,
    update: RuleUpdate,
  ) -> impl Future<Output = Result<Rule>> + Send + '_;

  /// Set `is_active = false`. Idempotent.
  fn deactivate_rule(
    &self,
    rule_id: Uuid,
  ) -> impl Future<Output = Result<Rule>> + Send + '_;

  fn get_rule(
    &self,
    rule_id: Uuid,
  ) -> impl Future<Output = Result<Option<Rule>>> + Send + '_;

  fn list_rules(&self) -> impl Future<Output = Result<Vec<Rule>>> + Send + '_;

  /// Active rules for a trigger, ordered by ascending priority then by
  /// creation date (stable tie-break).
  fn list_active(
    &self,
    trigger_event: TriggerEvent,
  ) -> impl Future<Output = Result<Vec<Rule>>> + Send + '_;
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

/// The append-only point ledger. No update or delete operation exists.
pub trait LedgerStore: Send + Sync {
  /// Append an entry. When `key` is given, the marker and the entry are
  /// written under a single atomic operation; if the marker already exists
  /// the append is a no-op and `None` is returned. This is the at-most-once
  /// guarantee replayed triggers rely on.
  fn append(
    &self,
    entry: NewLedgerEntry,
    key: Option<IdempotencyKey>,
  ) -> impl Future<Output = Result<Option<LedgerEntry>>> + Send + '_;

  /// Sum of all entries for a user — the authoritative balance.
  fn sum_for(
    &self,
    user_email: &str,
  ) -> impl Future<Output = Result<i64>> + Send + '_;

  /// Full history for a user, newest first.
  fn entries_for(
    &self,
    user_email: &str,
  ) -> impl Future<Output = Result<Vec<LedgerEntry>>> + Send + '_;

  /// Timestamps at which a rule was applied to a user, newest first.
  /// Consulted by frequency limits.
  fn rule_applications(
    &self,
    rule_id: Uuid,
    user_email: &str,
  ) -> impl Future<Output = Result<Vec<DateTime<Utc>>>> + Send + '_;

  /// All entries recorded after `cutoff`; input to the suggestion signals.
  fn entries_since(
    &self,
    cutoff: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<LedgerEntry>>> + Send + '_;
}

// ─── Badges ──────────────────────────────────────────────────────────────────

pub trait BadgeStore: Send + Sync {
  fn create_badge(
    &self,
    input: NewBadge,
  ) -> impl Future<Output = Result<Badge>> + Send + '_;

  fn update_badge(
    &self,
    badge_id: Uuid,
    update: BadgeUpdate,
  ) -> impl Future<Output = Result<Badge>> + Send + '_;

  fn get_badge(
    &self,
    badge_id: Uuid,
  ) -> impl Future<Output = Result<Option<Badge>>> + Send + '_;

  fn list_badges(&self) -> impl Future<Output = Result<Vec<Badge>>> + Send + '_;

  fn award_exists(
    &self,
    user_email: &str,
    badge_id: Uuid,
  ) -> impl Future<Output = Result<bool>> + Send + '_;

  /// Create an award unless the (`user_email`, `badge_id`) pair already
  /// exists. A duplicate returns `None`; it is a no-op, not an error, and
  /// callers must also skip the badge's `points_value`.
  fn try_create_award(
    &self,
    input: NewBadgeAward,
  ) -> impl Future<Output = Result<Option<BadgeAward>>> + Send + '_;

  fn awards_for(
    &self,
    user_email: &str,
  ) -> impl Future<Output = Result<Vec<BadgeAward>>> + Send + '_;

  /// All awards recorded after `cutoff`; input to the suggestion signals.
  fn awards_since(
    &self,
    cutoff: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<BadgeAward>>> + Send + '_;
}

// ─── Aggregates ──────────────────────────────────────────────────────────────

/// The per-user materialized view. Derived state only: it can always be
/// rebuilt from the ledger and badge stores.
pub trait PointsStore: Send + Sync {
  fn get_points(
    &self,
    user_email: &str,
  ) -> impl Future<Output = Result<Option<UserPoints>>> + Send + '_;

  fn upsert_points(
    &self,
    points: UserPoints,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  fn list_points(
    &self,
  ) -> impl Future<Output = Result<Vec<UserPoints>>> + Send + '_;
}

// ─── Rewards & redemptions ───────────────────────────────────────────────────

pub trait RewardStore: Send + Sync {
  fn create_reward(
    &self,
    input: NewReward,
  ) -> impl Future<Output = Result<Reward>> + Send + '_;

  fn update_reward(
    &self,
    reward_id: Uuid,
    update: RewardUpdate,
  ) -> impl Future<Output = Result<Reward>> + Send + '_;

  fn get_reward(
    &self,
    reward_id: Uuid,
  ) -> impl Future<Output = Result<Option<Reward>>> + Send + '_;

  fn list_available(
    &self,
  ) -> impl Future<Output = Result<Vec<Reward>>> + Send + '_;

  /// Atomically: decrement finite stock (conditional on `stock > 0`), create
  /// the redemption, and append the debit entry — all or nothing. A lost
  /// stock race fails with [`crate::Error::OutOfStock`] before any write.
  fn redeem(
    &self,
    input: NewRedemption,
    debit: NewLedgerEntry,
  ) -> impl Future<Output = Result<Redemption>> + Send + '_;

  fn get_redemption(
    &self,
    redemption_id: Uuid,
  ) -> impl Future<Output = Result<Option<Redemption>>> + Send + '_;

  /// Guarded status change; fails with
  /// [`crate::Error::InvalidTransition`] unless the state machine allows it.
  fn transition_redemption(
    &self,
    redemption_id: Uuid,
    to: RedemptionStatus,
  ) -> impl Future<Output = Result<Redemption>> + Send + '_;

  /// Atomically cancel a pending/approved redemption: restore one unit of
  /// finite stock and append the compensating refund entry.
  fn cancel_redemption(
    &self,
    redemption_id: Uuid,
    refund: NewLedgerEntry,
  ) -> impl Future<Output = Result<Redemption>> + Send + '_;

  fn redemptions_for(
    &self,
    user_email: &str,
  ) -> impl Future<Output = Result<Vec<Redemption>>> + Send + '_;
}

// ─── Suggestions ─────────────────────────────────────────────────────────────

pub trait SuggestionStore: Send + Sync {
  fn create_suggestion(
    &self,
    draft: DraftSuggestion,
  ) -> impl Future<Output = Result<Suggestion>> + Send + '_;

  fn get_suggestion(
    &self,
    suggestion_id: Uuid,
  ) -> impl Future<Output = Result<Option<Suggestion>>> + Send + '_;

  fn list_suggestions(
    &self,
    status: Option<SuggestionStatus>,
  ) -> impl Future<Output = Result<Vec<Suggestion>>> + Send + '_;

  /// Conditional status change: succeeds only while the current status is
  /// `from`, so concurrent reviews cannot double-apply.
  fn transition_suggestion(
    &self,
    suggestion_id: Uuid,
    from: SuggestionStatus,
    to: SuggestionStatus,
    reviewed_by: Option<String>,
  ) -> impl Future<Output = Result<Suggestion>> + Send + '_;
}

// ─── Umbrella ────────────────────────────────────────────────────────────────

/// Convenience bound for components that need the whole store surface.
pub trait EngineStore:
  RuleStore
  + LedgerStore
  + BadgeStore
  + PointsStore
  + RewardStore
  + SuggestionStore
{
}

impl<T> EngineStore for T where
  T: RuleStore
    + LedgerStore
    + BadgeStore
    + PointsStore
    + RewardStore
    + SuggestionStore
{
}
