//! Advisory suggestions proposed by the analysis pipeline.
//!
//! Suggestions never mutate live rules themselves; they carry a typed diff
//! that only an explicit admin `implement` action translates into repository
//! writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  badge::{BadgeUpdate, NewBadge},
  reward::{NewReward, RewardUpdate},
  rule::{NewRule, RuleUpdate},
};

// ─── Status ──────────────────────────────────────────────────────────────────

/// `Pending → Approved → Implemented`, or `Rejected` (terminal) from pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
  Pending,
  Approved,
  Implemented,
  Rejected,
}

impl SuggestionStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Approved => "approved",
      Self::Implemented => "implemented",
      Self::Rejected => "rejected",
    }
  }
}

// ─── Proposed changes ────────────────────────────────────────────────────────

/// The structured diff a suggestion proposes. A closed union: implementing a
/// suggestion is an exhaustive match, so every reachable mutation is visible
/// here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum ProposedChange {
  CreateRule(NewRule),
  UpdateRule { rule_id: Uuid, update: RuleUpdate },
  DeactivateRule { rule_id: Uuid },
  CreateBadge(NewBadge),
  UpdateBadge { badge_id: Uuid, update: BadgeUpdate },
  CreateReward(NewReward),
  UpdateReward { reward_id: Uuid, update: RewardUpdate },
}

/// Category label carried for admin filtering; purely descriptive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
  NewRule,
  RuleAdjustment,
  NewBadge,
  BadgeAdjustment,
  NewReward,
  RewardAdjustment,
}

impl SuggestionType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::NewRule => "new_rule",
      Self::RuleAdjustment => "rule_adjustment",
      Self::NewBadge => "new_badge",
      Self::BadgeAdjustment => "badge_adjustment",
      Self::NewReward => "new_reward",
      Self::RewardAdjustment => "reward_adjustment",
    }
  }
}

// ─── Suggestion ──────────────────────────────────────────────────────────────

/// A persisted suggestion awaiting admin review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
  pub suggestion_id:    Uuid,
  pub suggestion_type:  SuggestionType,
  pub title:            String,
  pub description:      String,
  /// Clamped to `[0, 1]` when the suggestion is recorded.
  pub confidence_score: f64,
  pub proposed_change:  ProposedChange,
  pub status:           SuggestionStatus,
  pub created_date:     DateTime<Utc>,
  pub reviewed_by:      Option<String>,
  pub reviewed_at:      Option<DateTime<Utc>>,
}

/// A proposal produced by an advisor, before persistence assigns identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftSuggestion {
  pub suggestion_type:  SuggestionType,
  pub title:            String,
  pub description:      String,
  pub confidence_score: f64,
  pub proposed_change:  ProposedChange,
}

// ─── Signals ─────────────────────────────────────────────────────────────────

/// Aggregated engagement signals the analysis step reads. Already-computed
/// data only; gathering them performs no writes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngagementSignals {
  pub total_users:        u64,
  pub active_users:       u64,
  pub points_awarded:     i64,
  pub badge_awards:       u64,
  pub redemptions:        u64,
  /// Per active rule: how many times it was applied in the window.
  pub rule_hits:          Vec<RuleHits>,
  /// Per active badge: fraction of users holding it (0–1).
  pub badge_saturation:   Vec<BadgeSaturation>,
  /// The look-back window the counts cover.
  pub window_days:        u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleHits {
  pub rule_id:   Uuid,
  pub rule_name: String,
  pub hits:      u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeSaturation {
  pub badge_id:   Uuid,
  pub badge_name: String,
  pub saturation: f64,
}
