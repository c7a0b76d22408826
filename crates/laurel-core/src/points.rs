//! Per-user aggregate point state — a materialized view over the ledger.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ─── Tier ────────────────────────────────────────────────────────────────────

/// Derived classification computed from total points against the configured
/// thresholds. Ordered so tiers can be compared directly.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Default,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
  #[default]
  Bronze,
  Silver,
  Gold,
  Platinum,
}

impl Tier {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Bronze => "bronze",
      Self::Silver => "silver",
      Self::Gold => "gold",
      Self::Platinum => "platinum",
    }
  }
}

// ─── Aggregate ───────────────────────────────────────────────────────────────

/// One row per user; always reconcilable by replaying that user's ledger
/// entries. Recomputed after every award or redemption, and safe to recompute
/// redundantly since it is a pure fold over the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPoints {
  pub user_email:         String,
  /// Cache of the ledger sum.
  pub total_points:       i64,
  pub tier:               Tier,
  pub current_streak:     u32,
  /// Calendar date of the last qualifying action, used by the streak policy.
  pub last_activity_date: Option<NaiveDate>,
  /// Count of distinct badges awarded to this user.
  pub badges_earned:      u32,
  pub updated_at:         DateTime<Utc>,
}

impl UserPoints {
  /// The zero-state aggregate for a user with no ledger history.
  pub fn empty(user_email: impl Into<String>, now: DateTime<Utc>) -> Self {
    Self {
      user_email:         user_email.into(),
      total_points:       0,
      tier:               Tier::Bronze,
      current_streak:     0,
      last_activity_date: None,
      badges_earned:      0,
      updated_at:         now,
    }
  }
}
