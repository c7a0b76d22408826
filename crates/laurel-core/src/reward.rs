//! Rewards and the redemption state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Stock ───────────────────────────────────────────────────────────────────

/// Remaining stock for a reward. `Unlimited` is never decremented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "count", rename_all = "snake_case")]
pub enum Stock {
  Limited(u32),
  Unlimited,
}

impl Stock {
  pub fn is_exhausted(&self) -> bool { matches!(self, Self::Limited(0)) }
}

// ─── Reward ──────────────────────────────────────────────────────────────────

/// A redeemable reward in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reward {
  pub reward_id:    Uuid,
  pub reward_name:  String,
  pub points_cost:  i64,
  pub stock:        Stock,
  pub is_available: bool,
  pub created_date: DateTime<Utc>,
}

/// Input to [`crate::store::RewardStore::create_reward`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReward {
  pub reward_name: String,
  pub points_cost: i64,
  pub stock:       Stock,
}

impl NewReward {
  pub fn validate(&self) -> crate::Result<()> {
    if self.reward_name.trim().is_empty() {
      return Err(crate::Error::Validation(
        "reward_name must not be empty".into(),
      ));
    }
    if self.points_cost <= 0 {
      return Err(crate::Error::Validation(
        "points_cost must be positive".into(),
      ));
    }
    Ok(())
  }
}

/// Partial edit for [`crate::store::RewardStore::update_reward`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewardUpdate {
  pub reward_name:  Option<String>,
  pub points_cost:  Option<i64>,
  pub stock:        Option<Stock>,
  pub is_available: Option<bool>,
}

// ─── Redemption ──────────────────────────────────────────────────────────────

/// Redemption lifecycle. `Fulfilled` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedemptionStatus {
  Pending,
  Approved,
  Fulfilled,
  Cancelled,
}

impl RedemptionStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Approved => "approved",
      Self::Fulfilled => "fulfilled",
      Self::Cancelled => "cancelled",
    }
  }

  /// Whether the state machine permits moving from `self` to `to`.
  pub fn can_transition_to(&self, to: RedemptionStatus) -> bool {
    matches!(
      (self, to),
      (Self::Pending, Self::Approved)
        | (Self::Approved, Self::Fulfilled)
        | (Self::Pending, Self::Cancelled)
        | (Self::Approved, Self::Cancelled)
    )
  }
}

/// A redemption request. `points_spent` is a copy of the reward's cost at
/// redemption time and is never re-read from the live reward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Redemption {
  pub redemption_id: Uuid,
  pub reward_id:     Uuid,
  pub user_email:    String,
  pub points_spent:  i64,
  pub status:        RedemptionStatus,
  pub created_date:  DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// Input to [`crate::store::RewardStore::redeem`].
#[derive(Debug, Clone)]
pub struct NewRedemption {
  pub reward_id:    Uuid,
  pub user_email:   String,
  /// Frozen from the reward's cost by the workflow, not by the caller.
  pub points_spent: i64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn state_machine_allows_only_documented_transitions() {
    use RedemptionStatus::*;

    assert!(Pending.can_transition_to(Approved));
    assert!(Approved.can_transition_to(Fulfilled));
    assert!(Pending.can_transition_to(Cancelled));
    assert!(Approved.can_transition_to(Cancelled));

    assert!(!Pending.can_transition_to(Fulfilled));
    assert!(!Fulfilled.can_transition_to(Cancelled));
    assert!(!Cancelled.can_transition_to(Pending));
    assert!(!Fulfilled.can_transition_to(Approved));
  }
}
