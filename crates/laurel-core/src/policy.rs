//! Injectable tier and streak policies.
//!
//! Thresholds and the streak window are deployment configuration, not
//! hard-coded tables, so they can be tuned without touching the evaluator
//! or the executor.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::points::Tier;

// ─── Tier policy ─────────────────────────────────────────────────────────────

/// Total-points thresholds for each tier above bronze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPolicy {
  pub silver:   i64,
  pub gold:     i64,
  pub platinum: i64,
}

impl Default for TierPolicy {
  fn default() -> Self {
    Self { silver: 500, gold: 1500, platinum: 3000 }
  }
}

impl TierPolicy {
  /// The tier a given total maps to. Pure.
  pub fn tier_for(&self, total_points: i64) -> Tier {
    if total_points >= self.platinum {
      Tier::Platinum
    } else if total_points >= self.gold {
      Tier::Gold
    } else if total_points >= self.silver {
      Tier::Silver
    } else {
      Tier::Bronze
    }
  }
}

// ─── Streak policy ───────────────────────────────────────────────────────────

/// Window within which a qualifying action continues a streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakPolicy {
  pub window_hours: i64,
}

impl Default for StreakPolicy {
  fn default() -> Self { Self { window_hours: 48 } }
}

impl StreakPolicy {
  /// Next streak value given the previous qualifying date and streak.
  ///
  /// Same calendar day keeps the current streak; a later day within the
  /// window increments it; anything else resets to 1.
  pub fn next_streak(
    &self,
    last_activity: Option<NaiveDate>,
    current_streak: u32,
    now: DateTime<Utc>,
  ) -> u32 {
    let today = now.date_naive();
    match last_activity {
      Some(last) if last == today => current_streak.max(1),
      Some(last) => {
        let elapsed = today.signed_duration_since(last);
        if elapsed.num_hours() <= self.window_hours {
          current_streak + 1
        } else {
          1
        }
      }
      None => 1,
    }
  }
}

/// Bundle threaded into the executor.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
  #[serde(default)]
  pub tiers:  TierPolicy,
  #[serde(default)]
  pub streak: StreakPolicy,
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;

  #[test]
  fn tier_thresholds() {
    let policy = TierPolicy::default();
    assert_eq!(policy.tier_for(0), Tier::Bronze);
    assert_eq!(policy.tier_for(499), Tier::Bronze);
    assert_eq!(policy.tier_for(500), Tier::Silver);
    assert_eq!(policy.tier_for(1500), Tier::Gold);
    assert_eq!(policy.tier_for(3000), Tier::Platinum);
    assert_eq!(policy.tier_for(50_000), Tier::Platinum);
  }

  #[test]
  fn streak_continues_within_window() {
    let policy = StreakPolicy::default();
    let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
    let yesterday = (now - Duration::days(1)).date_naive();
    assert_eq!(policy.next_streak(Some(yesterday), 3, now), 4);
  }

  #[test]
  fn streak_same_day_is_unchanged() {
    let policy = StreakPolicy::default();
    let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
    assert_eq!(policy.next_streak(Some(now.date_naive()), 3, now), 3);
    // A same-day action with no recorded streak still counts as day one.
    assert_eq!(policy.next_streak(Some(now.date_naive()), 0, now), 1);
  }

  #[test]
  fn streak_resets_after_gap() {
    let policy = StreakPolicy::default();
    let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
    let three_days_ago = (now - Duration::days(3)).date_naive();
    assert_eq!(policy.next_streak(Some(three_days_ago), 9, now), 1);
  }

  #[test]
  fn streak_starts_at_one() {
    let policy = StreakPolicy::default();
    assert_eq!(policy.next_streak(None, 0, Utc::now()), 1);
  }
}
