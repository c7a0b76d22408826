//! Badges and badge awards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Badge ───────────────────────────────────────────────────────────────────

/// A badge definition. `points_value` is granted alongside the badge the
/// first (and only) time a user earns it; zero is allowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Badge {
  pub badge_id:     Uuid,
  pub badge_name:   String,
  pub points_value: i64,
  pub is_active:    bool,
  pub created_date: DateTime<Utc>,
}

/// Input to [`crate::store::BadgeStore::create_badge`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBadge {
  pub badge_name:   String,
  #[serde(default)]
  pub points_value: i64,
}

/// Partial edit for [`crate::store::BadgeStore::update_badge`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BadgeUpdate {
  pub badge_name:   Option<String>,
  pub points_value: Option<i64>,
  pub is_active:    Option<bool>,
}

// ─── Award ───────────────────────────────────────────────────────────────────

/// Who granted a badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AwardedBy {
  /// Granted by a matching rule.
  System,
  /// Granted directly by an administrator.
  Admin { email: String },
}

/// A badge granted to a user. At most one exists per
/// (`user_email`, `badge_id`) pair; the store enforces this with a unique
/// constraint and duplicate attempts are reported as `None`, not errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeAward {
  pub award_id:     Uuid,
  pub user_email:   String,
  pub badge_id:     Uuid,
  pub awarded_by:   AwardedBy,
  pub reason:       String,
  pub awarded_date: DateTime<Utc>,
}

/// Input to [`crate::store::BadgeStore::try_create_award`].
#[derive(Debug, Clone)]
pub struct NewBadgeAward {
  pub user_email: String,
  pub badge_id:   Uuid,
  pub awarded_by: AwardedBy,
  pub reason:     String,
}
