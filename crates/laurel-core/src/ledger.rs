//! Ledger entries — the append-only source of truth for points.
//!
//! An entry is an immutable signed transaction against one user's balance.
//! Entries are never updated or deleted; the displayed total is always the
//! sum of a user's entries, and the aggregate row is a materialized view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Transaction types ───────────────────────────────────────────────────────

/// Why a ledger entry exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
  /// Awarded by a matching rule.
  RuleAward,
  /// Granted (or revoked) directly by an administrator.
  ManualAdjustment,
  /// The `points_value` attached to a newly earned badge.
  BadgeEarned,
  /// Negative entry charged when a redemption is created.
  RedemptionDebit,
  /// Compensating positive entry when a redemption is cancelled.
  RedemptionRefund,
}

impl TransactionType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::RuleAward => "rule_award",
      Self::ManualAdjustment => "manual_adjustment",
      Self::BadgeEarned => "badge_earned",
      Self::RedemptionDebit => "redemption_debit",
      Self::RedemptionRefund => "redemption_refund",
    }
  }
}

/// What kind of record `reference_id` points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
  Rule,
  Badge,
  Redemption,
}

impl ReferenceType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Rule => "rule",
      Self::Badge => "badge",
      Self::Redemption => "redemption",
    }
  }
}

// ─── Entries ─────────────────────────────────────────────────────────────────

/// An immutable point transaction. Once written, no field is ever updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
  pub entry_id:         Uuid,
  pub user_email:       String,
  /// Signed; negative for debits.
  pub amount:           i64,
  pub transaction_type: TransactionType,
  pub reference_type:   Option<ReferenceType>,
  pub reference_id:     Option<Uuid>,
  pub description:      String,
  /// Server-assigned timestamp; never changes after creation.
  pub created_date:     DateTime<Utc>,
}

/// Input to [`crate::store::LedgerStore::append`].
/// `entry_id` and `created_date` are always set by the store.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
  pub user_email:       String,
  pub amount:           i64,
  pub transaction_type: TransactionType,
  pub reference_type:   Option<ReferenceType>,
  pub reference_id:     Option<Uuid>,
  pub description:      String,
}

// ─── Idempotency ─────────────────────────────────────────────────────────────

/// Uniquely identifies one application of one rule to one trigger occurrence
/// for one user. Appending with a key that is already recorded is a no-op,
/// which is what makes award execution safe to replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyKey {
  pub trigger_instance_id: String,
  /// `None` for manual admin adjustments, which carry their own instance id.
  pub rule_id:             Option<Uuid>,
  pub user_email:          String,
}

impl IdempotencyKey {
  /// Canonical encoding used for the unique marker column.
  pub fn as_marker(&self) -> String {
    let rule = self
      .rule_id
      .map(|id| id.to_string())
      .unwrap_or_else(|| "manual".to_string());
    format!("{}:{}:{}", self.trigger_instance_id, rule, self.user_email)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn marker_is_stable_and_distinguishes_rules() {
    let rule_id = Uuid::new_v4();
    let a = IdempotencyKey {
      trigger_instance_id: "evt-1".into(),
      rule_id:             Some(rule_id),
      user_email:          "a@example.com".into(),
    };
    let b = IdempotencyKey { rule_id: None, ..a.clone() };

    assert_eq!(a.as_marker(), a.as_marker());
    assert_ne!(a.as_marker(), b.as_marker());
    assert!(b.as_marker().contains(":manual:"));
  }
}
