//! Rule definitions — the configurable unit of the gamification engine.
//!
//! A rule binds a trigger event to a condition set and an action set. Rules
//! are authored by administrators and soft-deactivated rather than deleted,
//! so historical ledger entries can always resolve their reference.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, points::Tier};

// ─── Trigger events ──────────────────────────────────────────────────────────

/// The named user action that causes rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
  EventAttendance,
  RecognitionSent,
  RecognitionReceived,
  ChallengeCompleted,
  ModuleCompleted,
  LearningPathCompleted,
  ProfileUpdated,
  ContentCreated,
}

impl TriggerEvent {
  /// The discriminant string stored in the `trigger_event` column.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::EventAttendance => "event_attendance",
      Self::RecognitionSent => "recognition_sent",
      Self::RecognitionReceived => "recognition_received",
      Self::ChallengeCompleted => "challenge_completed",
      Self::ModuleCompleted => "module_completed",
      Self::LearningPathCompleted => "learning_path_completed",
      Self::ProfileUpdated => "profile_updated",
      Self::ContentCreated => "content_created",
    }
  }
}

// ─── Scope ───────────────────────────────────────────────────────────────────

/// Whether a rule applies to the whole organisation or one team.
///
/// Team scope adds an implicit membership condition evaluated before any
/// authored conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum RuleScope {
  Global,
  Team { team_id: Uuid },
}

// ─── Conditions ──────────────────────────────────────────────────────────────

/// Comparison operator for a condition. A closed set: adding an operator is
/// a compile-time-checked change, not a stringly-typed branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
  Equals,
  Contains,
  Gt,
  Gte,
  Lt,
  Lte,
  In,
  Exists,
}

/// One authored condition: a field of a context entity compared to a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
  /// Context entity name, e.g. `"participation"` or `"recognition"`.
  pub entity:   String,
  pub field:    String,
  pub operator: ConditionOp,
  /// Comparison value; its expected shape depends on the operator
  /// (`in` requires an array, `exists` ignores it).
  pub value:    serde_json::Value,
}

/// How a rule's conditions combine.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConditionLogic {
  #[default]
  And,
  Or,
}

impl ConditionLogic {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::And => "AND",
      Self::Or => "OR",
    }
  }
}

// ─── Actions ─────────────────────────────────────────────────────────────────

/// The outcome a matching rule produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleActions {
  /// Base points before multipliers. Zero is allowed (badge-only rules).
  pub award_points: i64,
  pub badge_id:     Option<Uuid>,
}

/// Optional point multipliers, compounded multiplicatively.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Multipliers {
  /// Applied when the trigger lands on a Saturday or Sunday.
  pub weekend:  Option<f64>,
  /// Applied by the acting user's current tier.
  #[serde(default)]
  pub by_tier:  BTreeMap<Tier, f64>,
}

impl Multipliers {
  pub fn is_empty(&self) -> bool {
    self.weekend.is_none() && self.by_tier.is_empty()
  }
}

// ─── Frequency limits ────────────────────────────────────────────────────────

/// How often one user may trigger one rule.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyLimit {
  #[default]
  Unlimited,
  Once,
  Daily,
  Weekly,
  Monthly,
}

impl FrequencyLimit {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Unlimited => "unlimited",
      Self::Once => "once",
      Self::Daily => "daily",
      Self::Weekly => "weekly",
      Self::Monthly => "monthly",
    }
  }

  /// Whether another application is allowed given the timestamps of prior
  /// applications of this rule for the same user.
  pub fn allows(&self, history: &[DateTime<Utc>], now: DateTime<Utc>) -> bool {
    let window_hours = match self {
      Self::Unlimited => return true,
      Self::Once => return history.is_empty(),
      Self::Daily => 24,
      Self::Weekly => 7 * 24,
      Self::Monthly => 30 * 24,
    };
    let cutoff = now - chrono::Duration::hours(window_hours);
    !history.iter().any(|t| *t > cutoff)
  }
}

// ─── Rule ────────────────────────────────────────────────────────────────────

/// A persisted rule. Edited only through [`RuleUpdate`]; deactivated, never
/// hard-deleted, while ledger entries reference it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
  pub rule_id:              Uuid,
  pub rule_name:            String,
  pub scope:                RuleScope,
  pub trigger_event:        TriggerEvent,
  pub conditions:           Vec<Condition>,
  pub logic:                ConditionLogic,
  pub actions:              RuleActions,
  /// Lower priority evaluates first; creation date breaks ties.
  pub priority:             i32,
  pub frequency_limit:      FrequencyLimit,
  pub multipliers:          Multipliers,
  pub notify_on_award:      bool,
  pub notification_message: Option<String>,
  pub is_active:            bool,
  /// Server-assigned; never changes after creation.
  pub created_date:         DateTime<Utc>,
}

// ─── NewRule ─────────────────────────────────────────────────────────────────

/// Input to [`crate::store::RuleStore::create_rule`].
/// `rule_id` and `created_date` are always set by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRule {
  pub rule_name:            String,
  pub scope:                RuleScope,
  pub trigger_event:        TriggerEvent,
  #[serde(default)]
  pub conditions:           Vec<Condition>,
  #[serde(default)]
  pub logic:                ConditionLogic,
  pub actions:              RuleActions,
  #[serde(default)]
  pub priority:             i32,
  #[serde(default)]
  pub frequency_limit:      FrequencyLimit,
  #[serde(default)]
  pub multipliers:          Multipliers,
  #[serde(default)]
  pub notify_on_award:      bool,
  #[serde(default)]
  pub notification_message: Option<String>,
}

impl NewRule {
  /// Reject malformed rules before they reach the repository.
  pub fn validate(&self) -> Result<()> {
    if self.rule_name.trim().is_empty() {
      return Err(Error::Validation("rule_name must not be empty".into()));
    }
    if self.actions.award_points < 0 {
      return Err(Error::Validation(
        "award_points must not be negative".into(),
      ));
    }
    for (i, c) in self.conditions.iter().enumerate() {
      if c.entity.trim().is_empty() || c.field.trim().is_empty() {
        return Err(Error::Validation(format!(
          "condition {i}: entity and field must not be empty"
        )));
      }
      match c.operator {
        ConditionOp::In if !c.value.is_array() => {
          return Err(Error::Validation(format!(
            "condition {i}: `in` requires an array value"
          )));
        }
        ConditionOp::Gt | ConditionOp::Gte | ConditionOp::Lt | ConditionOp::Lte
          if !c.value.is_number() =>
        {
          return Err(Error::Validation(format!(
            "condition {i}: ordered comparison requires a numeric value"
          )));
        }
        _ => {}
      }
    }
    if let Some(m) = self.multipliers.weekend
      && m <= 0.0
    {
      return Err(Error::Validation(
        "weekend multiplier must be positive".into(),
      ));
    }
    if self.multipliers.by_tier.values().any(|m| *m <= 0.0) {
      return Err(Error::Validation("tier multipliers must be positive".into()));
    }
    Ok(())
  }
}

// ─── RuleUpdate ──────────────────────────────────────────────────────────────

/// Partial edit applied by [`crate::store::RuleStore::update_rule`].
/// Absent fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleUpdate {
  pub rule_name:            Option<String>,
  pub conditions:           Option<Vec<Condition>>,
  pub logic:                Option<ConditionLogic>,
  pub actions:              Option<RuleActions>,
  pub priority:             Option<i32>,
  pub frequency_limit:      Option<FrequencyLimit>,
  pub multipliers:          Option<Multipliers>,
  pub notify_on_award:      Option<bool>,
  pub notification_message: Option<Option<String>>,
  pub is_active:            Option<bool>,
}

impl RuleUpdate {
  /// Fold this update into an existing rule.
  pub fn apply_to(self, mut rule: Rule) -> Rule {
    if let Some(v) = self.rule_name {
      rule.rule_name = v;
    }
    if let Some(v) = self.conditions {
      rule.conditions = v;
    }
    if let Some(v) = self.logic {
      rule.logic = v;
    }
    if let Some(v) = self.actions {
      rule.actions = v;
    }
    if let Some(v) = self.priority {
      rule.priority = v;
    }
    if let Some(v) = self.frequency_limit {
      rule.frequency_limit = v;
    }
    if let Some(v) = self.multipliers {
      rule.multipliers = v;
    }
    if let Some(v) = self.notify_on_award {
      rule.notify_on_award = v;
    }
    if let Some(v) = self.notification_message {
      rule.notification_message = v;
    }
    if let Some(v) = self.is_active {
      rule.is_active = v;
    }
    rule
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn base_rule() -> NewRule {
    NewRule {
      rule_name:            "First attendance".into(),
      scope:                RuleScope::Global,
      trigger_event:        TriggerEvent::EventAttendance,
      conditions:           vec![],
      logic:                ConditionLogic::And,
      actions:              RuleActions { award_points: 10, badge_id: None },
      priority:             0,
      frequency_limit:      FrequencyLimit::Unlimited,
      multipliers:          Multipliers::default(),
      notify_on_award:      false,
      notification_message: None,
    }
  }

  #[test]
  fn validate_accepts_minimal_rule() {
    assert!(base_rule().validate().is_ok());
  }

  #[test]
  fn validate_rejects_empty_name() {
    let mut rule = base_rule();
    rule.rule_name = "  ".into();
    assert!(matches!(rule.validate(), Err(Error::Validation(_))));
  }

  #[test]
  fn validate_rejects_negative_points() {
    let mut rule = base_rule();
    rule.actions.award_points = -5;
    assert!(matches!(rule.validate(), Err(Error::Validation(_))));
  }

  #[test]
  fn validate_rejects_in_without_array() {
    let mut rule = base_rule();
    rule.conditions.push(Condition {
      entity:   "participation".into(),
      field:    "status".into(),
      operator: ConditionOp::In,
      value:    serde_json::json!("attended"),
    });
    assert!(matches!(rule.validate(), Err(Error::Validation(_))));
  }

  #[test]
  fn validate_rejects_non_numeric_ordered_comparison() {
    let mut rule = base_rule();
    rule.conditions.push(Condition {
      entity:   "participation".into(),
      field:    "count".into(),
      operator: ConditionOp::Gte,
      value:    serde_json::json!("three"),
    });
    assert!(matches!(rule.validate(), Err(Error::Validation(_))));
  }

  #[test]
  fn frequency_once_blocks_after_first() {
    let now = Utc::now();
    assert!(FrequencyLimit::Once.allows(&[], now));
    assert!(!FrequencyLimit::Once.allows(&[now - chrono::Duration::days(400)], now));
  }

  #[test]
  fn frequency_daily_reopens_after_window() {
    let now = Utc::now();
    let yesterday_late = now - chrono::Duration::hours(23);
    let two_days_ago = now - chrono::Duration::hours(49);
    assert!(!FrequencyLimit::Daily.allows(&[yesterday_late], now));
    assert!(FrequencyLimit::Daily.allows(&[two_days_ago], now));
  }

  #[test]
  fn trigger_event_snake_case_roundtrip() {
    let json = serde_json::to_string(&TriggerEvent::EventAttendance).unwrap();
    assert_eq!(json, "\"event_attendance\"");
    let back: TriggerEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(back, TriggerEvent::EventAttendance);
    assert_eq!(back.as_str(), "event_attendance");
  }
}
