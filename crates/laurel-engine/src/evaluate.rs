//! The rule evaluator — a pure function from (trigger, rules, context) to an
//! ordered action plan list.
//!
//! The evaluator performs no side effects and reads no stores: given the same
//! rule set and context it always produces the same plans. Deduplication of
//! badge outcomes across plans is the executor's responsibility.

use chrono::{DateTime, Datelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use laurel_core::{
  rule::{
    Condition, ConditionLogic, ConditionOp, FrequencyLimit, Rule, RuleScope,
    TriggerEvent,
  },
  trigger::TriggerContext,
};

// ─── Action plans ────────────────────────────────────────────────────────────

/// The outcome one matching rule produces for one trigger instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPlan {
  pub rule_id:              Uuid,
  pub rule_name:            String,
  /// Final points after multipliers; may be zero for badge-only rules.
  pub points:               i64,
  pub badge_id:             Option<Uuid>,
  /// Carried from the rule so the executor can consult the application
  /// history without re-reading the rule.
  pub frequency_limit:      FrequencyLimit,
  pub notify:               bool,
  pub notification_message: Option<String>,
}

// ─── Evaluation ──────────────────────────────────────────────────────────────

/// Evaluate `rules` against one trigger occurrence.
///
/// Selection: active rules whose trigger matches, with the implicit team
/// membership check for team-scoped rules evaluated before any authored
/// conditions. Ordering: ascending priority, then creation date. A rule with
/// no conditions matches unconditionally.
pub fn evaluate(
  trigger_event: TriggerEvent,
  rules: &[Rule],
  ctx: &TriggerContext,
  now: DateTime<Utc>,
) -> Vec<ActionPlan> {
  let mut applicable: Vec<&Rule> = rules
    .iter()
    .filter(|r| r.is_active && r.trigger_event == trigger_event)
    .collect();
  applicable.sort_by(|a, b| {
    a.priority
      .cmp(&b.priority)
      .then(a.created_date.cmp(&b.created_date))
  });

  let occurred_at = ctx.occurred_at.unwrap_or(now);

  applicable
    .into_iter()
    .filter(|rule| scope_matches(&rule.scope, ctx))
    .filter(|rule| conditions_match(rule, ctx))
    .map(|rule| {
      let multiplier = resolve_multiplier(rule, ctx, occurred_at);
      let points =
        (rule.actions.award_points as f64 * multiplier).round() as i64;
      ActionPlan {
        rule_id:              rule.rule_id,
        rule_name:            rule.rule_name.clone(),
        points,
        badge_id:             rule.actions.badge_id,
        frequency_limit:      rule.frequency_limit,
        notify:               rule.notify_on_award,
        notification_message: rule.notification_message.clone(),
      }
    })
    .collect()
}

/// The implicit membership condition for team-scoped rules. Checked first;
/// it is the cheapest condition of all.
fn scope_matches(scope: &RuleScope, ctx: &TriggerContext) -> bool {
  match scope {
    RuleScope::Global => true,
    RuleScope::Team { team_id } => ctx.team_id == Some(*team_id),
  }
}

fn conditions_match(rule: &Rule, ctx: &TriggerContext) -> bool {
  if rule.conditions.is_empty() {
    return true;
  }
  match rule.logic {
    ConditionLogic::And => {
      rule.conditions.iter().all(|c| condition_matches(c, ctx))
    }
    ConditionLogic::Or => {
      rule.conditions.iter().any(|c| condition_matches(c, ctx))
    }
  }
}

/// Evaluate one condition against the context. A reference to an absent
/// entity or field evaluates to false; conditions never error.
fn condition_matches(cond: &Condition, ctx: &TriggerContext) -> bool {
  let value = match ctx.field(&cond.entity, &cond.field) {
    Some(v) => v,
    None => return false,
  };

  match cond.operator {
    ConditionOp::Equals => *value == cond.value,
    ConditionOp::Contains => match (value.as_str(), cond.value.as_str()) {
      (Some(haystack), Some(needle)) => haystack.contains(needle),
      _ => value
        .as_array()
        .is_some_and(|items| items.contains(&cond.value)),
    },
    ConditionOp::Gt => numeric_cmp(value, &cond.value, |a, b| a > b),
    ConditionOp::Gte => numeric_cmp(value, &cond.value, |a, b| a >= b),
    ConditionOp::Lt => numeric_cmp(value, &cond.value, |a, b| a < b),
    ConditionOp::Lte => numeric_cmp(value, &cond.value, |a, b| a <= b),
    ConditionOp::In => cond
      .value
      .as_array()
      .is_some_and(|options| options.contains(value)),
    ConditionOp::Exists => !value.is_null(),
  }
}

fn numeric_cmp(
  value: &serde_json::Value,
  against: &serde_json::Value,
  cmp: impl Fn(f64, f64) -> bool,
) -> bool {
  match (value.as_f64(), against.as_f64()) {
    (Some(a), Some(b)) => cmp(a, b),
    _ => false,
  }
}

/// Compound the rule's configured multipliers for this occurrence.
fn resolve_multiplier(
  rule: &Rule,
  ctx: &TriggerContext,
  occurred_at: DateTime<Utc>,
) -> f64 {
  let mut multiplier = 1.0;

  let weekday = occurred_at.weekday();
  if matches!(weekday, Weekday::Sat | Weekday::Sun)
    && let Some(weekend) = rule.multipliers.weekend
  {
    multiplier *= weekend;
  }

  if let Some(tier) = ctx.user_tier
    && let Some(tier_mult) = rule.multipliers.by_tier.get(&tier)
  {
    multiplier *= tier_mult;
  }

  multiplier
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use laurel_core::{
    points::Tier,
    rule::{FrequencyLimit, Multipliers, RuleActions},
  };
  use serde_json::json;

  use super::*;

  fn rule(name: &str, priority: i32, points: i64) -> Rule {
    Rule {
      rule_id:              Uuid::new_v4(),
      rule_name:            name.into(),
      scope:                RuleScope::Global,
      trigger_event:        TriggerEvent::EventAttendance,
      conditions:           vec![],
      logic:                ConditionLogic::And,
      actions:              RuleActions { award_points: points, badge_id: None },
      priority,
      frequency_limit:      FrequencyLimit::Unlimited,
      multipliers:          Multipliers::default(),
      notify_on_award:      false,
      notification_message: None,
      is_active:            true,
      created_date:         Utc::now(),
    }
  }

  fn ctx_with(entity: &str, value: serde_json::Value) -> TriggerContext {
    let mut ctx = TriggerContext::default();
    ctx.entities.insert(entity.into(), value);
    ctx
  }

  #[test]
  fn empty_conditions_always_match() {
    let rules = vec![rule("always", 0, 10)];
    let plans = evaluate(
      TriggerEvent::EventAttendance,
      &rules,
      &TriggerContext::default(),
      Utc::now(),
    );
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].points, 10);
  }

  #[test]
  fn inactive_and_mismatched_triggers_are_skipped() {
    let mut inactive = rule("inactive", 0, 10);
    inactive.is_active = false;
    let mut other_trigger = rule("other", 0, 10);
    other_trigger.trigger_event = TriggerEvent::RecognitionSent;

    let plans = evaluate(
      TriggerEvent::EventAttendance,
      &[inactive, other_trigger],
      &TriggerContext::default(),
      Utc::now(),
    );
    assert!(plans.is_empty());
  }

  #[test]
  fn plans_are_ordered_by_priority_then_creation() {
    let mut first = rule("first", 1, 1);
    let mut second = rule("second", 1, 2);
    let third = rule("third", 5, 3);
    first.created_date = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    second.created_date = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();

    // Deliberately shuffled input.
    let rules = vec![third.clone(), second.clone(), first.clone()];
    let plans = evaluate(
      TriggerEvent::EventAttendance,
      &rules,
      &TriggerContext::default(),
      Utc::now(),
    );
    let names: Vec<_> = plans.iter().map(|p| p.rule_name.as_str()).collect();
    assert_eq!(names, ["first", "second", "third"]);
  }

  #[test]
  fn team_scope_requires_membership() {
    let team_id = Uuid::new_v4();
    let mut scoped = rule("team", 0, 10);
    scoped.scope = RuleScope::Team { team_id };

    let no_team = TriggerContext::default();
    let wrong_team = TriggerContext { team_id: Some(Uuid::new_v4()), ..Default::default() };
    let right_team = TriggerContext { team_id: Some(team_id), ..Default::default() };

    let rules = vec![scoped];
    let now = Utc::now();
    assert!(evaluate(TriggerEvent::EventAttendance, &rules, &no_team, now).is_empty());
    assert!(evaluate(TriggerEvent::EventAttendance, &rules, &wrong_team, now).is_empty());
    assert_eq!(
      evaluate(TriggerEvent::EventAttendance, &rules, &right_team, now).len(),
      1
    );
  }

  #[test]
  fn and_logic_short_circuits_or_logic_any_matches() {
    let mut and_rule = rule("and", 0, 10);
    and_rule.conditions = vec![
      Condition {
        entity:   "participation".into(),
        field:    "status".into(),
        operator: ConditionOp::Equals,
        value:    json!("attended"),
      },
      Condition {
        entity:   "participation".into(),
        field:    "score".into(),
        operator: ConditionOp::Gte,
        value:    json!(4),
      },
    ];
    let mut or_rule = and_rule.clone();
    or_rule.rule_name = "or".into();
    or_rule.logic = ConditionLogic::Or;

    let ctx = ctx_with("participation", json!({ "status": "attended", "score": 2 }));
    let rules = vec![and_rule, or_rule];
    let plans =
      evaluate(TriggerEvent::EventAttendance, &rules, &ctx, Utc::now());

    // AND fails on score, OR passes on status.
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].rule_name, "or");
  }

  #[test]
  fn missing_field_evaluates_false_not_error() {
    let mut gated = rule("gated", 0, 10);
    gated.conditions = vec![Condition {
      entity:   "recognition".into(),
      field:    "category".into(),
      operator: ConditionOp::Equals,
      value:    json!("teamwork"),
    }];

    let plans = evaluate(
      TriggerEvent::EventAttendance,
      &[gated],
      &TriggerContext::default(),
      Utc::now(),
    );
    assert!(plans.is_empty());
  }

  #[test]
  fn operator_matrix() {
    let ctx = ctx_with(
      "event",
      json!({ "kind": "workshop", "attendees": 12, "tags": ["social", "remote"], "note": null }),
    );
    let cases = [
      (ConditionOp::Equals, "kind", json!("workshop"), true),
      (ConditionOp::Equals, "kind", json!("offsite"), false),
      (ConditionOp::Contains, "kind", json!("shop"), true),
      (ConditionOp::Contains, "tags", json!("remote"), true),
      (ConditionOp::Gt, "attendees", json!(10), true),
      (ConditionOp::Gte, "attendees", json!(12), true),
      (ConditionOp::Lt, "attendees", json!(12), false),
      (ConditionOp::Lte, "attendees", json!(12), true),
      (ConditionOp::In, "kind", json!(["workshop", "offsite"]), true),
      (ConditionOp::In, "kind", json!(["offsite"]), false),
      (ConditionOp::Exists, "attendees", json!(null), true),
      (ConditionOp::Exists, "note", json!(null), false),
    ];
    for (operator, field, value, expected) in cases {
      let cond = Condition {
        entity: "event".into(),
        field: field.into(),
        operator,
        value,
      };
      assert_eq!(
        condition_matches(&cond, &ctx),
        expected,
        "{operator:?} on {field}"
      );
    }
  }

  #[test]
  fn weekend_and_tier_multipliers_compound() {
    let mut boosted = rule("boosted", 0, 100);
    boosted.multipliers = Multipliers {
      weekend: Some(1.5),
      by_tier: [(Tier::Gold, 2.0)].into_iter().collect(),
    };

    // 2026-03-07 is a Saturday.
    let saturday = Utc.with_ymd_and_hms(2026, 3, 7, 10, 0, 0).unwrap();
    let ctx = TriggerContext {
      user_tier: Some(Tier::Gold),
      occurred_at: Some(saturday),
      ..Default::default()
    };
    let plans =
      evaluate(TriggerEvent::EventAttendance, &[boosted.clone()], &ctx, saturday);
    assert_eq!(plans[0].points, 300);

    // Weekday, no tier: base points.
    let monday = Utc.with_ymd_and_hms(2026, 3, 9, 10, 0, 0).unwrap();
    let plain_ctx = TriggerContext { occurred_at: Some(monday), ..Default::default() };
    let plans =
      evaluate(TriggerEvent::EventAttendance, &[boosted], &plain_ctx, monday);
    assert_eq!(plans[0].points, 100);
  }

  #[test]
  fn same_badge_from_two_rules_is_emitted_twice() {
    // Dedup is the executor's job, not the evaluator's.
    let badge = Uuid::new_v4();
    let mut a = rule("a", 0, 0);
    let mut b = rule("b", 1, 0);
    a.actions.badge_id = Some(badge);
    b.actions.badge_id = Some(badge);

    let plans = evaluate(
      TriggerEvent::EventAttendance,
      &[a, b],
      &TriggerContext::default(),
      Utc::now(),
    );
    assert_eq!(plans.len(), 2);
    assert!(plans.iter().all(|p| p.badge_id == Some(badge)));
  }
}
