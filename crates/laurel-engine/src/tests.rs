//! Engine integration tests against the SQLite backend.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use laurel_core::{
  Error,
  points::Tier,
  reward::{NewReward, RedemptionStatus, Stock},
  rule::{
    ConditionLogic, FrequencyLimit, Multipliers, NewRule, RuleActions,
    RuleScope, TriggerEvent,
  },
  store::PointsStore,
  suggestion::SuggestionStatus,
  trigger::{Trigger, TriggerContext},
};
use laurel_store_sqlite::SqliteStore;
use uuid::Uuid;

use crate::{
  Engine, EngineConfig, TracingNotifier, suggest::HeuristicAdvisor,
};

type TestEngine = Engine<SqliteStore, TracingNotifier, HeuristicAdvisor>;

async fn engine() -> TestEngine {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  Engine::new(
    Arc::new(store),
    Arc::new(TracingNotifier),
    HeuristicAdvisor::default(),
    EngineConfig::default(),
  )
}

fn attendance_rule(points: i64) -> NewRule {
  NewRule {
    rule_name:            "Event attendance".into(),
    scope:                RuleScope::Global,
    trigger_event:        TriggerEvent::EventAttendance,
    conditions:           vec![],
    logic:                ConditionLogic::And,
    actions:              RuleActions { award_points: points, badge_id: None },
    priority:             10,
    frequency_limit:      FrequencyLimit::Unlimited,
    multipliers:          Multipliers::default(),
    notify_on_award:      true,
    notification_message: Some("Thanks for attending!".into()),
  }
}

fn trigger(instance: &str, user: &str) -> Trigger {
  Trigger {
    trigger_event:       TriggerEvent::EventAttendance,
    user_email:          user.into(),
    trigger_instance_id: instance.into(),
    context:             TriggerContext::default(),
  }
}

// ─── Trigger processing ──────────────────────────────────────────────────────

#[tokio::test]
async fn attendance_awards_points_and_updates_aggregate() {
  let e = engine().await;
  e.create_rule(attendance_rule(10)).await.unwrap();

  let outcome = e
    .process_trigger(trigger("evt-1", "a@example.com"))
    .await
    .unwrap();

  assert_eq!(outcome.applied.len(), 1);
  assert_eq!(outcome.applied[0].points, 10);

  let totals = outcome.totals.unwrap();
  assert_eq!(totals.total_points, 10);
  assert_eq!(totals.tier, Tier::Bronze);
  assert_eq!(totals.current_streak, 1);
  assert_eq!(totals.badges_earned, 0);

  let entries = e.user_ledger("a@example.com").await.unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].amount, 10);
}

#[tokio::test]
async fn replayed_trigger_awards_nothing() {
  let e = engine().await;
  e.create_rule(attendance_rule(10)).await.unwrap();

  e.process_trigger(trigger("evt-1", "a@example.com"))
    .await
    .unwrap();
  let replay = e
    .process_trigger(trigger("evt-1", "a@example.com"))
    .await
    .unwrap();

  assert!(replay.applied.is_empty());
  assert_eq!(replay.skipped, 1);

  let points = e.user_points("a@example.com").await.unwrap();
  assert_eq!(points.total_points, 10);
  assert_eq!(e.user_ledger("a@example.com").await.unwrap().len(), 1);
}

#[tokio::test]
async fn distinct_instances_award_separately() {
  let e = engine().await;
  e.create_rule(attendance_rule(10)).await.unwrap();

  e.process_trigger(trigger("evt-1", "a@example.com"))
    .await
    .unwrap();
  e.process_trigger(trigger("evt-2", "a@example.com"))
    .await
    .unwrap();

  let points = e.user_points("a@example.com").await.unwrap();
  assert_eq!(points.total_points, 20);
}

#[tokio::test]
async fn once_frequency_limit_blocks_second_application() {
  let e = engine().await;
  let mut rule = attendance_rule(10);
  rule.frequency_limit = FrequencyLimit::Once;
  e.create_rule(rule).await.unwrap();

  e.process_trigger(trigger("evt-1", "a@example.com"))
    .await
    .unwrap();
  let second = e
    .process_trigger(trigger("evt-2", "a@example.com"))
    .await
    .unwrap();

  assert!(second.applied.is_empty());
  assert_eq!(second.skipped, 1);
  assert_eq!(
    e.user_points("a@example.com").await.unwrap().total_points,
    10
  );

  // The limit is per user; someone else still qualifies.
  let other = e
    .process_trigger(trigger("evt-3", "b@example.com"))
    .await
    .unwrap();
  assert_eq!(other.applied.len(), 1);
}

#[tokio::test]
async fn weekend_multiplier_applies_from_occurrence_time() {
  let e = engine().await;
  let mut rule = attendance_rule(100);
  rule.multipliers.weekend = Some(2.0);
  e.create_rule(rule).await.unwrap();

  // Saturday.
  let mut t = trigger("evt-1", "a@example.com");
  t.context.occurred_at =
    Some(Utc.with_ymd_and_hms(2026, 3, 7, 12, 0, 0).unwrap());

  let outcome = e.process_trigger(t).await.unwrap();
  assert_eq!(outcome.applied[0].points, 200);
}

#[tokio::test]
async fn badge_granted_once_across_rules() {
  let e = engine().await;
  let badge = e
    .create_badge(laurel_core::badge::NewBadge {
      badge_name:   "Participant".into(),
      points_value: 25,
    })
    .await
    .unwrap();

  let mut first = attendance_rule(10);
  first.actions.badge_id = Some(badge.badge_id);
  let mut second = attendance_rule(5);
  second.rule_name = "Attendance bonus".into();
  second.priority = 20;
  second.actions.badge_id = Some(badge.badge_id);
  e.create_rule(first).await.unwrap();
  e.create_rule(second).await.unwrap();

  let outcome = e
    .process_trigger(trigger("evt-1", "a@example.com"))
    .await
    .unwrap();
  assert_eq!(outcome.applied.len(), 2);

  // Both rules' points, the badge and its value exactly once.
  let totals = outcome.totals.unwrap();
  assert_eq!(totals.total_points, 10 + 5 + 25);
  assert_eq!(totals.badges_earned, 1);

  let granted: Vec<_> =
    outcome.applied.iter().filter(|a| a.badge_id.is_some()).collect();
  assert_eq!(granted.len(), 1);
  assert_eq!(granted[0].badge_points, 25);
}

#[tokio::test]
async fn badge_only_rule_replays_quietly() {
  let e = engine().await;
  let badge = e
    .create_badge(laurel_core::badge::NewBadge {
      badge_name:   "Zero Value".into(),
      points_value: 0,
    })
    .await
    .unwrap();
  let mut rule = attendance_rule(0);
  rule.actions.badge_id = Some(badge.badge_id);
  e.create_rule(rule).await.unwrap();

  let first = e
    .process_trigger(trigger("evt-1", "a@example.com"))
    .await
    .unwrap();
  assert_eq!(first.applied.len(), 1);
  assert_eq!(first.totals.as_ref().unwrap().badges_earned, 1);
  assert_eq!(first.totals.unwrap().total_points, 0);

  // The badge uniqueness constraint absorbs the replay.
  let replay = e
    .process_trigger(trigger("evt-2", "a@example.com"))
    .await
    .unwrap();
  assert!(replay.applied.is_empty());
  assert_eq!(replay.skipped, 1);
}

#[tokio::test]
async fn empty_user_email_is_rejected() {
  let e = engine().await;
  let err = e
    .process_trigger(trigger("evt-1", "  "))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation(_)));
}

// ─── Manual awards ───────────────────────────────────────────────────────────

#[tokio::test]
async fn manual_points_cross_tier_threshold() {
  let e = engine().await;

  let totals = e
    .award_points("a@example.com", 600, "spot bonus".into(), "adj-1")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(totals.total_points, 600);
  assert_eq!(totals.tier, Tier::Silver);

  // Replayed adjustment id changes nothing.
  let replay = e
    .award_points("a@example.com", 600, "spot bonus".into(), "adj-1")
    .await
    .unwrap();
  assert!(replay.is_none());
  assert_eq!(
    e.user_points("a@example.com").await.unwrap().total_points,
    600
  );
}

#[tokio::test]
async fn manual_badge_grant_is_at_most_once() {
  let e = engine().await;
  let badge = e
    .create_badge(laurel_core::badge::NewBadge {
      badge_name:   "Founders".into(),
      points_value: 100,
    })
    .await
    .unwrap();

  let totals = e
    .award_badge(
      "a@example.com",
      badge.badge_id,
      "admin@example.com".into(),
      "early adopter".into(),
    )
    .await
    .unwrap()
    .unwrap();
  assert_eq!(totals.total_points, 100);
  assert_eq!(totals.badges_earned, 1);

  let repeat = e
    .award_badge(
      "a@example.com",
      badge.badge_id,
      "admin@example.com".into(),
      "again".into(),
    )
    .await
    .unwrap();
  assert!(repeat.is_none());
  assert_eq!(
    e.user_points("a@example.com").await.unwrap().total_points,
    100
  );
}

#[tokio::test]
async fn manual_badge_for_unknown_badge_errors() {
  let e = engine().await;
  let err = e
    .award_badge(
      "a@example.com",
      Uuid::new_v4(),
      "admin@example.com".into(),
      "oops".into(),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::BadgeNotFound(_)));
}

// ─── Reconciliation ──────────────────────────────────────────────────────────

#[tokio::test]
async fn reconcile_rebuilds_a_drifted_aggregate() {
  let e = engine().await;
  e.award_points("a@example.com", 700, "seed".into(), "adj-1")
    .await
    .unwrap();

  // Corrupt the materialized view directly.
  let mut drifted = e.user_points("a@example.com").await.unwrap();
  drifted.total_points = 1;
  drifted.tier = Tier::Bronze;
  e.store().upsert_points(drifted).await.unwrap();

  let fixed = e.reconcile("a@example.com").await.unwrap();
  assert_eq!(fixed.total_points, 700);
  assert_eq!(fixed.tier, Tier::Silver);
}

// ─── Redemptions ─────────────────────────────────────────────────────────────

async fn seeded_engine(balance: i64) -> TestEngine {
  let e = engine().await;
  e.award_points("a@example.com", balance, "seed".into(), "seed-1")
    .await
    .unwrap();
  e
}

#[tokio::test]
async fn redeem_debits_frozen_cost() {
  let e = seeded_engine(500).await;
  let reward = e
    .create_reward(NewReward {
      reward_name: "Coffee voucher".into(),
      points_cost: 500,
      stock:       Stock::Limited(5),
    })
    .await
    .unwrap();

  let redemption = e.redeem(reward.reward_id, "a@example.com").await.unwrap();
  assert_eq!(redemption.status, RedemptionStatus::Pending);
  assert_eq!(redemption.points_spent, 500);

  let points = e.user_points("a@example.com").await.unwrap();
  assert_eq!(points.total_points, 0);
}

#[tokio::test]
async fn redeem_with_insufficient_balance_errors() {
  let e = seeded_engine(100).await;
  let reward = e
    .create_reward(NewReward {
      reward_name: "Coffee voucher".into(),
      points_cost: 500,
      stock:       Stock::Unlimited,
    })
    .await
    .unwrap();

  let err = e
    .redeem(reward.reward_id, "a@example.com")
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::InsufficientPoints { have: 100, need: 500 }
  ));

  // Nothing was written.
  assert_eq!(
    e.user_points("a@example.com").await.unwrap().total_points,
    100
  );
  assert!(e.user_redemptions("a@example.com").await.unwrap().is_empty());
}

#[tokio::test]
async fn redeem_unavailable_reward_errors() {
  let e = seeded_engine(500).await;
  let reward = e
    .create_reward(NewReward {
      reward_name: "Hidden".into(),
      points_cost: 10,
      stock:       Stock::Unlimited,
    })
    .await
    .unwrap();
  e.update_reward(reward.reward_id, laurel_core::reward::RewardUpdate {
    is_available: Some(false),
    ..Default::default()
  })
  .await
  .unwrap();

  let err = e
    .redeem(reward.reward_id, "a@example.com")
    .await
    .unwrap_err();
  assert!(matches!(err, Error::RewardUnavailable));
}

#[tokio::test]
async fn last_unit_race_has_one_winner() {
  let e = Arc::new(engine().await);
  e.award_points("a@example.com", 500, "seed".into(), "seed-a")
    .await
    .unwrap();
  e.award_points("b@example.com", 500, "seed".into(), "seed-b")
    .await
    .unwrap();
  let reward = e
    .create_reward(NewReward {
      reward_name: "Last one".into(),
      points_cost: 100,
      stock:       Stock::Limited(1),
    })
    .await
    .unwrap();

  let (a, b) = tokio::join!(
    e.redeem(reward.reward_id, "a@example.com"),
    e.redeem(reward.reward_id, "b@example.com"),
  );

  let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
  assert_eq!(winners, 1);
  let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
  assert!(matches!(loser, Error::OutOfStock));
}

#[tokio::test]
async fn cancel_refunds_frozen_cost_and_restores_stock() {
  let e = seeded_engine(500).await;
  let reward = e
    .create_reward(NewReward {
      reward_name: "Coffee voucher".into(),
      points_cost: 500,
      stock:       Stock::Limited(1),
    })
    .await
    .unwrap();

  let redemption = e.redeem(reward.reward_id, "a@example.com").await.unwrap();

  // Repricing after the fact must not change the refund.
  e.update_reward(reward.reward_id, laurel_core::reward::RewardUpdate {
    points_cost: Some(999),
    ..Default::default()
  })
  .await
  .unwrap();

  let cancelled = e
    .cancel_redemption(redemption.redemption_id)
    .await
    .unwrap();
  assert_eq!(cancelled.status, RedemptionStatus::Cancelled);

  let points = e.user_points("a@example.com").await.unwrap();
  assert_eq!(points.total_points, 500);

  let listed = e.list_rewards().await.unwrap();
  assert_eq!(listed[0].stock, Stock::Limited(1));
}

#[tokio::test]
async fn fulfilment_requires_approval_first() {
  let e = seeded_engine(500).await;
  let reward = e
    .create_reward(NewReward {
      reward_name: "Mug".into(),
      points_cost: 100,
      stock:       Stock::Unlimited,
    })
    .await
    .unwrap();
  let redemption = e.redeem(reward.reward_id, "a@example.com").await.unwrap();

  let err = e
    .fulfill_redemption(redemption.redemption_id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidTransition { .. }));

  e.approve_redemption(redemption.redemption_id).await.unwrap();
  let fulfilled = e
    .fulfill_redemption(redemption.redemption_id)
    .await
    .unwrap();
  assert_eq!(fulfilled.status, RedemptionStatus::Fulfilled);

  // Terminal: cancellation after fulfilment is rejected.
  let err = e
    .cancel_redemption(redemption.redemption_id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidTransition { .. }));
}

// ─── Suggestions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn analysis_flags_unused_rule_and_implement_deactivates_it() {
  let e = engine().await;
  let rule = e.create_rule(attendance_rule(10)).await.unwrap();

  // No triggers ever processed, so the rule has zero hits.
  let created = e.analyze_suggestions().await.unwrap();
  let suggestion = created
    .iter()
    .find(|s| s.title.contains("Event attendance"))
    .expect("a deactivation suggestion");
  assert_eq!(suggestion.status, SuggestionStatus::Pending);

  // Heuristic confidence (0.6) sits under the 0.9 auto-implement bar, so
  // approval alone must not touch the rule.
  let approved = e
    .approve_suggestion(
      suggestion.suggestion_id,
      "admin@example.com".into(),
      true,
    )
    .await
    .unwrap();
  assert_eq!(approved.status, SuggestionStatus::Approved);
  assert!(e.get_rule(rule.rule_id).await.unwrap().is_active);

  let implemented = e
    .implement_suggestion(suggestion.suggestion_id, "admin@example.com".into())
    .await
    .unwrap();
  assert_eq!(implemented.status, SuggestionStatus::Implemented);
  assert!(!e.get_rule(rule.rule_id).await.unwrap().is_active);
}

#[tokio::test]
async fn rejected_suggestion_cannot_be_implemented() {
  let e = engine().await;
  e.create_rule(attendance_rule(10)).await.unwrap();

  let created = e.analyze_suggestions().await.unwrap();
  let suggestion = &created[0];

  e.reject_suggestion(suggestion.suggestion_id, "admin@example.com".into())
    .await
    .unwrap();

  let err = e
    .implement_suggestion(suggestion.suggestion_id, "admin@example.com".into())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::SuggestionNotIn { .. }));
}

#[tokio::test]
async fn active_rules_with_hits_are_not_flagged() {
  let e = engine().await;
  e.create_rule(attendance_rule(10)).await.unwrap();
  e.process_trigger(trigger("evt-1", "a@example.com"))
    .await
    .unwrap();

  let created = e.analyze_suggestions().await.unwrap();
  assert!(
    created
      .iter()
      .all(|s| !s.title.contains("Event attendance"))
  );
}

#[tokio::test]
async fn engagement_signals_count_window_activity() {
  let e = engine().await;
  e.create_rule(attendance_rule(10)).await.unwrap();
  e.process_trigger(trigger("evt-1", "a@example.com"))
    .await
    .unwrap();
  e.process_trigger(trigger("evt-2", "b@example.com"))
    .await
    .unwrap();

  let signals = e.engagement_signals().await.unwrap();
  assert_eq!(signals.total_users, 2);
  assert_eq!(signals.active_users, 2);
  assert_eq!(signals.points_awarded, 20);
  assert_eq!(signals.rule_hits.len(), 1);
  assert_eq!(signals.rule_hits[0].hits, 2);
}
