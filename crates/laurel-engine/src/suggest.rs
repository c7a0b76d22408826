//! The advisory suggestion pipeline.
//!
//! Analysis reads aggregated engagement signals, asks an advisor for drafts,
//! and persists them as pending suggestions. Nothing a suggestion proposes
//! touches a live rule, badge, or reward until an admin implements it; the
//! implement step is an exhaustive match over [`ProposedChange`], so every
//! mutation the pipeline can perform is visible in one place.

use std::{collections::HashSet, future::Future, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use laurel_core::{
  Error, Result,
  ledger::{ReferenceType, TransactionType},
  rule::{
    ConditionLogic, FrequencyLimit, Multipliers, NewRule, RuleActions,
    RuleScope, TriggerEvent,
  },
  store::{
    BadgeStore, LedgerStore, PointsStore, RewardStore, RuleStore,
    SuggestionStore,
  },
  suggestion::{
    BadgeSaturation, DraftSuggestion, EngagementSignals, ProposedChange,
    RuleHits, Suggestion, SuggestionStatus, SuggestionType,
  },
};
use uuid::Uuid;

// ─── Advisor ─────────────────────────────────────────────────────────────────

/// Produces draft suggestions from engagement signals. Implementations may
/// call out to an external model; they map their own failures into
/// [`laurel_core::Error`].
pub trait SuggestionAdvisor: Send + Sync {
  fn propose<'a>(
    &'a self,
    signals: &'a EngagementSignals,
  ) -> impl Future<Output = Result<Vec<DraftSuggestion>>> + Send + 'a;
}

// ─── Heuristic advisor ───────────────────────────────────────────────────────

/// Built-in advisor that needs no external service. Flags rules nobody hits,
/// badges almost everybody holds, and an engagement drop.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicAdvisor {
  /// A badge held by more than this fraction of users is considered
  /// saturated.
  pub saturation_threshold: f64,
}

impl Default for HeuristicAdvisor {
  fn default() -> Self { Self { saturation_threshold: 0.7 } }
}

impl SuggestionAdvisor for HeuristicAdvisor {
  async fn propose(
    &self,
    signals: &EngagementSignals,
  ) -> Result<Vec<DraftSuggestion>> {
    let mut drafts = Vec::new();

    for RuleHits { rule_id, rule_name, hits } in &signals.rule_hits {
      if *hits == 0 {
        drafts.push(DraftSuggestion {
          suggestion_type:  SuggestionType::RuleAdjustment,
          title:            format!("Deactivate unused rule \"{rule_name}\""),
          description:      format!(
            "\"{rule_name}\" was not applied once in the last {} days. \
             Deactivating it keeps the active rule set meaningful.",
            signals.window_days
          ),
          confidence_score: 0.6,
          proposed_change:  ProposedChange::DeactivateRule {
            rule_id: *rule_id,
          },
        });
      }
    }

    for BadgeSaturation { badge_id, badge_name, saturation } in
      &signals.badge_saturation
    {
      if *saturation > self.saturation_threshold {
        drafts.push(DraftSuggestion {
          suggestion_type:  SuggestionType::BadgeAdjustment,
          title:            format!("Retire saturated badge \"{badge_name}\""),
          description:      format!(
            "{:.0}% of users already hold \"{badge_name}\"; it no longer \
             differentiates anyone.",
            saturation * 100.0
          ),
          confidence_score: 0.55,
          proposed_change:  ProposedChange::UpdateBadge {
            badge_id: *badge_id,
            update:   laurel_core::badge::BadgeUpdate {
              is_active: Some(false),
              ..Default::default()
            },
          },
        });
      }
    }

    if signals.total_users > 0
      && signals.active_users * 2 < signals.total_users
    {
      drafts.push(DraftSuggestion {
        suggestion_type:  SuggestionType::NewRule,
        title:            "Add a profile refresh rule".to_string(),
        description:      format!(
          "Only {} of {} users were active in the last {} days. A small \
           daily-capped award for profile updates gives lapsed users an \
           easy way back in.",
          signals.active_users, signals.total_users, signals.window_days
        ),
        confidence_score: 0.5,
        proposed_change:  ProposedChange::CreateRule(NewRule {
          rule_name:            "Profile refresh".to_string(),
          scope:                RuleScope::Global,
          trigger_event:        TriggerEvent::ProfileUpdated,
          conditions:           Vec::new(),
          logic:                ConditionLogic::And,
          actions:              RuleActions {
            award_points: 5,
            badge_id:     None,
          },
          priority:             100,
          frequency_limit:      FrequencyLimit::Daily,
          multipliers:          Multipliers::default(),
          notify_on_award:      false,
          notification_message: None,
        }),
      });
    }

    Ok(drafts)
  }
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

/// Gathers signals, persists advisor drafts, and drives the review state
/// machine.
pub struct SuggestionPipeline<S, A> {
  store:       Arc<S>,
  advisor:     A,
  /// Minimum confidence at which an approve request with `auto_implement`
  /// set actually implements the change.
  pub auto_implement_threshold: f64,
  /// Look-back window for the engagement signals.
  pub window_days: u32,
}

impl<S, A> SuggestionPipeline<S, A>
where
  S: RuleStore
    + LedgerStore
    + BadgeStore
    + PointsStore
    + RewardStore
    + SuggestionStore,
  A: SuggestionAdvisor,
{
  pub fn new(store: Arc<S>, advisor: A) -> Self {
    Self {
      store,
      advisor,
      auto_implement_threshold: 0.9,
      window_days: 30,
    }
  }

  /// Run one analysis pass: gather signals, collect drafts, persist them as
  /// pending suggestions.
  pub async fn analyze(&self, now: DateTime<Utc>) -> Result<Vec<Suggestion>> {
    let signals = self.gather_signals(now).await?;
    let drafts = self.advisor.propose(&signals).await?;
    tracing::info!(
      drafts = drafts.len(),
      window_days = signals.window_days,
      "analysis pass complete"
    );

    let mut created = Vec::with_capacity(drafts.len());
    for mut draft in drafts {
      draft.confidence_score = draft.confidence_score.clamp(0.0, 1.0);
      created.push(self.store.create_suggestion(draft).await?);
    }
    Ok(created)
  }

  /// Aggregate already-recorded activity into [`EngagementSignals`].
  /// Read-only.
  pub async fn gather_signals(
    &self,
    now: DateTime<Utc>,
  ) -> Result<EngagementSignals> {
    let cutoff = now - Duration::days(i64::from(self.window_days));
    let entries = self.store.entries_since(cutoff).await?;
    let window_awards = self.store.awards_since(cutoff).await?;
    let all_awards =
      self.store.awards_since(DateTime::<Utc>::MIN_UTC).await?;
    let users = self.store.list_points().await?;
    let rules = self.store.list_rules().await?;
    let badges = self.store.list_badges().await?;

    let active_users: HashSet<&str> =
      entries.iter().map(|e| e.user_email.as_str()).collect();
    let points_awarded =
      entries.iter().filter(|e| e.amount > 0).map(|e| e.amount).sum();
    let redemptions = entries
      .iter()
      .filter(|e| e.transaction_type == TransactionType::RedemptionDebit)
      .count() as u64;

    let rule_hits = rules
      .iter()
      .filter(|r| r.is_active)
      .map(|rule| RuleHits {
        rule_id:   rule.rule_id,
        rule_name: rule.rule_name.clone(),
        hits:      entries
          .iter()
          .filter(|e| {
            e.reference_type == Some(ReferenceType::Rule)
              && e.reference_id == Some(rule.rule_id)
          })
          .count() as u64,
      })
      .collect();

    let badge_saturation = badges
      .iter()
      .filter(|b| b.is_active)
      .map(|badge| {
        let holders = all_awards
          .iter()
          .filter(|a| a.badge_id == badge.badge_id)
          .count();
        BadgeSaturation {
          badge_id:   badge.badge_id,
          badge_name: badge.badge_name.clone(),
          saturation: if users.is_empty() {
            0.0
          } else {
            holders as f64 / users.len() as f64
          },
        }
      })
      .collect();

    Ok(EngagementSignals {
      total_users: users.len() as u64,
      active_users: active_users.len() as u64,
      points_awarded,
      badge_awards: window_awards.len() as u64,
      redemptions,
      rule_hits,
      badge_saturation,
      window_days: self.window_days,
    })
  }

  /// Approve a pending suggestion. With `auto_implement` set, a suggestion
  /// at or above the confidence threshold is implemented in the same call;
  /// below it, approval is recorded and implementation stays a separate
  /// explicit step.
  pub async fn approve(
    &self,
    suggestion_id: Uuid,
    reviewed_by: String,
    auto_implement: bool,
  ) -> Result<Suggestion> {
    let approved = self
      .store
      .transition_suggestion(
        suggestion_id,
        SuggestionStatus::Pending,
        SuggestionStatus::Approved,
        Some(reviewed_by.clone()),
      )
      .await?;

    if auto_implement
      && approved.confidence_score >= self.auto_implement_threshold
    {
      return self.implement(suggestion_id, reviewed_by).await;
    }
    Ok(approved)
  }

  /// Reject a pending suggestion. Terminal.
  pub async fn reject(
    &self,
    suggestion_id: Uuid,
    reviewed_by: String,
  ) -> Result<Suggestion> {
    self
      .store
      .transition_suggestion(
        suggestion_id,
        SuggestionStatus::Pending,
        SuggestionStatus::Rejected,
        Some(reviewed_by),
      )
      .await
  }

  /// Apply an approved suggestion's proposed change to the live
  /// configuration, then mark it implemented.
  ///
  /// The write happens before the status flip, so a fault between the two
  /// leaves the suggestion approved and the admin retries; every proposed
  /// write is either idempotent or an update, so the retry is safe.
  pub async fn implement(
    &self,
    suggestion_id: Uuid,
    reviewed_by: String,
  ) -> Result<Suggestion> {
    let suggestion = self
      .store
      .get_suggestion(suggestion_id)
      .await?
      .ok_or(Error::SuggestionNotFound(suggestion_id))?;
    if suggestion.status != SuggestionStatus::Approved {
      return Err(Error::SuggestionNotIn {
        id:       suggestion_id,
        expected: SuggestionStatus::Approved.as_str(),
        actual:   suggestion.status.as_str().to_string(),
      });
    }

    match suggestion.proposed_change {
      ProposedChange::CreateRule(input) => {
        input.validate()?;
        self.store.create_rule(input).await?;
      }
      ProposedChange::UpdateRule { rule_id, update } => {
        self.store.update_rule(rule_id, update).await?;
      }
      ProposedChange::DeactivateRule { rule_id } => {
        self.store.deactivate_rule(rule_id).await?;
      }
      ProposedChange::CreateBadge(input) => {
        self.store.create_badge(input).await?;
      }
      ProposedChange::UpdateBadge { badge_id, update } => {
        self.store.update_badge(badge_id, update).await?;
      }
      ProposedChange::CreateReward(input) => {
        input.validate()?;
        self.store.create_reward(input).await?;
      }
      ProposedChange::UpdateReward { reward_id, update } => {
        self.store.update_reward(reward_id, update).await?;
      }
    }

    self
      .store
      .transition_suggestion(
        suggestion_id,
        SuggestionStatus::Approved,
        SuggestionStatus::Implemented,
        Some(reviewed_by),
      )
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn signals() -> EngagementSignals {
    EngagementSignals {
      total_users: 10,
      active_users: 8,
      window_days: 30,
      ..Default::default()
    }
  }

  #[tokio::test]
  async fn flags_rules_with_zero_hits() {
    let advisor = HeuristicAdvisor::default();
    let mut s = signals();
    let dead = Uuid::new_v4();
    s.rule_hits = vec![
      RuleHits { rule_id: dead, rule_name: "Dead".into(), hits: 0 },
      RuleHits { rule_id: Uuid::new_v4(), rule_name: "Live".into(), hits: 7 },
    ];

    let drafts = advisor.propose(&s).await.unwrap();
    assert_eq!(drafts.len(), 1);
    assert!(matches!(
      drafts[0].proposed_change,
      ProposedChange::DeactivateRule { rule_id } if rule_id == dead
    ));
  }

  #[tokio::test]
  async fn flags_saturated_badges() {
    let advisor = HeuristicAdvisor::default();
    let mut s = signals();
    let common = Uuid::new_v4();
    s.badge_saturation = vec![
      BadgeSaturation {
        badge_id:   common,
        badge_name: "Everyone".into(),
        saturation: 0.9,
      },
      BadgeSaturation {
        badge_id:   Uuid::new_v4(),
        badge_name: "Rare".into(),
        saturation: 0.1,
      },
    ];

    let drafts = advisor.propose(&s).await.unwrap();
    assert_eq!(drafts.len(), 1);
    assert!(matches!(
      drafts[0].proposed_change,
      ProposedChange::UpdateBadge { badge_id, .. } if badge_id == common
    ));
  }

  #[tokio::test]
  async fn suggests_a_rule_when_engagement_drops() {
    let advisor = HeuristicAdvisor::default();
    let mut s = signals();
    s.active_users = 3;

    let drafts = advisor.propose(&s).await.unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].suggestion_type, SuggestionType::NewRule);
    assert!(matches!(
      drafts[0].proposed_change,
      ProposedChange::CreateRule(_)
    ));
  }

  #[tokio::test]
  async fn healthy_signals_produce_nothing() {
    let advisor = HeuristicAdvisor::default();
    let drafts = advisor.propose(&signals()).await.unwrap();
    assert!(drafts.is_empty());
  }
}
