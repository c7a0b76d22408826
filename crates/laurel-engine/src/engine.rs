//! The engine facade wiring the evaluator, executor, redemption workflow,
//! and suggestion pipeline over one store.
//!
//! The API layer talks to this type only; it never reaches around it to the
//! store for writes. Reads may go through [`Engine::store`].

use std::sync::Arc;

use chrono::Utc;
use laurel_core::{
  Error, Result,
  badge::{Badge, BadgeUpdate, NewBadge},
  ledger::LedgerEntry,
  points::UserPoints,
  policy::PolicyConfig,
  reward::{NewReward, Redemption, Reward, RewardUpdate},
  rule::{NewRule, Rule, RuleUpdate},
  store::EngineStore,
  suggestion::{EngagementSignals, Suggestion, SuggestionStatus},
  trigger::Trigger,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  evaluate,
  execute::{AppliedAwards, AwardExecutor},
  notify::Notifier,
  redeem::RedemptionWorkflow,
  suggest::{SuggestionAdvisor, SuggestionPipeline},
};

/// Tunable knobs, deployment configuration rather than code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  pub policy: PolicyConfig,
  /// Confidence at or above which an approve request with `auto_implement`
  /// set implements the suggestion in the same call.
  pub auto_implement_threshold: f64,
  /// Look-back window for suggestion analysis.
  pub suggestion_window_days: u32,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      policy: PolicyConfig::default(),
      auto_implement_threshold: 0.9,
      suggestion_window_days: 30,
    }
  }
}

pub struct Engine<S, N, A> {
  store:       Arc<S>,
  executor:    AwardExecutor<S, N>,
  redemptions: RedemptionWorkflow<S, N>,
  suggestions: SuggestionPipeline<S, A>,
}

impl<S, N, A> Engine<S, N, A>
where
  S: EngineStore,
  N: Notifier,
  A: SuggestionAdvisor,
{
  pub fn new(
    store: Arc<S>,
    notifier: Arc<N>,
    advisor: A,
    config: EngineConfig,
  ) -> Self {
    let executor = AwardExecutor::new(
      Arc::clone(&store),
      Arc::clone(&notifier),
      config.policy,
    );
    let redemptions =
      RedemptionWorkflow::new(Arc::clone(&store), Arc::clone(&notifier));
    let mut suggestions =
      SuggestionPipeline::new(Arc::clone(&store), advisor);
    suggestions.auto_implement_threshold = config.auto_implement_threshold;
    suggestions.window_days = config.suggestion_window_days;

    Self { store, executor, redemptions, suggestions }
  }

  /// Read-only access to the backing store.
  pub fn store(&self) -> &Arc<S> { &self.store }

  // ─── Triggers ──────────────────────────────────────────────────────────────

  /// Evaluate and apply every active rule matching one trigger occurrence.
  /// Redelivering the same `trigger_instance_id` is a no-op.
  pub async fn process_trigger(
    &self,
    trigger: Trigger,
  ) -> Result<AppliedAwards> {
    if trigger.user_email.trim().is_empty() {
      return Err(Error::Validation("user_email must not be empty".into()));
    }
    if trigger.trigger_instance_id.trim().is_empty() {
      return Err(Error::Validation(
        "trigger_instance_id must not be empty".into(),
      ));
    }

    let now = trigger.context.occurred_at.unwrap_or_else(Utc::now);
    let rules = self.store.list_active(trigger.trigger_event).await?;
    let plans =
      evaluate::evaluate(trigger.trigger_event, &rules, &trigger.context, now);
    tracing::debug!(
      trigger_event = trigger.trigger_event.as_str(),
      user_email = %trigger.user_email,
      candidates = rules.len(),
      matched = plans.len(),
      "trigger evaluated"
    );

    self
      .executor
      .apply(&trigger.user_email, &trigger.trigger_instance_id, &plans, now)
      .await
  }

  // ─── Manual awards ─────────────────────────────────────────────────────────

  /// Admin point grant or revocation. Returns `None` when `instance_id` was
  /// already applied.
  pub async fn award_points(
    &self,
    user_email: &str,
    amount: i64,
    description: String,
    instance_id: &str,
  ) -> Result<Option<UserPoints>> {
    if amount == 0 {
      return Err(Error::Validation("amount must not be zero".into()));
    }
    self
      .executor
      .apply_manual_points(
        user_email,
        amount,
        description,
        instance_id,
        Utc::now(),
      )
      .await
  }

  /// Admin badge grant. Returns `None` when the user already holds it.
  pub async fn award_badge(
    &self,
    user_email: &str,
    badge_id: Uuid,
    admin_email: String,
    reason: String,
  ) -> Result<Option<UserPoints>> {
    self
      .executor
      .apply_manual_badge(user_email, badge_id, admin_email, reason, Utc::now())
      .await
  }

  // ─── Rules ─────────────────────────────────────────────────────────────────

  pub async fn create_rule(&self, input: NewRule) -> Result<Rule> {
    input.validate()?;
    self.store.create_rule(input).await
  }

  pub async fn update_rule(
    &self,
    rule_id: Uuid,
    update: RuleUpdate,
  ) -> Result<Rule> {
    if let Some(actions) = &update.actions
      && actions.award_points < 0
    {
      return Err(Error::Validation(
        "award_points must not be negative".into(),
      ));
    }
    self.store.update_rule(rule_id, update).await
  }

  pub async fn deactivate_rule(&self, rule_id: Uuid) -> Result<Rule> {
    self.store.deactivate_rule(rule_id).await
  }

  pub async fn get_rule(&self, rule_id: Uuid) -> Result<Rule> {
    self
      .store
      .get_rule(rule_id)
      .await?
      .ok_or(Error::RuleNotFound(rule_id))
  }

  pub async fn list_rules(&self) -> Result<Vec<Rule>> {
    self.store.list_rules().await
  }

  // ─── Badges ────────────────────────────────────────────────────────────────

  pub async fn create_badge(&self, input: NewBadge) -> Result<Badge> {
    if input.badge_name.trim().is_empty() {
      return Err(Error::Validation("badge_name must not be empty".into()));
    }
    self.store.create_badge(input).await
  }

  pub async fn update_badge(
    &self,
    badge_id: Uuid,
    update: BadgeUpdate,
  ) -> Result<Badge> {
    self.store.update_badge(badge_id, update).await
  }

  pub async fn list_badges(&self) -> Result<Vec<Badge>> {
    self.store.list_badges().await
  }

  // ─── Users ─────────────────────────────────────────────────────────────────

  /// The materialized aggregate; a user without history gets the zero state.
  pub async fn user_points(&self, user_email: &str) -> Result<UserPoints> {
    Ok(
      self
        .store
        .get_points(user_email)
        .await?
        .unwrap_or_else(|| UserPoints::empty(user_email, Utc::now())),
    )
  }

  pub async fn user_ledger(
    &self,
    user_email: &str,
  ) -> Result<Vec<LedgerEntry>> {
    self.store.entries_for(user_email).await
  }

  pub async fn user_redemptions(
    &self,
    user_email: &str,
  ) -> Result<Vec<Redemption>> {
    self.store.redemptions_for(user_email).await
  }

  /// Rebuild one user's aggregate from the ledger. Safe to run at any time.
  pub async fn reconcile(&self, user_email: &str) -> Result<UserPoints> {
    self.executor.recompute(user_email, Utc::now(), false).await
  }

  // ─── Rewards & redemptions ─────────────────────────────────────────────────

  pub async fn create_reward(&self, input: NewReward) -> Result<Reward> {
    input.validate()?;
    self.store.create_reward(input).await
  }

  pub async fn update_reward(
    &self,
    reward_id: Uuid,
    update: RewardUpdate,
  ) -> Result<Reward> {
    self.store.update_reward(reward_id, update).await
  }

  pub async fn list_rewards(&self) -> Result<Vec<Reward>> {
    self.store.list_available().await
  }

  pub async fn redeem(
    &self,
    reward_id: Uuid,
    user_email: &str,
  ) -> Result<Redemption> {
    self
      .redemptions
      .request(&self.executor, reward_id, user_email, Utc::now())
      .await
  }

  pub async fn approve_redemption(
    &self,
    redemption_id: Uuid,
  ) -> Result<Redemption> {
    self.redemptions.approve(redemption_id).await
  }

  pub async fn fulfill_redemption(
    &self,
    redemption_id: Uuid,
  ) -> Result<Redemption> {
    self.redemptions.fulfill(redemption_id).await
  }

  pub async fn cancel_redemption(
    &self,
    redemption_id: Uuid,
  ) -> Result<Redemption> {
    self
      .redemptions
      .cancel(&self.executor, redemption_id, Utc::now())
      .await
  }

  // ─── Suggestions ───────────────────────────────────────────────────────────

  pub async fn analyze_suggestions(&self) -> Result<Vec<Suggestion>> {
    self.suggestions.analyze(Utc::now()).await
  }

  pub async fn engagement_signals(&self) -> Result<EngagementSignals> {
    self.suggestions.gather_signals(Utc::now()).await
  }

  pub async fn list_suggestions(
    &self,
    status: Option<SuggestionStatus>,
  ) -> Result<Vec<Suggestion>> {
    self.store.list_suggestions(status).await
  }

  pub async fn get_suggestion(
    &self,
    suggestion_id: Uuid,
  ) -> Result<Suggestion> {
    self
      .store
      .get_suggestion(suggestion_id)
      .await?
      .ok_or(Error::SuggestionNotFound(suggestion_id))
  }

  pub async fn approve_suggestion(
    &self,
    suggestion_id: Uuid,
    reviewed_by: String,
    auto_implement: bool,
  ) -> Result<Suggestion> {
    self
      .suggestions
      .approve(suggestion_id, reviewed_by, auto_implement)
      .await
  }

  pub async fn reject_suggestion(
    &self,
    suggestion_id: Uuid,
    reviewed_by: String,
  ) -> Result<Suggestion> {
    self.suggestions.reject(suggestion_id, reviewed_by).await
  }

  pub async fn implement_suggestion(
    &self,
    suggestion_id: Uuid,
    reviewed_by: String,
  ) -> Result<Suggestion> {
    self.suggestions.implement(suggestion_id, reviewed_by).await
  }
}
