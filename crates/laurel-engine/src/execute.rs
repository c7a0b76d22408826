//! Award execution: turning [`ActionPlan`]s into ledger entries, badge
//! awards, and a refreshed aggregate row.
//!
//! Execution is replay-safe. Point awards carry an idempotency key derived
//! from the trigger instance, so a redelivered trigger appends nothing; badge
//! awards lean on the store's per-user uniqueness, so a duplicate grant is a
//! silent no-op that also skips the badge's `points_value`. The aggregate row
//! is recomputed from the ledger afterwards and is therefore safe to rebuild
//! any number of times.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use laurel_core::{
  Error, Result,
  badge::{AwardedBy, NewBadgeAward},
  ledger::{IdempotencyKey, NewLedgerEntry, ReferenceType, TransactionType},
  points::UserPoints,
  policy::PolicyConfig,
  rule::FrequencyLimit,
  store::{BadgeStore, LedgerStore, PointsStore},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  evaluate::ActionPlan,
  notify::{NotificationKind, Notifier, fire_and_forget},
  retry::{self, DEFAULT_ATTEMPTS},
};

// ─── Results ─────────────────────────────────────────────────────────────────

/// What one plan actually produced once conflicts were resolved.
#[derive(Debug, Clone, Serialize)]
pub struct AppliedAward {
  pub rule_id:      Uuid,
  pub rule_name:    String,
  /// Points written for the rule itself; zero if the append was a replay.
  pub points:       i64,
  /// Set only when the badge was newly granted.
  pub badge_id:     Option<Uuid>,
  /// The granted badge's `points_value` (zero when no badge was granted).
  pub badge_points: i64,
}

/// Outcome of applying a batch of plans for one trigger.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppliedAwards {
  pub applied: Vec<AppliedAward>,
  /// Plans dropped by a frequency limit or collapsed by a replay.
  pub skipped: usize,
  /// The refreshed aggregate, when anything was written.
  pub totals:  Option<UserPoints>,
}

// ─── Executor ────────────────────────────────────────────────────────────────

/// Applies evaluated plans and manual admin awards against the stores.
pub struct AwardExecutor<S, N> {
  store:    Arc<S>,
  notifier: Arc<N>,
  policy:   PolicyConfig,
}

impl<S, N> AwardExecutor<S, N>
where
  S: LedgerStore + BadgeStore + PointsStore,
  N: Notifier,
{
  pub fn new(store: Arc<S>, notifier: Arc<N>, policy: PolicyConfig) -> Self {
    Self { store, notifier, policy }
  }

  /// Apply `plans` for one user and one trigger occurrence.
  ///
  /// Plans that lose to a frequency limit, a replayed trigger, or a badge
  /// the user already holds are skipped without error. The aggregate row is
  /// refreshed once at the end, and notifications go out only after every
  /// write has committed.
  pub async fn apply(
    &self,
    user_email: &str,
    trigger_instance_id: &str,
    plans: &[ActionPlan],
    now: DateTime<Utc>,
  ) -> Result<AppliedAwards> {
    let mut outcome = AppliedAwards::default();

    for plan in plans {
      if !self.frequency_allows(plan, user_email, now).await? {
        tracing::debug!(
          rule_name = %plan.rule_name,
          user_email,
          "skipping rule, frequency limit reached"
        );
        outcome.skipped += 1;
        continue;
      }

      let mut points_written = 0;
      if plan.points != 0 {
        let key = IdempotencyKey {
          trigger_instance_id: trigger_instance_id.to_string(),
          rule_id:             Some(plan.rule_id),
          user_email:          user_email.to_string(),
        };
        let entry = NewLedgerEntry {
          user_email:       user_email.to_string(),
          amount:           plan.points,
          transaction_type: TransactionType::RuleAward,
          reference_type:   Some(ReferenceType::Rule),
          reference_id:     Some(plan.rule_id),
          description:      plan.rule_name.clone(),
        };
        match self.store.append(entry, Some(key)).await? {
          Some(_) => points_written = plan.points,
          None => {
            // Replayed trigger. The first delivery already handled the
            // badge too, so drop the whole plan.
            tracing::debug!(
              rule_name = %plan.rule_name,
              trigger_instance_id,
              "replayed trigger, award already recorded"
            );
            outcome.skipped += 1;
            continue;
          }
        }
      }

      let mut granted_badge = None;
      let mut badge_points = 0;
      if let Some(badge_id) = plan.badge_id {
        if let Some(points_value) = self
          .grant_badge(
            user_email,
            badge_id,
            AwardedBy::System,
            plan.rule_name.clone(),
          )
          .await?
        {
          granted_badge = Some(badge_id);
          badge_points = points_value;
        }
      }

      if points_written == 0 && granted_badge.is_none() {
        outcome.skipped += 1;
        continue;
      }
      outcome.applied.push(AppliedAward {
        rule_id:      plan.rule_id,
        rule_name:    plan.rule_name.clone(),
        points:       points_written,
        badge_id:     granted_badge,
        badge_points,
      });
    }

    if !outcome.applied.is_empty() {
      outcome.totals = Some(self.recompute(user_email, now, true).await?);
      self.notify_awards(user_email, plans, &outcome).await;
    }
    Ok(outcome)
  }

  /// Direct admin point grant or revocation. `instance_id` makes the
  /// adjustment replay-safe; a repeated request returns `None`.
  pub async fn apply_manual_points(
    &self,
    user_email: &str,
    amount: i64,
    description: String,
    instance_id: &str,
    now: DateTime<Utc>,
  ) -> Result<Option<UserPoints>> {
    let key = IdempotencyKey {
      trigger_instance_id: instance_id.to_string(),
      rule_id:             None,
      user_email:          user_email.to_string(),
    };
    let entry = NewLedgerEntry {
      user_email: user_email.to_string(),
      amount,
      transaction_type: TransactionType::ManualAdjustment,
      reference_type: None,
      reference_id: None,
      description: description.clone(),
    };
    let Some(written) = self.store.append(entry, Some(key)).await? else {
      return Ok(None);
    };

    let totals = self.recompute(user_email, now, false).await?;
    fire_and_forget(
      self.notifier.as_ref(),
      user_email,
      NotificationKind::PointsAwarded,
      serde_json::json!({
        "points":      written.amount,
        "description": description,
      }),
    )
    .await;
    Ok(Some(totals))
  }

  /// Direct admin badge grant. Returns `None` when the user already holds
  /// the badge.
  pub async fn apply_manual_badge(
    &self,
    user_email: &str,
    badge_id: Uuid,
    admin_email: String,
    reason: String,
    now: DateTime<Utc>,
  ) -> Result<Option<UserPoints>> {
    if self.store.get_badge(badge_id).await?.is_none() {
      return Err(Error::BadgeNotFound(badge_id));
    }
    let awarded_by = AwardedBy::Admin { email: admin_email };
    let granted = self
      .grant_badge(user_email, badge_id, awarded_by, reason.clone())
      .await?;
    if granted.is_none() {
      return Ok(None);
    }

    let totals = self.recompute(user_email, now, false).await?;
    fire_and_forget(
      self.notifier.as_ref(),
      user_email,
      NotificationKind::BadgeEarned,
      serde_json::json!({ "badge_id": badge_id, "reason": reason }),
    )
    .await;
    Ok(Some(totals))
  }

  /// Rebuild the user's aggregate row from the ledger and badge stores.
  ///
  /// `qualifying_activity` advances the streak; reconciliation passes
  /// `false` so rebuilding state never fabricates activity.
  pub async fn recompute(
    &self,
    user_email: &str,
    now: DateTime<Utc>,
    qualifying_activity: bool,
  ) -> Result<UserPoints> {
    let policy = self.policy;
    retry::with_backoff(DEFAULT_ATTEMPTS, || async {
      let total = self.store.sum_for(user_email).await?;
      let awards = self.store.awards_for(user_email).await?;
      let prev = self
        .store
        .get_points(user_email)
        .await?
        .unwrap_or_else(|| UserPoints::empty(user_email, now));

      let (streak, last_activity) = if qualifying_activity {
        (
          policy.streak.next_streak(
            prev.last_activity_date,
            prev.current_streak,
            now,
          ),
          Some(now.date_naive()),
        )
      } else {
        (prev.current_streak, prev.last_activity_date)
      };

      let points = UserPoints {
        user_email:         user_email.to_string(),
        total_points:       total,
        tier:               policy.tiers.tier_for(total),
        current_streak:     streak,
        last_activity_date: last_activity,
        badges_earned:      awards.len() as u32,
        updated_at:         now,
      };
      self.store.upsert_points(points.clone()).await?;
      Ok(points)
    })
    .await
  }

  async fn frequency_allows(
    &self,
    plan: &ActionPlan,
    user_email: &str,
    now: DateTime<Utc>,
  ) -> Result<bool> {
    if plan.frequency_limit == FrequencyLimit::Unlimited {
      return Ok(true);
    }
    let history =
      self.store.rule_applications(plan.rule_id, user_email).await?;
    Ok(plan.frequency_limit.allows(&history, now))
  }

  /// Grant a badge if the user does not already hold it, appending the
  /// badge's `points_value` as a ledger entry when it is nonzero. Returns
  /// the points value on a fresh grant, `None` on a duplicate.
  async fn grant_badge(
    &self,
    user_email: &str,
    badge_id: Uuid,
    awarded_by: AwardedBy,
    reason: String,
  ) -> Result<Option<i64>> {
    let Some(badge) = self.store.get_badge(badge_id).await? else {
      tracing::warn!(%badge_id, "rule references a missing badge");
      return Ok(None);
    };
    if !badge.is_active {
      tracing::warn!(%badge_id, "skipping award of inactive badge");
      return Ok(None);
    }

    let award = NewBadgeAward {
      user_email: user_email.to_string(),
      badge_id,
      awarded_by,
      reason,
    };
    if self.store.try_create_award(award).await?.is_none() {
      return Ok(None);
    }

    if badge.points_value != 0 {
      let entry = NewLedgerEntry {
        user_email:       user_email.to_string(),
        amount:           badge.points_value,
        transaction_type: TransactionType::BadgeEarned,
        reference_type:   Some(ReferenceType::Badge),
        reference_id:     Some(badge_id),
        description:      format!("Badge earned: {}", badge.badge_name),
      };
      self.store.append(entry, None).await?;
    }
    Ok(Some(badge.points_value))
  }

  async fn notify_awards(
    &self,
    user_email: &str,
    plans: &[ActionPlan],
    outcome: &AppliedAwards,
  ) {
    for award in &outcome.applied {
      let Some(plan) =
        plans.iter().find(|p| p.rule_id == award.rule_id)
      else {
        continue;
      };
      if plan.notify && award.points != 0 {
        fire_and_forget(
          self.notifier.as_ref(),
          user_email,
          NotificationKind::PointsAwarded,
          serde_json::json!({
            "rule_name": award.rule_name,
            "points":    award.points,
            "message":   plan.notification_message,
          }),
        )
        .await;
      }
      if let Some(badge_id) = award.badge_id {
        fire_and_forget(
          self.notifier.as_ref(),
          user_email,
          NotificationKind::BadgeEarned,
          serde_json::json!({
            "badge_id":  badge_id,
            "rule_name": award.rule_name,
          }),
        )
        .await;
      }
    }
  }
}
