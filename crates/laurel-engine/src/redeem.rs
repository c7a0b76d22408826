//! Reward redemption workflow.
//!
//! The precondition checks (availability, balance) happen before any write,
//! and the decisive write — stock decrement, redemption row, ledger debit —
//! is a single atomic store operation. Two users racing for the last unit
//! therefore see exactly one success and one [`Error::OutOfStock`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use laurel_core::{
  Error, Result,
  ledger::{NewLedgerEntry, ReferenceType, TransactionType},
  reward::{NewRedemption, Redemption, RedemptionStatus},
  store::{BadgeStore, LedgerStore, PointsStore, RewardStore},
};
use uuid::Uuid;

use crate::{
  execute::AwardExecutor,
  notify::{NotificationKind, Notifier, fire_and_forget},
  retry::{self, STOCK_ATTEMPTS},
};

/// Drives the redemption state machine on top of [`RewardStore`].
pub struct RedemptionWorkflow<S, N> {
  store:    Arc<S>,
  notifier: Arc<N>,
}

impl<S, N> RedemptionWorkflow<S, N>
where
  S: RewardStore + LedgerStore + BadgeStore + PointsStore,
  N: Notifier,
{
  pub fn new(store: Arc<S>, notifier: Arc<N>) -> Self {
    Self { store, notifier }
  }

  /// Redeem a reward for a user, debiting the frozen cost from the ledger.
  pub async fn request(
    &self,
    executor: &AwardExecutor<S, N>,
    reward_id: Uuid,
    user_email: &str,
    now: DateTime<Utc>,
  ) -> Result<Redemption> {
    let reward = self
      .store
      .get_reward(reward_id)
      .await?
      .ok_or(Error::RewardNotFound(reward_id))?;
    if !reward.is_available {
      return Err(Error::RewardUnavailable);
    }
    if reward.stock.is_exhausted() {
      return Err(Error::OutOfStock);
    }

    let have = self.store.sum_for(user_email).await?;
    if have < reward.points_cost {
      return Err(Error::InsufficientPoints {
        have,
        need: reward.points_cost,
      });
    }

    let input = NewRedemption {
      reward_id,
      user_email:   user_email.to_string(),
      points_spent: reward.points_cost,
    };
    let debit = NewLedgerEntry {
      user_email:       user_email.to_string(),
      amount:           -reward.points_cost,
      transaction_type: TransactionType::RedemptionDebit,
      reference_type:   Some(ReferenceType::Redemption),
      // The store fills this in with the id of the redemption it creates.
      reference_id:     None,
      description:      format!("Redeemed: {}", reward.reward_name),
    };
    // Not idempotent (each call buys another unit), so the retry bound
    // stays small and only covers transient faults.
    let redemption = retry::with_backoff(STOCK_ATTEMPTS, || {
      self.store.redeem(input.clone(), debit.clone())
    })
    .await?;

    executor.recompute(user_email, now, false).await?;
    self.notify_status(&redemption).await;
    Ok(redemption)
  }

  /// Pending -> Approved.
  pub async fn approve(&self, redemption_id: Uuid) -> Result<Redemption> {
    self.transition(redemption_id, RedemptionStatus::Approved).await
  }

  /// Approved -> Fulfilled.
  pub async fn fulfill(&self, redemption_id: Uuid) -> Result<Redemption> {
    self.transition(redemption_id, RedemptionStatus::Fulfilled).await
  }

  /// Cancel a pending or approved redemption: restore one unit of finite
  /// stock and refund exactly the frozen `points_spent`, even if the
  /// reward's cost changed in the meantime.
  pub async fn cancel(
    &self,
    executor: &AwardExecutor<S, N>,
    redemption_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<Redemption> {
    let current = self
      .store
      .get_redemption(redemption_id)
      .await?
      .ok_or(Error::RedemptionNotFound(redemption_id))?;
    if !current.status.can_transition_to(RedemptionStatus::Cancelled) {
      return Err(Error::InvalidTransition {
        from: current.status,
        to:   RedemptionStatus::Cancelled,
      });
    }

    let refund = NewLedgerEntry {
      user_email:       current.user_email.clone(),
      amount:           current.points_spent,
      transaction_type: TransactionType::RedemptionRefund,
      reference_type:   Some(ReferenceType::Redemption),
      reference_id:     Some(redemption_id),
      description:      "Redemption cancelled".to_string(),
    };
    let cancelled =
      self.store.cancel_redemption(redemption_id, refund).await?;

    executor.recompute(&cancelled.user_email, now, false).await?;
    self.notify_status(&cancelled).await;
    Ok(cancelled)
  }

  async fn transition(
    &self,
    redemption_id: Uuid,
    to: RedemptionStatus,
  ) -> Result<Redemption> {
    if self.store.get_redemption(redemption_id).await?.is_none() {
      return Err(Error::RedemptionNotFound(redemption_id));
    }
    let redemption =
      self.store.transition_redemption(redemption_id, to).await?;
    self.notify_status(&redemption).await;
    Ok(redemption)
  }

  async fn notify_status(&self, redemption: &Redemption) {
    fire_and_forget(
      self.notifier.as_ref(),
      &redemption.user_email,
      NotificationKind::RedemptionStatusChanged,
      serde_json::json!({
        "redemption_id": redemption.redemption_id,
        "reward_id":     redemption.reward_id,
        "status":        redemption.status.as_str(),
      }),
    )
    .await;
  }
}
