//! Error taxonomy shared by the engine and every store backend.
//!
//! The variants split into four families with different caller semantics:
//! validation errors are surfaced to admins and never retried; conflict
//! outcomes (duplicate badge, replayed trigger, lost stock race) are exposed
//! as `Option`/`bool` returns by the stores rather than as errors; the
//! user-facing redemption rejections happen before any write; and
//! [`Error::Store`] marks a transient backend fault that is safe to retry.

use thiserror::Error;
use uuid::Uuid;

use crate::reward::RedemptionStatus;

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed rule, condition, or request field. Never retried.
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("rule not found: {0}")]
  RuleNotFound(Uuid),

  #[error("badge not found: {0}")]
  BadgeNotFound(Uuid),

  #[error("reward not found: {0}")]
  RewardNotFound(Uuid),

  #[error("redemption not found: {0}")]
  RedemptionNotFound(Uuid),

  #[error("suggestion not found: {0}")]
  SuggestionNotFound(Uuid),

  /// The user's balance cannot cover the reward's cost.
  #[error("insufficient points: have {have}, need {need}")]
  InsufficientPoints { have: i64, need: i64 },

  /// Finite stock is exhausted (or the conditional decrement lost a race).
  #[error("reward is out of stock")]
  OutOfStock,

  /// The reward exists but is not currently offered.
  #[error("reward is unavailable")]
  RewardUnavailable,

  #[error("invalid redemption transition: {from:?} -> {to:?}")]
  InvalidTransition {
    from: RedemptionStatus,
    to:   RedemptionStatus,
  },

  /// A suggestion action that requires a different current status.
  #[error("suggestion {id} is {actual}, expected {expected}")]
  SuggestionNotIn {
    id:       Uuid,
    expected: &'static str,
    actual:   String,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// Transient store failure. Idempotent operations may retry with backoff.
  #[error("store error: {0}")]
  Store(String),
}

impl Error {
  /// Whether a retry can possibly succeed without operator intervention.
  pub fn is_transient(&self) -> bool { matches!(self, Self::Store(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
