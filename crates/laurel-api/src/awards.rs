//! Handlers for manual admin awards.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/awards/points` | Signed amount; `instance_id` deduplicates retries |
//! | `POST` | `/awards/badges` | At most one grant per (user, badge) |

use std::sync::Arc;

use axum::{Json, extract::State};
use laurel_core::{points::UserPoints, store::EngineStore};
use laurel_engine::{Engine, Notifier, SuggestionAdvisor};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// Response shared by both award endpoints. `applied` is `false` when the
/// request was a replayed `instance_id` or a badge the user already holds;
/// nothing was written in that case.
#[derive(Debug, Serialize)]
pub struct AwardResponse {
  pub applied: bool,
  pub totals:  Option<UserPoints>,
}

impl AwardResponse {
  fn from_outcome(totals: Option<UserPoints>) -> Self {
    Self { applied: totals.is_some(), totals }
  }
}

// ─── Points ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PointsBody {
  pub user_email:  String,
  /// Signed; negative revokes points.
  pub amount:      i64,
  pub description: String,
  /// Caller-chosen identifier for this adjustment; retries must reuse it.
  pub instance_id: String,
}

/// `POST /awards/points`
pub async fn points<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
  Json(body): Json<PointsBody>,
) -> Result<Json<AwardResponse>, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  let totals = engine
    .award_points(
      &body.user_email,
      body.amount,
      body.description,
      &body.instance_id,
    )
    .await?;
  Ok(Json(AwardResponse::from_outcome(totals)))
}

// ─── Badges ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BadgeBody {
  pub user_email:  String,
  pub badge_id:    Uuid,
  pub admin_email: String,
  pub reason:      String,
}

/// `POST /awards/badges`
pub async fn badge<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
  Json(body): Json<BadgeBody>,
) -> Result<Json<AwardResponse>, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  let totals = engine
    .award_badge(&body.user_email, body.badge_id, body.admin_email, body.reason)
    .await?;
  Ok(Json(AwardResponse::from_outcome(totals)))
}
