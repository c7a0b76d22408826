//! Handlers for the reward catalog and the redemption lifecycle.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/rewards` | Available rewards only, cheapest first |
//! | `POST`  | `/rewards` | Body: a [`NewReward`] |
//! | `PATCH` | `/rewards/:id` | Body: a [`RewardUpdate`] |
//! | `POST`  | `/rewards/:id/redeem` | Body: `{"user_email": ...}`; 409 on conflict |
//! | `POST`  | `/redemptions/:id/approve` | Pending only |
//! | `POST`  | `/redemptions/:id/fulfill` | Approved only |
//! | `POST`  | `/redemptions/:id/cancel` | Refunds the frozen cost |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use laurel_core::{
  reward::{NewReward, Redemption, Reward, RewardUpdate},
  store::EngineStore,
};
use laurel_engine::{Engine, Notifier, SuggestionAdvisor};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// `GET /rewards`
pub async fn list<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
) -> Result<Json<Vec<Reward>>, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  Ok(Json(engine.list_rewards().await?))
}

/// `POST /rewards`
pub async fn create<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
  Json(body): Json<NewReward>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  let reward = engine.create_reward(body).await?;
  Ok((StatusCode::CREATED, Json(reward)))
}

/// `PATCH /rewards/:id`
pub async fn update<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<RewardUpdate>,
) -> Result<Json<Reward>, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  Ok(Json(engine.update_reward(id, body).await?))
}

// ─── Redemption ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RedeemBody {
  pub user_email: String,
}

/// `POST /rewards/:id/redeem`
pub async fn redeem<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<RedeemBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  let redemption = engine.redeem(id, &body.user_email).await?;
  Ok((StatusCode::CREATED, Json(redemption)))
}

/// `POST /redemptions/:id/approve`
pub async fn approve<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Redemption>, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  Ok(Json(engine.approve_redemption(id).await?))
}

/// `POST /redemptions/:id/fulfill`
pub async fn fulfill<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Redemption>, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  Ok(Json(engine.fulfill_redemption(id).await?))
}

/// `POST /redemptions/:id/cancel`
pub async fn cancel<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Redemption>, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  Ok(Json(engine.cancel_redemption(id).await?))
}
