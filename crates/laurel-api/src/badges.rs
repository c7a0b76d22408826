//! Handlers for `/badges` endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/badges` | All badge definitions |
//! | `POST`  | `/badges` | Body: a [`NewBadge`] |
//! | `PATCH` | `/badges/:id` | Body: a [`BadgeUpdate`] |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use laurel_core::{
  badge::{Badge, BadgeUpdate, NewBadge},
  store::EngineStore,
};
use laurel_engine::{Engine, Notifier, SuggestionAdvisor};
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /badges`
pub async fn list<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
) -> Result<Json<Vec<Badge>>, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  Ok(Json(engine.list_badges().await?))
}

/// `POST /badges`
pub async fn create<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
  Json(body): Json<NewBadge>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  let badge = engine.create_badge(body).await?;
  Ok((StatusCode::CREATED, Json(badge)))
}

/// `PATCH /badges/:id`
pub async fn update<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<BadgeUpdate>,
) -> Result<Json<Badge>, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  Ok(Json(engine.update_badge(id, body).await?))
}
