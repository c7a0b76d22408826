//! Handlers for `/rules` endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/rules` | All rules, active or not |
//! | `POST`  | `/rules` | Body: a [`NewRule`] |
//! | `GET`   | `/rules/:id` | 404 if not found |
//! | `PATCH` | `/rules/:id` | Body: a [`RuleUpdate`]; absent fields keep their value |
//! | `POST`  | `/rules/:id/deactivate` | Soft delete |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use laurel_core::{
  rule::{NewRule, Rule, RuleUpdate},
  store::EngineStore,
};
use laurel_engine::{Engine, Notifier, SuggestionAdvisor};
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /rules`
pub async fn list<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
) -> Result<Json<Vec<Rule>>, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  Ok(Json(engine.list_rules().await?))
}

/// `POST /rules`
pub async fn create<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
  Json(body): Json<NewRule>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  let rule = engine.create_rule(body).await?;
  Ok((StatusCode::CREATED, Json(rule)))
}

/// `GET /rules/:id`
pub async fn get_one<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Rule>, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  Ok(Json(engine.get_rule(id).await?))
}

/// `PATCH /rules/:id`
pub async fn update<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<RuleUpdate>,
) -> Result<Json<Rule>, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  Ok(Json(engine.update_rule(id, body).await?))
}

/// `POST /rules/:id/deactivate`
pub async fn deactivate<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Rule>, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  Ok(Json(engine.deactivate_rule(id).await?))
}
