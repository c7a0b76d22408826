//! Handlers for the advisory suggestion pipeline.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/suggestions` | Optional `?status=pending\|approved\|...` |
//! | `POST` | `/suggestions/analyze` | Run analysis; persists new drafts |
//! | `GET`  | `/suggestions/signals` | The raw engagement signals |
//! | `GET`  | `/suggestions/:id` | 404 if not found |
//! | `POST` | `/suggestions/:id/approve` | Body: `{"reviewed_by", "auto_implement"?}` |
//! | `POST` | `/suggestions/:id/reject` | Body: `{"reviewed_by"}` |
//! | `POST` | `/suggestions/:id/implement` | Approved suggestions only |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use laurel_core::{
  store::EngineStore,
  suggestion::{EngagementSignals, Suggestion, SuggestionStatus},
};
use laurel_engine::{Engine, Notifier, SuggestionAdvisor};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── List & analysis ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<SuggestionStatus>,
}

/// `GET /suggestions[?status=<status>]`
pub async fn list<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Suggestion>>, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  Ok(Json(engine.list_suggestions(params.status).await?))
}

/// `POST /suggestions/analyze`
pub async fn analyze<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
) -> Result<Json<Vec<Suggestion>>, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  Ok(Json(engine.analyze_suggestions().await?))
}

/// `GET /suggestions/signals`
pub async fn signals<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
) -> Result<Json<EngagementSignals>, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  Ok(Json(engine.engagement_signals().await?))
}

/// `GET /suggestions/:id`
pub async fn get_one<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Suggestion>, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  Ok(Json(engine.get_suggestion(id).await?))
}

// ─── Review ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ApproveBody {
  pub reviewed_by:    String,
  /// Implement in the same call when the confidence clears the configured
  /// threshold. Off by default.
  #[serde(default)]
  pub auto_implement: bool,
}

/// `POST /suggestions/:id/approve`
pub async fn approve<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ApproveBody>,
) -> Result<Json<Suggestion>, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  let suggestion = engine
    .approve_suggestion(id, body.reviewed_by, body.auto_implement)
    .await?;
  Ok(Json(suggestion))
}

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
  pub reviewed_by: String,
}

/// `POST /suggestions/:id/reject`
pub async fn reject<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ReviewBody>,
) -> Result<Json<Suggestion>, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  Ok(Json(engine.reject_suggestion(id, body.reviewed_by).await?))
}

/// `POST /suggestions/:id/implement`
pub async fn implement<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ReviewBody>,
) -> Result<Json<Suggestion>, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  Ok(Json(engine.implement_suggestion(id, body.reviewed_by).await?))
}
