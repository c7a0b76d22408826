//! Handler for `/triggers`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/triggers` | Body: a [`Trigger`]; redelivery is a no-op |

use std::sync::Arc;

use axum::{Json, extract::State};
use laurel_core::{store::EngineStore, trigger::Trigger};
use laurel_engine::{AppliedAwards, Engine, Notifier, SuggestionAdvisor};

use crate::error::ApiError;

/// `POST /triggers`
///
/// Evaluates every active rule for the trigger's event and applies the
/// matches. The response lists what was actually written; a replayed
/// `trigger_instance_id` comes back with an empty `applied` list.
pub async fn process<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
  Json(trigger): Json<Trigger>,
) -> Result<Json<AppliedAwards>, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  Ok(Json(engine.process_trigger(trigger).await?))
}
