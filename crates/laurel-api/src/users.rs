//! Handlers for per-user read endpoints and reconciliation.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/users/:email/points` | Zero state for unknown users |
//! | `GET`  | `/users/:email/ledger` | Newest first |
//! | `GET`  | `/users/:email/redemptions` | Newest first |
//! | `POST` | `/users/:email/reconcile` | Rebuild the aggregate from the ledger |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use laurel_core::{
  ledger::LedgerEntry, points::UserPoints, reward::Redemption,
  store::EngineStore,
};
use laurel_engine::{Engine, Notifier, SuggestionAdvisor};

use crate::error::ApiError;

/// `GET /users/:email/points`
pub async fn points<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
  Path(email): Path<String>,
) -> Result<Json<UserPoints>, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  Ok(Json(engine.user_points(&email).await?))
}

/// `GET /users/:email/ledger`
pub async fn ledger<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
  Path(email): Path<String>,
) -> Result<Json<Vec<LedgerEntry>>, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  Ok(Json(engine.user_ledger(&email).await?))
}

/// `GET /users/:email/redemptions`
pub async fn redemptions<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
  Path(email): Path<String>,
) -> Result<Json<Vec<Redemption>>, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  Ok(Json(engine.user_redemptions(&email).await?))
}

/// `POST /users/:email/reconcile`
///
/// Replays the ledger into a fresh aggregate row. Safe at any time; used
/// when a crash between ledger write and aggregate update is suspected.
pub async fn reconcile<S, N, A>(
  State(engine): State<Arc<Engine<S, N, A>>>,
  Path(email): Path<String>,
) -> Result<Json<UserPoints>, ApiError>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  Ok(Json(engine.reconcile(&email).await?))
}
