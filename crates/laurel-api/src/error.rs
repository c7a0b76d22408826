//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("not found: {0}")]
  NotFound(String),

  /// The request was well-formed but lost to current state: a stock race,
  /// an empty balance, or a forbidden status transition.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store unavailable: {0}")]
  Unavailable(String),

  #[error("internal error: {0}")]
  Internal(String),
}

impl From<laurel_core::Error> for ApiError {
  fn from(err: laurel_core::Error) -> Self {
    use laurel_core::Error as E;
    let message = err.to_string();
    match err {
      E::Validation(_) => Self::BadRequest(message),
      E::RuleNotFound(_)
      | E::BadgeNotFound(_)
      | E::RewardNotFound(_)
      | E::RedemptionNotFound(_)
      | E::SuggestionNotFound(_) => Self::NotFound(message),
      E::InsufficientPoints { .. }
      | E::OutOfStock
      | E::RewardUnavailable
      | E::InvalidTransition { .. }
      | E::SuggestionNotIn { .. } => Self::Conflict(message),
      E::Store(_) => Self::Unavailable(message),
      E::Serialization(_) => Self::Internal(message),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m.clone()),
      ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.clone()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
