//! JSON REST API for Laurel.
//!
//! Exposes an axum [`Router`] over a [`laurel_engine::Engine`]. Auth, TLS,
//! and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", laurel_api::api_router(engine.clone()))
//! ```

pub mod awards;
pub mod badges;
pub mod error;
pub mod rules;
pub mod rewards;
pub mod suggestions;
pub mod triggers;
pub mod users;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, patch, post},
};
use laurel_core::store::EngineStore;
use laurel_engine::{Engine, EngineConfig, Notifier, SuggestionAdvisor};
use serde::Deserialize;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  #[serde(default)]
  pub engine:     EngineConfig,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, N, A>(engine: Arc<Engine<S, N, A>>) -> Router<()>
where
  S: EngineStore + Send + Sync + 'static,
  N: Notifier + 'static,
  A: SuggestionAdvisor + 'static,
{
  Router::new()
    // Triggers
    .route("/triggers", post(triggers::process::<S, N, A>))
    // Rules
    .route(
      "/rules",
      get(rules::list::<S, N, A>).post(rules::create::<S, N, A>),
    )
    .route(
      "/rules/{id}",
      get(rules::get_one::<S, N, A>).patch(rules::update::<S, N, A>),
    )
    .route("/rules/{id}/deactivate", post(rules::deactivate::<S, N, A>))
    // Badges
    .route(
      "/badges",
      get(badges::list::<S, N, A>).post(badges::create::<S, N, A>),
    )
    .route("/badges/{id}", patch(badges::update::<S, N, A>))
    // Manual awards
    .route("/awards/points", post(awards::points::<S, N, A>))
    .route("/awards/badges", post(awards::badge::<S, N, A>))
    // Users
    .route("/users/{email}/points", get(users::points::<S, N, A>))
    .route("/users/{email}/ledger", get(users::ledger::<S, N, A>))
    .route(
      "/users/{email}/redemptions",
      get(users::redemptions::<S, N, A>),
    )
    .route("/users/{email}/reconcile", post(users::reconcile::<S, N, A>))
    // Rewards & redemptions
    .route(
      "/rewards",
      get(rewards::list::<S, N, A>).post(rewards::create::<S, N, A>),
    )
    .route("/rewards/{id}", patch(rewards::update::<S, N, A>))
    .route("/rewards/{id}/redeem", post(rewards::redeem::<S, N, A>))
    .route(
      "/redemptions/{id}/approve",
      post(rewards::approve::<S, N, A>),
    )
    .route(
      "/redemptions/{id}/fulfill",
      post(rewards::fulfill::<S, N, A>),
    )
    .route("/redemptions/{id}/cancel", post(rewards::cancel::<S, N, A>))
    // Suggestions
    .route("/suggestions", get(suggestions::list::<S, N, A>))
    .route(
      "/suggestions/analyze",
      post(suggestions::analyze::<S, N, A>),
    )
    .route(
      "/suggestions/signals",
      get(suggestions::signals::<S, N, A>),
    )
    .route("/suggestions/{id}", get(suggestions::get_one::<S, N, A>))
    .route(
      "/suggestions/{id}/approve",
      post(suggestions::approve::<S, N, A>),
    )
    .route(
      "/suggestions/{id}/reject",
      post(suggestions::reject::<S, N, A>),
    )
    .route(
      "/suggestions/{id}/implement",
      post(suggestions::implement::<S, N, A>),
    )
    .with_state(engine)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use laurel_engine::{HeuristicAdvisor, TracingNotifier};
  use laurel_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  type TestEngine = Engine<SqliteStore, TracingNotifier, HeuristicAdvisor>;

  async fn test_router() -> Router<()> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let engine: Arc<TestEngine> = Arc::new(Engine::new(
      Arc::new(store),
      Arc::new(TracingNotifier),
      HeuristicAdvisor::default(),
      EngineConfig::default(),
    ));
    api_router(engine)
  }

  async fn send(
    router: &Router<()>,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    let req = builder.body(body).unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  fn attendance_rule(points: i64) -> Value {
    json!({
      "rule_name": "Attendance",
      "scope": { "scope": "global" },
      "trigger_event": "event_attendance",
      "actions": { "award_points": points, "badge_id": null },
    })
  }

  fn trigger(instance: &str, user: &str) -> Value {
    json!({
      "trigger_event": "event_attendance",
      "user_email": user,
      "trigger_instance_id": instance,
    })
  }

  // ── Rules ────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_rule_then_list_roundtrip() {
    let router = test_router().await;

    let (status, created) =
      send(&router, "POST", "/rules", Some(attendance_rule(10))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["rule_name"], "Attendance");

    let (status, listed) = send(&router, "GET", "/rules", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["rule_id"], created["rule_id"]);
  }

  #[tokio::test]
  async fn empty_rule_name_is_rejected() {
    let router = test_router().await;
    let mut body = attendance_rule(10);
    body["rule_name"] = json!("   ");

    let (status, resp) = send(&router, "POST", "/rules", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["error"].as_str().unwrap().contains("rule_name"));
  }

  #[tokio::test]
  async fn unknown_rule_is_404() {
    let router = test_router().await;
    let id = uuid::Uuid::new_v4();
    let (status, _) = send(&router, "GET", &format!("/rules/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Triggers ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn trigger_awards_and_exposes_user_points() {
    let router = test_router().await;
    send(&router, "POST", "/rules", Some(attendance_rule(10))).await;

    let (status, outcome) = send(
      &router,
      "POST",
      "/triggers",
      Some(trigger("evt-1", "casey@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["applied"].as_array().unwrap().len(), 1);
    assert_eq!(outcome["applied"][0]["points"], 10);

    let (status, points) = send(
      &router,
      "GET",
      "/users/casey@example.com/points",
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(points["total_points"], 10);
  }

  #[tokio::test]
  async fn replayed_trigger_is_a_no_op() {
    let router = test_router().await;
    send(&router, "POST", "/rules", Some(attendance_rule(10))).await;
    send(
      &router,
      "POST",
      "/triggers",
      Some(trigger("evt-1", "casey@example.com")),
    )
    .await;

    let (status, outcome) = send(
      &router,
      "POST",
      "/triggers",
      Some(trigger("evt-1", "casey@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(outcome["applied"].as_array().unwrap().is_empty());
    assert_eq!(outcome["skipped"], 1);

    let (_, points) = send(
      &router,
      "GET",
      "/users/casey@example.com/points",
      None,
    )
    .await;
    assert_eq!(points["total_points"], 10);
  }

  #[tokio::test]
  async fn trigger_without_user_email_is_rejected() {
    let router = test_router().await;
    let (status, _) = send(
      &router,
      "POST",
      "/triggers",
      Some(trigger("evt-1", "  ")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  // ── Manual awards ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn manual_points_replay_reports_not_applied() {
    let router = test_router().await;
    let body = json!({
      "user_email": "casey@example.com",
      "amount": 250,
      "description": "Hackathon prize",
      "instance_id": "adj-1",
    });

    let (status, first) =
      send(&router, "POST", "/awards/points", Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["applied"], true);
    assert_eq!(first["totals"]["total_points"], 250);

    let (status, second) =
      send(&router, "POST", "/awards/points", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["applied"], false);
  }

  // ── Rewards & redemptions ────────────────────────────────────────────────────

  #[tokio::test]
  async fn redeem_without_balance_is_409() {
    let router = test_router().await;
    let (_, reward) = send(
      &router,
      "POST",
      "/rewards",
      Some(json!({
        "reward_name": "Coffee voucher",
        "points_cost": 500,
        "stock": { "kind": "unlimited" },
      })),
    )
    .await;

    let (status, resp) = send(
      &router,
      "POST",
      &format!("/rewards/{}/redeem", reward["reward_id"].as_str().unwrap()),
      Some(json!({ "user_email": "casey@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(resp["error"].as_str().unwrap().contains("insufficient"));
  }

  #[tokio::test]
  async fn redemption_lifecycle_over_http() {
    let router = test_router().await;
    send(
      &router,
      "POST",
      "/awards/points",
      Some(json!({
        "user_email": "casey@example.com",
        "amount": 600,
        "description": "Seed balance",
        "instance_id": "adj-1",
      })),
    )
    .await;
    let (_, reward) = send(
      &router,
      "POST",
      "/rewards",
      Some(json!({
        "reward_name": "Team lunch",
        "points_cost": 100,
        "stock": { "kind": "limited", "count": 1 },
      })),
    )
    .await;
    let reward_id = reward["reward_id"].as_str().unwrap().to_string();

    let (status, redemption) = send(
      &router,
      "POST",
      &format!("/rewards/{reward_id}/redeem"),
      Some(json!({ "user_email": "casey@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(redemption["status"], "pending");
    let redemption_id = redemption["redemption_id"].as_str().unwrap();

    // Fulfilment before approval violates the state machine.
    let (status, _) = send(
      &router,
      "POST",
      &format!("/redemptions/{redemption_id}/fulfill"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, approved) = send(
      &router,
      "POST",
      &format!("/redemptions/{redemption_id}/approve"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "approved");

    let (status, fulfilled) = send(
      &router,
      "POST",
      &format!("/redemptions/{redemption_id}/fulfill"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fulfilled["status"], "fulfilled");

    let (_, points) = send(
      &router,
      "GET",
      "/users/casey@example.com/points",
      None,
    )
    .await;
    assert_eq!(points["total_points"], 500);
  }

  // ── Suggestions ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn analysis_persists_and_lists_suggestions() {
    let router = test_router().await;
    // A rule with no ledger activity gets flagged by the analysis.
    send(&router, "POST", "/rules", Some(attendance_rule(10))).await;

    let (status, analyzed) =
      send(&router, "POST", "/suggestions/analyze", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!analyzed.as_array().unwrap().is_empty());

    let (status, pending) =
      send(&router, "GET", "/suggestions?status=pending", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
      pending.as_array().unwrap().len(),
      analyzed.as_array().unwrap().len()
    );
  }

  #[tokio::test]
  async fn rejecting_a_suggestion_records_the_reviewer() {
    let router = test_router().await;
    send(&router, "POST", "/rules", Some(attendance_rule(10))).await;
    let (_, analyzed) =
      send(&router, "POST", "/suggestions/analyze", None).await;
    let id = analyzed[0]["suggestion_id"].as_str().unwrap().to_string();

    let (status, rejected) = send(
      &router,
      "POST",
      &format!("/suggestions/{id}/reject"),
      Some(json!({ "reviewed_by": "admin@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["status"], "rejected");
    assert_eq!(rejected["reviewed_by"], "admin@example.com");

    // Terminal: implementing a rejected suggestion is a conflict.
    let (status, _) = send(
      &router,
      "POST",
      &format!("/suggestions/{id}/implement"),
      Some(json!({ "reviewed_by": "admin@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
  }
}
