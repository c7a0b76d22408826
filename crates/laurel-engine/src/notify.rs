//! Outbound notification seam.
//!
//! Notifications are fire-and-forget: they are emitted only after the
//! authoritative state transition has committed, and a delivery failure never
//! rolls that transition back. The real delivery channel (email, chat, in-app)
//! lives outside this engine, behind [`Notifier`].

use std::future::Future;

use serde::{Deserialize, Serialize};

/// What happened, from the recipient's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
  PointsAwarded,
  BadgeEarned,
  RedemptionStatusChanged,
}

/// Abstract notification sink.
pub trait Notifier: Send + Sync {
  /// Deliver (or enqueue) one notification. Errors are the implementor's
  /// problem; callers log the returned error and move on.
  fn notify<'a>(
    &'a self,
    user_email: &'a str,
    kind: NotificationKind,
    payload: serde_json::Value,
  ) -> impl Future<Output = Result<(), String>> + Send + 'a;
}

/// Default sink: records the notification in the log and nothing else.
/// Useful for tests and for deployments that poll state instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
  async fn notify(
    &self,
    user_email: &str,
    kind: NotificationKind,
    payload: serde_json::Value,
  ) -> Result<(), String> {
    tracing::info!(user_email, ?kind, %payload, "notification");
    Ok(())
  }
}

/// Log a notification failure without propagating it.
pub(crate) async fn fire_and_forget<N: Notifier>(
  notifier: &N,
  user_email: &str,
  kind: NotificationKind,
  payload: serde_json::Value,
) {
  if let Err(err) = notifier.notify(user_email, kind, payload).await {
    tracing::warn!(user_email, ?kind, err, "notification delivery failed");
  }
}
