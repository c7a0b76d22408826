//! Inbound triggers and the evaluation context.
//!
//! Global session state from the UI layer never reaches the engine; every
//! entry point receives the acting user and context explicitly.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{points::Tier, rule::TriggerEvent};

/// One occurrence of a trigger, as delivered by the business layer.
///
/// `trigger_instance_id` uniquely identifies this occurrence; replays (for
/// example a retried webhook) reuse it, which is what the executor's
/// at-most-once guarantee keys on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
  pub trigger_event:       TriggerEvent,
  pub user_email:          String,
  pub trigger_instance_id: String,
  #[serde(default)]
  pub context:             TriggerContext,
}

/// The entity bundle rules are evaluated against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerContext {
  /// The acting user's team, if any; checked by team-scoped rules.
  pub team_id:     Option<Uuid>,
  /// The acting user's current tier; used by tier multipliers.
  pub user_tier:   Option<Tier>,
  /// When the triggering action occurred. Defaults to receipt time.
  pub occurred_at: Option<DateTime<Utc>>,
  /// Named context entities, e.g. `"participation"` or `"event"`, as JSON
  /// objects. Conditions address fields inside them.
  #[serde(default)]
  pub entities:    BTreeMap<String, serde_json::Value>,
}

impl TriggerContext {
  /// Resolve a `entity.field` reference. Absent entities or fields yield
  /// `None`, which every operator treats as a failed match.
  pub fn field(&self, entity: &str, field: &str) -> Option<&serde_json::Value> {
    self.entities.get(entity)?.get(field)
  }
}
