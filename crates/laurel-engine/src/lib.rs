//! The Laurel gamification engine: rule evaluation, award execution, the
//! redemption workflow, and the advisory suggestion pipeline.
//!
//! The engine is stateless between invocations; all durable state lives
//! behind the store traits in [`laurel_core::store`]. Everything here is
//! written to be safe under concurrent trigger processing: award application
//! is idempotent per trigger instance and stock operations are atomic in the
//! backing store.

pub mod engine;
pub mod evaluate;
pub mod execute;
pub mod notify;
pub mod redeem;
pub mod retry;
pub mod suggest;

pub use engine::{Engine, EngineConfig};
pub use evaluate::{ActionPlan, evaluate};
pub use execute::{AppliedAward, AppliedAwards, AwardExecutor};
pub use notify::{NotificationKind, Notifier, TracingNotifier};
pub use redeem::RedemptionWorkflow;
pub use suggest::{HeuristicAdvisor, SuggestionAdvisor, SuggestionPipeline};

#[cfg(test)]
mod tests;
