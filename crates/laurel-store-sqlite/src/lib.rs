//! SQLite backend for the Laurel gamification engine.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every multi-row write the engine
//! depends on for correctness (idempotent appends, stock-checked
//! redemptions, cancellations) is a single SQLite transaction.

mod encode;
mod error;
mod schema;
mod store;

pub use store::SqliteStore;
