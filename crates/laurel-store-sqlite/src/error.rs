//! Mapping between database faults and the shared error taxonomy.
//!
//! The store traits speak [`laurel_core::Error`], so domain errors raised
//! inside a `conn.call` closure are smuggled out through
//! [`tokio_rusqlite::Error::Other`] and unwrapped again on the async side.
//! Everything else (I/O, busy, corrupt rows) collapses into
//! [`laurel_core::Error::Store`], the retryable family.

use laurel_core::Error;

/// Wrap a domain error so it can cross the `conn.call` boundary intact.
pub(crate) fn domain(err: Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(err))
}

/// Recover the domain error if one was smuggled through; otherwise report a
/// store fault.
pub(crate) fn into_core(err: tokio_rusqlite::Error) -> Error {
  match err {
    tokio_rusqlite::Error::Other(inner) => match inner.downcast::<Error>() {
      Ok(domain) => *domain,
      Err(other) => Error::Store(other.to_string()),
    },
    other => Error::Store(other.to_string()),
  }
}

/// A row that decodes to something outside the domain (bad uuid, unknown
/// discriminant). Not retryable in practice, but it is the backend's fault,
/// so it reports as a store error.
pub(crate) fn corrupt(what: &str, value: impl std::fmt::Display) -> Error {
  Error::Store(format!("corrupt {what} in database: {value}"))
}
