//! Bounded retry with exponential backoff for transient store faults.
//!
//! Only errors reporting [`laurel_core::Error::is_transient`] are retried;
//! domain errors surface immediately. Award-side recomputes can afford a few
//! attempts because they are idempotent; redemption's stock operation uses a
//! small bound so a scarce resource is never held behind an endless retry.

use std::{future::Future, time::Duration};

use laurel_core::Result;

/// Default attempt count for idempotent operations.
pub const DEFAULT_ATTEMPTS: u32 = 4;
/// Attempt bound for the redemption stock operation.
pub const STOCK_ATTEMPTS: u32 = 2;

const BASE_DELAY: Duration = Duration::from_millis(25);

/// Run `op` up to `attempts` times, doubling the delay between tries.
pub async fn with_backoff<T, F, Fut>(attempts: u32, op: F) -> Result<T>
where
  F: Fn() -> Fut,
  Fut: Future<Output = Result<T>>,
{
  debug_assert!(attempts >= 1);
  let mut delay = BASE_DELAY;

  for attempt in 1..=attempts {
    match op().await {
      Ok(value) => return Ok(value),
      Err(err) if err.is_transient() && attempt < attempts => {
        tracing::warn!(attempt, %err, "transient store error, retrying");
        tokio::time::sleep(delay).await;
        delay *= 2;
      }
      Err(err) => return Err(err),
    }
  }
  unreachable!("loop either returns a value or the final error")
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicU32, Ordering};

  use laurel_core::Error;

  use super::*;

  #[tokio::test]
  async fn retries_transient_then_succeeds() {
    let calls = AtomicU32::new(0);
    let result = with_backoff(3, || {
      let n = calls.fetch_add(1, Ordering::SeqCst);
      async move {
        if n < 2 {
          Err(Error::Store("connection reset".into()))
        } else {
          Ok(42)
        }
      }
    })
    .await;

    assert_eq!(result.unwrap(), 42);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn domain_errors_are_not_retried() {
    let calls = AtomicU32::new(0);
    let result: Result<()> = with_backoff(5, || {
      calls.fetch_add(1, Ordering::SeqCst);
      async { Err(Error::OutOfStock) }
    })
    .await;

    assert!(matches!(result, Err(Error::OutOfStock)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn gives_up_after_bound() {
    let calls = AtomicU32::new(0);
    let result: Result<()> = with_backoff(2, || {
      calls.fetch_add(1, Ordering::SeqCst);
      async { Err(Error::Store("still down".into())) }
    })
    .await;

    assert!(matches!(result, Err(Error::Store(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }
}
