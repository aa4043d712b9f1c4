//! Bounded concurrency pool: one ticket per in-flight call.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Derives the concurrency cap from the per-call timeout and the target
/// rate: the number of calls that can be in flight at once if each one
/// takes the full timeout to complete, plus one for slack.
///
/// Mirrors the original generator's capacity formula; saturates at
/// `i32::MAX` instead of overflowing.
pub(crate) fn capacity_for_rate(timeout: Duration, lps: u32) -> usize {
    let timeout_ns = timeout.as_nanos().max(1);
    let interval_ns = 1_000_000_000u128 / u128::from(lps.max(1));
    let capacity = timeout_ns / interval_ns.max(1) + 1;
    capacity.min(i32::MAX as u128) as usize
}

/// A single reservation against the pool's concurrency cap. Releases back
/// to the pool on drop, so a panicking call task still frees its slot.
pub(crate) struct Ticket(#[allow(dead_code)] OwnedSemaphorePermit);

/// The pool failed to construct: the derived capacity was zero.
#[derive(Debug, thiserror::Error)]
#[error("ticket pool capacity must be greater than zero")]
pub struct TicketPoolError;

#[derive(Clone)]
pub(crate) struct TicketPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl TicketPool {
    pub(crate) fn new(capacity: usize) -> Result<Self, TicketPoolError> {
        if capacity == 0 {
            return Err(TicketPoolError);
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    /// Waits for a free slot. Not cancellation-aware: callers that need to
    /// respect a cancellation signal must race this against it themselves.
    pub(crate) async fn take(&self) -> Ticket {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .expect("ticket semaphore is never closed");
        Ticket(permit)
    }

    /// The pool's fixed capacity, as derived at construction.
    #[allow(dead_code)]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently free; `capacity() - remaining()` is the number of
    /// calls presently in flight.
    #[allow(dead_code)]
    pub(crate) fn remaining(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_matches_timeout_over_interval_plus_one() {
        // 1 lps -> 1s interval; a 2.5s timeout covers 2 full intervals, + 1.
        assert_eq!(capacity_for_rate(Duration::from_millis(2500), 1), 3);
        // 10 lps -> 100ms interval; a 1s timeout covers 10 intervals, + 1.
        assert_eq!(capacity_for_rate(Duration::from_secs(1), 10), 11);
    }

    #[test]
    fn capacity_is_always_at_least_one() {
        assert!(capacity_for_rate(Duration::from_nanos(1), 1) >= 1);
    }

    #[tokio::test]
    async fn zero_capacity_is_rejected() {
        assert!(TicketPool::new(0).is_err());
    }

    #[tokio::test]
    async fn ticket_is_released_on_drop() {
        let pool = TicketPool::new(1).unwrap();
        let ticket = pool.take().await;
        assert_eq!(pool.semaphore.available_permits(), 0);
        drop(ticket);
        assert_eq!(pool.semaphore.available_permits(), 1);
    }
}
