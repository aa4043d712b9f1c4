//! The generator's state machine: status, cancellation, and result-channel
//! ownership all live here so the dispatcher has one thing to consult.

use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use std::sync::Mutex;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::api::{CallResult, GeneratorStatus};

impl GeneratorStatus {
    fn as_u8(self) -> u8 {
        match self {
            GeneratorStatus::Original => 0,
            GeneratorStatus::Starting => 1,
            GeneratorStatus::Started => 2,
            GeneratorStatus::Stopping => 3,
            GeneratorStatus::Stopped => 4,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => GeneratorStatus::Original,
            1 => GeneratorStatus::Starting,
            2 => GeneratorStatus::Started,
            3 => GeneratorStatus::Stopping,
            _ => GeneratorStatus::Stopped,
        }
    }
}

pub(crate) struct Lifecycle {
    state: AtomicU8,
    state_tx: watch::Sender<GeneratorStatus>,
    cancel: CancellationToken,
    call_count: AtomicI64,
    sender: Mutex<Option<mpsc::Sender<CallResult>>>,
}

impl Lifecycle {
    pub(crate) fn new(sender: mpsc::Sender<CallResult>, cancel: CancellationToken) -> Self {
        let (state_tx, _) = watch::channel(GeneratorStatus::Original);
        Self {
            state: AtomicU8::new(GeneratorStatus::Original.as_u8()),
            state_tx,
            cancel,
            call_count: AtomicI64::new(0),
            sender: Mutex::new(Some(sender)),
        }
    }

    /// Attempts `from -> to`. Returns whether this call is the one that made
    /// the transition.
    pub(crate) fn transition(&self, from: GeneratorStatus, to: GeneratorStatus) -> bool {
        let won = self
            .state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if won {
            let _ = self.state_tx.send(to);
        }
        won
    }

    pub(crate) fn status(&self) -> GeneratorStatus {
        GeneratorStatus::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn increment_call_count(&self) {
        self.call_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn call_count(&self) -> i64 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Publishes `result` unless the generator has already left `Started`
    /// or the result channel has already been closed, either of which means
    /// the caller has stopped listening.
    pub(crate) fn publish(&self, result: CallResult) {
        if self.status() != GeneratorStatus::Started {
            tracing::debug!(id = result.id, code = ?result.code, "dropping result: generator not started");
            return;
        }

        let guard = self.sender.lock().expect("result sender mutex poisoned");
        match guard.as_ref() {
            None => {
                tracing::debug!(id = result.id, code = ?result.code, "dropping result: result channel closed");
            }
            Some(tx) => match tx.try_send(result) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(r)) => {
                    tracing::warn!(id = r.id, code = ?r.code, "dropping result: result channel full");
                }
                Err(mpsc::error::TrySendError::Closed(r)) => {
                    tracing::debug!(id = r.id, code = ?r.code, "dropping result: result channel closed");
                }
            },
        }
    }

    /// Called once by the dispatcher as it exits its loop, regardless of
    /// which cause (explicit stop or duration expiry) triggered the exit.
    /// Idempotent: a concurrent `GeneratorHandle::stop` may have already
    /// moved the state to `Stopping`.
    pub(crate) fn finish(&self) {
        let _ = self.transition(GeneratorStatus::Started, GeneratorStatus::Stopping);
        *self.sender.lock().expect("result sender mutex poisoned") = None;
        self.state.store(GeneratorStatus::Stopped.as_u8(), Ordering::SeqCst);
        let _ = self.state_tx.send(GeneratorStatus::Stopped);
    }

    pub(crate) async fn wait_stopped(&self) {
        let mut rx = self.state_tx.subscribe();
        while *rx.borrow() != GeneratorStatus::Stopped {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RawRequest;
    use std::time::Duration;

    fn lifecycle(buffer: usize) -> (Lifecycle, mpsc::Receiver<CallResult>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Lifecycle::new(tx, CancellationToken::new()), rx)
    }

    fn dummy_result() -> CallResult {
        CallResult {
            id: 1,
            request: RawRequest {
                id: 1,
                payload: Vec::new(),
            },
            response: crate::api::RawResponse {
                id: 1,
                payload: Vec::new(),
                error: None,
                elapsed: Duration::ZERO,
            },
            code: crate::api::ResultCode::Success,
            message: String::new(),
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn only_the_matching_transition_wins() {
        let (lc, _rx) = lifecycle(1);
        assert!(lc.transition(GeneratorStatus::Original, GeneratorStatus::Starting));
        assert!(!lc.transition(GeneratorStatus::Original, GeneratorStatus::Starting));
        assert_eq!(lc.status(), GeneratorStatus::Starting);
    }

    #[tokio::test]
    async fn publish_before_started_is_dropped() {
        let (lc, mut rx) = lifecycle(4);
        // Still Original: publish must be a no-op.
        lc.publish(dummy_result());
        lc.transition(GeneratorStatus::Original, GeneratorStatus::Starting);
        lc.transition(GeneratorStatus::Starting, GeneratorStatus::Started);
        lc.publish(dummy_result());

        assert_eq!(rx.recv().await.unwrap().id, 1);
    }

    #[tokio::test]
    async fn finish_closes_the_channel_and_sets_stopped() {
        let (lc, mut rx) = lifecycle(4);
        lc.transition(GeneratorStatus::Original, GeneratorStatus::Starting);
        lc.transition(GeneratorStatus::Starting, GeneratorStatus::Started);

        lc.finish();

        assert_eq!(lc.status(), GeneratorStatus::Stopped);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn call_count_is_monotonic() {
        let (lc, _rx) = lifecycle(1);
        lc.increment_call_count();
        lc.increment_call_count();
        assert_eq!(lc.call_count(), 2);
    }
}
