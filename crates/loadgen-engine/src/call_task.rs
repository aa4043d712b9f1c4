//! Runs a single call: races it against its timeout, classifies the
//! outcome, and guarantees the result is published and the ticket released
//! exactly once, even if the call panics.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::api::{CallResult, GeneratorInner};
use crate::tickets::Ticket;

const PENDING: u8 = 0;
const DONE: u8 = 1;
const TIMED_OUT: u8 = 2;

/// Runs one call to completion and drops `ticket` on every exit path.
///
/// The real work happens in a nested task so a panic inside the caller's
/// `call`/`check` is caught as a `JoinError` here rather than unwinding into
/// the dispatcher: the ticket still releases (it's held by this task, not
/// the nested one), and a synthetic [`crate::api::ResultCode::Fatal`] result
/// is published in its place.
pub(crate) async fn run(ticket: Ticket, inner: Arc<GeneratorInner>) {
    let task_inner = Arc::clone(&inner);
    let join = tokio::spawn(async move { execute(task_inner).await });

    if let Err(join_err) = join.await {
        if join_err.is_panic() {
            let message = panic_message(join_err.into_panic());
            tracing::error!(%message, "call task panicked");
            inner.lifecycle.publish(CallResult::fatal(message));
        }
        // A cancelled join (no path in this engine ever aborts a call task)
        // is otherwise silently ignored.
    }

    drop(ticket);
}

async fn execute(inner: Arc<GeneratorInner>) {
    let request = inner.config.caller.build_request();
    let call_status = Arc::new(AtomicU8::new(PENDING));

    let timer = tokio::spawn({
        let call_status = Arc::clone(&call_status);
        let inner = Arc::clone(&inner);
        let request = request.clone();
        let timeout = inner.config.timeout;
        async move {
            tokio::time::sleep(timeout).await;
            if call_status
                .compare_exchange(PENDING, TIMED_OUT, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                inner
                    .lifecycle
                    .publish(CallResult::timed_out(request, timeout));
            }
        }
    });

    inner.lifecycle.increment_call_count();
    let started = std::time::Instant::now();
    let outcome = inner
        .config
        .caller
        .call(request.payload.clone(), inner.config.timeout)
        .await;
    let elapsed = started.elapsed();

    if call_status
        .compare_exchange(PENDING, DONE, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        // The timer already won the race and published on our behalf.
        return;
    }
    timer.abort();

    let result = match outcome {
        Err(err) => CallResult::call_error(request, elapsed, err),
        Ok(payload) => {
            let response = crate::api::RawResponse {
                id: request.id,
                payload,
                error: None,
                elapsed,
            };
            let mut result = inner.config.caller.check(&request, &response);
            result.elapsed = elapsed;
            result
        }
    };
    inner.lifecycle.publish(result);
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "call task panicked with a non-string payload".to_string()
    }
}
