//! The single loop driving ticket acquisition, pacing, and call-task
//! spawning for one generator run.

use std::sync::Arc;

use crate::api::GeneratorInner;
use crate::call_task;
use crate::pacer::Pacer;

/// Runs until cancellation (explicit stop or duration expiry), then
/// finalizes the lifecycle exactly once.
///
/// Ticket acquisition is deliberately not raced against cancellation: a
/// ticket is always fully acquired before this loop checks for
/// cancellation again, so a `stop` can only ever delay the *next*
/// dispatch, never corrupt one already in flight.
pub(crate) async fn run(inner: Arc<GeneratorInner>) {
    let mut pacer = Pacer::new(inner.config.lps);
    let cancel = inner.lifecycle.cancel_token().clone();

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let ticket = inner.tickets.take().await;
        tokio::spawn(call_task::run(ticket, Arc::clone(&inner)));

        tokio::select! {
            _ = pacer.tick() => {}
            _ = cancel.cancelled() => break,
        }
    }

    inner.lifecycle.finish();
}
