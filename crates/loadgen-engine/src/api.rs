//! Request/response/result types and the handle returned by [`start_generator`].

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::caller::ErrorInfo;
use crate::config::{ConfigError, GeneratorConfig};
use crate::lifecycle::Lifecycle;
use crate::tickets::TicketPool;
use crate::{dispatcher, tickets};

/// The request handed to a [`crate::Caller`] for a single call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRequest {
    /// Monotonically increasing id assigned by the caller implementation.
    pub id: i64,
    /// Opaque request payload, already serialized by the caller.
    pub payload: Vec<u8>,
}

/// The raw outcome of a single call, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// Echoes the request id this response answers.
    pub id: i64,
    /// Opaque response payload, as returned by the target.
    pub payload: Vec<u8>,
    /// Set when the call itself failed (as opposed to succeeding with a
    /// semantically wrong answer).
    pub error: Option<ErrorInfo>,
    /// Wall-clock time the engine measured around the call.
    pub elapsed: Duration,
}

/// How a single call was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultCode {
    /// The call completed and `Caller::check` approved the response.
    Success,
    /// The per-call deadline elapsed before the call completed.
    WarnTimeout,
    /// `Caller::call` itself returned an error.
    ErrCall,
    /// The response was malformed or content-invalid per `Caller::check`.
    ErrResponse,
    /// The response was well-formed but indicated a remote-side failure.
    ErrCallee,
    /// The call task ended unexpectedly, e.g. via a panic.
    Fatal,
}

/// A single call's outcome, delivered over the generator's result stream.
#[derive(Debug, Clone)]
pub struct CallResult {
    /// The id of the request this result answers. `-1` for a [`ResultCode::Fatal`]
    /// result produced before a request could be built.
    pub id: i64,
    /// The request that produced this result.
    pub request: RawRequest,
    /// The raw response, if one was obtained.
    pub response: RawResponse,
    /// How the result was classified.
    pub code: ResultCode,
    /// Human-readable detail: the mismatch description, the timeout bound,
    /// the call error message, or the panic message.
    pub message: String,
    /// Wall-clock time the engine measured around the call.
    pub elapsed: Duration,
}

impl CallResult {
    pub(crate) fn timed_out(request: RawRequest, timeout: Duration) -> Self {
        let id = request.id;
        Self {
            id,
            request,
            response: RawResponse {
                id,
                payload: Vec::new(),
                error: None,
                elapsed: timeout,
            },
            code: ResultCode::WarnTimeout,
            message: format!("timeout! (expected duration: {timeout:?})"),
            elapsed: timeout,
        }
    }

    pub(crate) fn call_error(request: RawRequest, elapsed: Duration, err: ErrorInfo) -> Self {
        let id = request.id;
        let message = err.message.clone();
        Self {
            id,
            request,
            response: RawResponse {
                id,
                payload: Vec::new(),
                error: Some(err),
                elapsed,
            },
            code: ResultCode::ErrCall,
            message,
            elapsed,
        }
    }

    pub(crate) fn fatal(message: String) -> Self {
        Self {
            id: -1,
            request: RawRequest {
                id: -1,
                payload: Vec::new(),
            },
            response: RawResponse {
                id: -1,
                payload: Vec::new(),
                error: None,
                elapsed: Duration::ZERO,
            },
            code: ResultCode::Fatal,
            message,
            elapsed: Duration::ZERO,
        }
    }
}

/// The generator's lifecycle state, observable via [`GeneratorHandle::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneratorStatus {
    /// Constructed, never started.
    Original,
    /// `start` was called and is arming the dispatcher; transient.
    Starting,
    /// Dispatching calls.
    Started,
    /// `stop` was called, or the configured duration elapsed; draining.
    Stopping,
    /// Fully stopped; the result channel is closed once drained.
    Stopped,
}

pub(crate) struct GeneratorInner {
    pub(crate) config: GeneratorConfig,
    pub(crate) tickets: TicketPool,
    pub(crate) lifecycle: Lifecycle,
}

/// Owns a generator's lifecycle controls: `start`/`stop`/`status`/`call_count`.
///
/// Cheaply [`Clone`]able (an `Arc` around the shared state), so the control
/// surface can be handed to a signal handler while the result stream
/// returned alongside it by [`start_generator`] is drained elsewhere —
/// deliberately decoupled from consumption. `start`/`stop` are safe to call
/// from any number of clones or tasks; each transition succeeds exactly
/// once.
#[derive(Clone)]
pub struct GeneratorHandle {
    inner: Arc<GeneratorInner>,
}

impl GeneratorHandle {
    /// Arms and starts dispatching calls. Returns `true` exactly once, on
    /// the first call; later calls return `false` without effect.
    pub fn start(&self) -> bool {
        if !self
            .inner
            .lifecycle
            .transition(GeneratorStatus::Original, GeneratorStatus::Starting)
        {
            return false;
        }

        let duration = self.inner.config.duration;
        let cancel = self.inner.lifecycle.cancel_token().clone();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            cancel.cancel();
        });

        // Starting -> Started always succeeds: we hold exclusive ownership
        // of the Starting state, nothing else can observe or race it.
        self.inner
            .lifecycle
            .transition(GeneratorStatus::Starting, GeneratorStatus::Started);

        tokio::spawn(dispatcher::run(Arc::clone(&self.inner)));
        true
    }

    /// Requests a stop and waits for the generator to fully drain. Returns
    /// `true` exactly once, on whichever call (explicit `stop`, or the
    /// configured duration elapsing) first wins the transition out of
    /// `Started`; later calls return `false` without effect.
    ///
    /// A `stop` called before `start` is a no-op returning `false`
    /// immediately: the generator is still `Original` and nothing will ever
    /// drive it to `Stopped` on its own, so waiting here would hang forever.
    pub async fn stop(&self) -> bool {
        let won = self
            .inner
            .lifecycle
            .transition(GeneratorStatus::Started, GeneratorStatus::Stopping);
        if won {
            self.inner.lifecycle.cancel_token().cancel();
        } else if self.inner.lifecycle.status() == GeneratorStatus::Original {
            return false;
        }
        self.inner.lifecycle.wait_stopped().await;
        won
    }

    /// The current lifecycle state.
    pub fn status(&self) -> GeneratorStatus {
        self.inner.lifecycle.status()
    }

    /// Number of calls dispatched so far (calls started, not necessarily
    /// completed).
    pub fn call_count(&self) -> i64 {
        self.inner.lifecycle.call_count()
    }
}

/// Validates `config` and constructs a generator, ready to [`GeneratorHandle::start`].
///
/// The ticket pool's capacity is derived from `config.timeout` and
/// `config.lps`, unless `config.concurrency_cap` overrides it; construction
/// fails if that derivation, the override, or field validation fails.
///
/// Returns the control handle alongside the receiving half of its result
/// stream. The channel itself is created here (capacity `config.result_buffer`)
/// rather than supplied by the caller: this keeps `GeneratorConfig` a plain
/// value instead of threading a channel through construction, while the
/// receiver handed back remains entirely caller-owned — the engine only
/// ever holds the sending half, and closes it at `Stopped`.
pub fn start_generator(
    config: GeneratorConfig,
) -> Result<(GeneratorHandle, mpsc::Receiver<CallResult>), ConfigError> {
    config.validate()?;

    let capacity = config
        .concurrency_cap
        .unwrap_or_else(|| tickets::capacity_for_rate(config.timeout, config.lps));
    let tickets =
        TicketPool::new(capacity).map_err(|err| ConfigError::new(vec![err.to_string()]))?;

    let (tx, rx) = mpsc::channel(config.result_buffer);
    let lifecycle = Lifecycle::new(tx, CancellationToken::new());

    let inner = Arc::new(GeneratorInner {
        config,
        tickets,
        lifecycle,
    });

    Ok((GeneratorHandle { inner }, rx))
}
