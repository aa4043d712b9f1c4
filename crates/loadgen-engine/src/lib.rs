#![forbid(unsafe_code)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]

//! Concurrency engine for driving a bounded-rate call load against a
//! user-supplied [`Caller`](caller::Caller) and streaming back results.

/// Public API surface: request/response/result types and the generator handle.
pub mod api;
/// The trait a load-generator target implements.
pub mod caller;
/// Generator configuration and validation.
pub mod config;

mod call_task;
mod dispatcher;
mod lifecycle;
mod pacer;
mod tickets;

pub use api::{
    start_generator, CallResult, GeneratorHandle, GeneratorStatus, RawRequest, RawResponse,
    ResultCode,
};
pub use caller::{Caller, ErrorInfo};
pub use config::{ConfigError, GeneratorConfig};
pub use tickets::TicketPoolError;
