//! Terminal result-stream consumer: tallies [`ResultCode`] counts as results
//! arrive and renders a final summary line.
//!
//! This is demonstration-only output — the engine's Non-goals explicitly
//! exclude aggregation/statistics, so none of this lives in `loadgen-engine`.

use std::time::{Duration, Instant};

use loadgen_engine::{CallResult, ResultCode};

/// Running tally of every [`ResultCode`] seen, plus timing for the final
/// achieved-rate line.
#[derive(Debug, Default)]
pub struct Tally {
    success: u64,
    warn_timeout: u64,
    err_call: u64,
    err_response: u64,
    err_callee: u64,
    fatal: u64,
    started: Option<Instant>,
}

impl Tally {
    pub fn new() -> Self {
        Self {
            started: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn record(&mut self, result: &CallResult) {
        match result.code {
            ResultCode::Success => self.success += 1,
            ResultCode::WarnTimeout => self.warn_timeout += 1,
            ResultCode::ErrCall => self.err_call += 1,
            ResultCode::ErrResponse => self.err_response += 1,
            ResultCode::ErrCallee => self.err_callee += 1,
            ResultCode::Fatal => self.fatal += 1,
        }
        tracing::trace!(id = result.id, code = ?result.code, message = %result.message, "result");
    }

    pub fn total(&self) -> u64 {
        self.success
            + self.warn_timeout
            + self.err_call
            + self.err_response
            + self.err_callee
            + self.fatal
    }

    fn elapsed(&self) -> Duration {
        self.started.map(|s| s.elapsed()).unwrap_or_default()
    }

    /// Renders the closing summary line: per-code counts, call count, and
    /// the achieved load.
    pub fn summary_line(&self, call_count: i64) -> String {
        let elapsed = self.elapsed();
        let achieved = if elapsed.as_secs_f64() > 0.0 {
            self.success as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        format!(
            "done: {} calls, {} results (success={} timeout={} err_call={} err_response={} err_callee={} fatal={}) in {:.2}s, {:.1} success/s",
            call_count,
            self.total(),
            self.success,
            self.warn_timeout,
            self.err_call,
            self.err_response,
            self.err_callee,
            self.fatal,
            elapsed.as_secs_f64(),
            achieved,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadgen_engine::{RawRequest, RawResponse};
    use std::time::Duration;

    fn result(code: ResultCode) -> CallResult {
        CallResult {
            id: 1,
            request: RawRequest {
                id: 1,
                payload: Vec::new(),
            },
            response: RawResponse {
                id: 1,
                payload: Vec::new(),
                error: None,
                elapsed: Duration::ZERO,
            },
            code,
            message: String::new(),
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn record_buckets_every_code_independently() {
        let mut tally = Tally::new();
        tally.record(&result(ResultCode::Success));
        tally.record(&result(ResultCode::Success));
        tally.record(&result(ResultCode::WarnTimeout));
        tally.record(&result(ResultCode::ErrCall));
        tally.record(&result(ResultCode::ErrResponse));
        tally.record(&result(ResultCode::ErrCallee));
        tally.record(&result(ResultCode::Fatal));

        assert_eq!(tally.success, 2);
        assert_eq!(tally.warn_timeout, 1);
        assert_eq!(tally.err_call, 1);
        assert_eq!(tally.err_response, 1);
        assert_eq!(tally.err_callee, 1);
        assert_eq!(tally.fatal, 1);
        assert_eq!(tally.total(), 7);
    }

    #[test]
    fn summary_line_reports_call_count_and_every_bucket() {
        let mut tally = Tally::new();
        tally.record(&result(ResultCode::Success));
        tally.record(&result(ResultCode::ErrCall));

        let line = tally.summary_line(5);
        assert!(line.contains("5 calls"));
        assert!(line.contains("success=1"));
        assert!(line.contains("err_call=1"));
        assert!(line.contains("timeout=0"));
    }

    #[test]
    fn empty_tally_has_zero_achieved_rate() {
        let tally = Tally::new();
        assert_eq!(tally.total(), 0);
        assert!(tally.summary_line(0).contains("0 calls"));
    }
}
