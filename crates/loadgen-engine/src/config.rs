//! Generator configuration and its validation.

use std::sync::Arc;
use std::time::Duration;

use crate::caller::Caller;

/// Parameters for [`crate::start_generator`].
#[derive(Clone)]
pub struct GeneratorConfig {
    /// The target the generator drives.
    pub caller: Arc<dyn Caller>,
    /// Per-call deadline. Also used, together with `lps`, to size the
    /// concurrency cap: `floor(timeout / (1s / lps)) + 1`.
    pub timeout: Duration,
    /// Target average calls per second. The dispatcher paces ticket
    /// acquisition to this rate; a blocked consumer causes ticks to
    /// coalesce rather than queue, so bursts of catch-up calls are possible
    /// but the rate never exceeds `lps` on average.
    pub lps: u32,
    /// Total run length. Elapsing this triggers the same stop path as an
    /// explicit `GeneratorHandle::stop`.
    pub duration: Duration,
    /// Capacity of the result channel. Once full, new results are dropped
    /// and logged rather than blocking the dispatcher.
    pub result_buffer: usize,
    /// Overrides the ticket pool's derived capacity when set. Leave `None`
    /// to use `floor(timeout / (1s / lps)) + 1`.
    pub concurrency_cap: Option<usize>,
}

/// One or more configuration fields were invalid.
#[derive(Debug, thiserror::Error)]
#[error("invalid generator configuration: {}", .0.join("; "))]
pub struct ConfigError(Vec<String>);

impl ConfigError {
    pub(crate) fn new(problems: Vec<String>) -> Self {
        Self(problems)
    }
}

impl GeneratorConfig {
    /// Checks every field, collecting every problem found rather than
    /// failing on the first.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.timeout.is_zero() {
            problems.push("timeout must be greater than zero".to_string());
        }
        if self.lps == 0 {
            problems.push("lps must be greater than zero".to_string());
        }
        if self.duration.is_zero() {
            problems.push("duration must be greater than zero".to_string());
        }
        if self.result_buffer == 0 {
            problems.push("result_buffer must be greater than zero".to_string());
        }
        if self.concurrency_cap == Some(0) {
            problems.push("concurrency_cap must be greater than zero when set".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError(problems))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CallResult, RawRequest, RawResponse, ResultCode};
    use crate::caller::ErrorInfo;
    use async_trait::async_trait;

    struct NoopCaller;

    #[async_trait]
    impl Caller for NoopCaller {
        fn build_request(&self) -> RawRequest {
            RawRequest {
                id: 0,
                payload: Vec::new(),
            }
        }

        async fn call(&self, _payload: Vec<u8>, _timeout: Duration) -> Result<Vec<u8>, ErrorInfo> {
            Ok(Vec::new())
        }

        fn check(&self, request: &RawRequest, response: &RawResponse) -> CallResult {
            CallResult {
                id: request.id,
                request: request.clone(),
                response: response.clone(),
                code: ResultCode::Success,
                message: String::new(),
                elapsed: Duration::ZERO,
            }
        }
    }

    fn valid_config() -> GeneratorConfig {
        GeneratorConfig {
            caller: Arc::new(NoopCaller),
            timeout: Duration::from_millis(50),
            lps: 10,
            duration: Duration::from_secs(1),
            result_buffer: 16,
            concurrency_cap: None,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn every_zero_field_is_reported_at_once() {
        let config = GeneratorConfig {
            timeout: Duration::ZERO,
            lps: 0,
            duration: Duration::ZERO,
            result_buffer: 0,
            concurrency_cap: Some(0),
            ..valid_config()
        };

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("timeout"));
        assert!(err.contains("lps"));
        assert!(err.contains("duration"));
        assert!(err.contains("result_buffer"));
        assert!(err.contains("concurrency_cap"));
    }

    #[test]
    fn unset_concurrency_cap_is_valid() {
        let config = GeneratorConfig {
            concurrency_cap: None,
            ..valid_config()
        };
        assert!(config.validate().is_ok());
    }
}
