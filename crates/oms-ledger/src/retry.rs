//! Conflict retry: re-run a unit of work after losing an optimistic race.

use oms_types::{OrderServiceConfig, Result, constants};

/// Bounded, immediate retry on `ConcurrentUpdate`.
///
/// The work closure receives the zero-based attempt number and must
/// re-read every row it touches on each call. Any error other than
/// `ConcurrentUpdate` is returned straight away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictRetry {
    max_retries: u32,
}

impl ConflictRetry {
    /// `max_retries` re-runs after the first attempt; `0` disables retrying.
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    #[must_use]
    pub fn from_config(config: &OrderServiceConfig) -> Self {
        Self::new(config.optimistic_lock_max_retries)
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Upper bound on how many times the work closure runs.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Run `work`, re-running it on `ConcurrentUpdate` until it succeeds,
    /// fails with another error, or the retry bound is used up.
    ///
    /// # Errors
    /// The first non-retryable error, or the last `ConcurrentUpdate` once
    /// retries are exhausted.
    pub fn run<T>(&self, operation: &str, mut work: impl FnMut(u32) -> Result<T>) -> Result<T> {
        let mut attempt = 0;
        loop {
            match work(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::debug!(
                        operation,
                        attempt,
                        max_retries = self.max_retries,
                        error = %err,
                        "Optimistic conflict, retrying"
                    );
                }
                Err(err) => {
                    if err.is_retryable() {
                        tracing::warn!(
                            operation,
                            attempts = attempt + 1,
                            error = %err,
                            "Optimistic retries exhausted"
                        );
                    }
                    return Err(err);
                }
            }
        }
    }
}

impl Default for ConflictRetry {
    fn default() -> Self {
        Self::new(constants::DEFAULT_OPTIMISTIC_LOCK_MAX_RETRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oms_types::OmsError;
    use rust_decimal::Decimal;

    #[test]
    fn zero_retries_runs_once() {
        let retry = ConflictRetry::new(0);
        let mut calls = 0;
        let err = retry
            .run("test", |_| -> Result<()> {
                calls += 1;
                Err(OmsError::concurrent_update("asset TRY"))
            })
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(calls, 1);
    }

    #[test]
    fn business_errors_are_not_retried() {
        let retry = ConflictRetry::new(5);
        let mut calls = 0;
        let err = retry
            .run("test", |_| -> Result<()> {
                calls += 1;
                Err(OmsError::InsufficientFunds {
                    asset: "TRY".into(),
                    needed: Decimal::TEN,
                    available: Decimal::ONE,
                })
            })
            .unwrap_err();
        assert!(matches!(err, OmsError::InsufficientFunds { .. }));
        assert_eq!(calls, 1);
    }

    #[test]
    fn succeeds_after_conflicts() {
        let retry = ConflictRetry::default();
        let value = retry
            .run("test", |attempt| {
                if attempt < 2 {
                    Err(OmsError::concurrent_update("asset TRY"))
                } else {
                    Ok(attempt)
                }
            })
            .unwrap();
        assert_eq!(value, 2);
    }

    #[test]
    fn exhaustion_returns_last_conflict() {
        let retry = ConflictRetry::new(2);
        let mut calls = 0;
        let err = retry
            .run("test", |attempt| -> Result<()> {
                calls += 1;
                Err(OmsError::concurrent_update(format!("attempt {attempt}")))
            })
            .unwrap_err();
        assert_eq!(calls, 3);
        assert_eq!(retry.max_attempts(), 3);
        assert!(err.to_string().contains("attempt 2"), "{err}");
    }

    #[test]
    fn from_config_uses_configured_bound() {
        let cfg = OrderServiceConfig::default().with_max_retries(7);
        assert_eq!(ConflictRetry::from_config(&cfg).max_retries(), 7);
        assert_eq!(ConflictRetry::default().max_retries(), 3);
    }
}
