//! Retry with exponential backoff
//!
//! Wraps any `TransferSource`. Transient failures (transport errors,
//! HTTP 429/5xx, explorer rate-limit replies) are retried with a delay that
//! doubles per attempt up to a cap. Permanent failures are returned at once.
//!
//! Created: 2026-10-18

use super::{FetchError, TransferSource};
use crate::types::TransferRecord;
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

/// Escalation multiplier per failed attempt
const BACKOFF_FACTOR: u32 = 2;

/// Upper bound on a single backoff delay
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = no retries)
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }

    /// No retries at all
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Delay before retry number `retry` (1-based): initial × 2^(retry-1), capped
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = BACKOFF_FACTOR.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

/// `TransferSource` decorator adding bounded retries
pub struct RetryingSource<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: TransferSource> RetryingSource<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: TransferSource> TransferSource for RetryingSource<S> {
    async fn fetch(&self, address: &str) -> Result<Vec<TransferRecord>, FetchError> {
        let mut retry = 0;
        loop {
            match self.inner.fetch(address).await {
                Ok(records) => return Ok(records),
                Err(e) if e.is_transient() && retry < self.policy.max_retries => {
                    retry += 1;
                    let delay = self.policy.backoff(retry);
                    warn!(
                        "Fetch for {} failed ({}), retry {}/{} in {:?}",
                        address, e, retry, self.policy.max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
