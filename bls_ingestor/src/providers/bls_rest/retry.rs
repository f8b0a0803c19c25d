//! Retry policy for transient HTTP failures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::providers::ProviderError;

/// When and how long to wait before re-sending a chunk.
///
/// The delay before retry `n` (1-based) is
/// `min(backoff_factor * 2^(n-1), max_backoff_secs)` seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base delay in seconds.
    pub backoff_factor: f64,
    /// Upper bound for a single delay, in seconds.
    pub max_backoff_secs: f64,
    /// HTTP statuses that are retried.
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_factor: 1.2,
            max_backoff_secs: 120.0,
            retry_statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Same statuses and budget without sleeping between attempts.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff_factor: 0.0,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry == 0 || self.backoff_factor <= 0.0 {
            return Duration::ZERO;
        }
        let exp = 2f64.powi(retry.saturating_sub(1).min(30) as i32);
        let secs = (self.backoff_factor * exp).min(self.max_backoff_secs.max(0.0));
        Duration::from_secs_f64(secs)
    }

    /// True when `err` is worth another attempt under this policy.
    ///
    /// Application-level failures ([`ProviderError::Api`]) are never retried.
    pub fn is_retryable(&self, err: &ProviderError) -> bool {
        match err {
            ProviderError::Http { status, .. } => self.retry_statuses.contains(status),
            ProviderError::Reqwest { source, .. } => source.is_timeout() || source.is_connect(),
            _ => false,
        }
    }
}
