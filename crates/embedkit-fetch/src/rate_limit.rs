//! Retry with exponential backoff for transient fetch failures.
//!
//! Only HTTP 429 and network-level errors are retried. Everything else
//! (404s, unexpected statuses, unparseable bodies, invalid assets) is
//! returned on the first failure.

use std::future::Future;
use std::time::Duration;

use crate::error::FetchError;

/// Upper bound on a single backoff sleep.
const MAX_DELAY_MS: u64 = 60_000;

fn is_retriable(err: &FetchError) -> bool {
    matches!(err, FetchError::RateLimited { .. } | FetchError::Http(_))
}

/// Executes `operation`, retrying retriable errors up to `max_retries`
/// additional times.
///
/// The wait before the n-th retry is `backoff_base_secs * 2^(n-1)` seconds
/// with ±25 % jitter, capped at 60 s. With `max_retries = 2` the operation
/// runs at most three times.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                let computed = backoff_base_secs
                    .saturating_mul(1000)
                    .saturating_mul(1u64 << attempt.min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                attempt += 1;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient fetch error, retrying after backoff"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
