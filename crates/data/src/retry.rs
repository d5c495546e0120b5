use senti_trade_core::MarketDataError;
use std::future::Future;
use std::time::Duration;

/// Retries an external-service call with exponential backoff.
///
/// Only `External` errors (rate limit, auth, timeout) are retried; data
/// integrity errors surface immediately. When attempts are exhausted the
/// last error is returned so the caller can skip the cycle and report it,
/// rather than fabricating a flat result.
#[allow(clippy::cast_possible_truncation)] // backoff millis fit comfortably in u64
pub async fn with_retry<T, F, Fut>(
    label: &str,
    max_retries: u32,
    base_backoff: Duration,
    mut operation: F,
) -> Result<T, MarketDataError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MarketDataError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(MarketDataError::External(message)) if attempt < max_retries => {
                let backoff = base_backoff * 2_u32.saturating_pow(attempt);
                attempt += 1;
                tracing::warn!(
                    label,
                    attempt,
                    max_retries,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %message,
                    "external service error, retrying"
                );
                tokio::time::sleep(backoff).await;
            }
            Err(err) => return Err(err),
        }
    }
}
