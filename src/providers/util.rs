use anyhow::Error;
use reqwest::StatusCode;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// A response that arrived but with a non-success status.
#[derive(Debug)]
pub struct HttpStatusError {
    pub status: StatusCode,
    pub target: String,
}

impl Display for HttpStatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP error: {} for {}", self.status, self.target)
    }
}

impl std::error::Error for HttpStatusError {}

/// Connection failures, timeouts, rate limiting and server errors are worth
/// another attempt; anything else will fail the same way again.
pub fn is_transient(err: &Error) -> bool {
    if let Some(status_err) = err.downcast_ref::<HttpStatusError>() {
        return status_err.status == StatusCode::TOO_MANY_REQUESTS
            || status_err.status.is_server_error();
    }
    if let Some(req_err) = err.downcast_ref::<reqwest::Error>() {
        return req_err.is_connect() || req_err.is_timeout();
    }
    false
}

/// Retries an async operation with configurable attempts and delays
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `delay_ms`: Milliseconds between retry attempts
/// - `should_retry`: Decides whether a failure is worth another attempt
///
/// # Returns
/// Either the successful result or the last error
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    retries: usize,
    delay_ms: u64,
    should_retry: impl Fn(&Error) -> bool,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt > retries || !should_retry(&err) {
                    return Err(err);
                }
                debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt, retries, err
                );
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
