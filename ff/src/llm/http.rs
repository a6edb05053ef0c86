//! Shared HTTP send loop for provider clients
//!
//! Transient failures (network errors, 408/5xx/529, 429 with retry-after)
//! are retried here with exponential backoff. Whatever survives the retries
//! is returned as an `LlmError` and is fatal to the run.

use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use tracing::{debug, warn};

use super::LlmError;

/// Maximum number of retries for transient errors
pub(super) const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
pub(super) const INITIAL_BACKOFF_MS: u64 = 1000;

/// Upper bound on a server-requested retry-after wait
const MAX_RETRY_AFTER_SECS: u64 = 120;

/// Check if an HTTP status code is retryable
pub(super) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 500 | 502 | 503 | 504 | 529)
}

/// Send a request built by `build`, retrying transient failures
///
/// `build` is called once per attempt since a `RequestBuilder` is consumed
/// by `send`.
pub(super) async fn send_with_retry<F>(build: F) -> Result<Response, LlmError>
where
    F: Fn() -> RequestBuilder,
{
    let mut last_error = None;

    for attempt in 0..=MAX_RETRIES {
        if attempt > 0 {
            let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
            warn!(attempt, backoff_ms = backoff, "send_with_retry: retrying after transient error");
            tokio::time::sleep(Duration::from_millis(backoff)).await;
        }

        let response = match build().send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(attempt, error = %e, "send_with_retry: network error");
                last_error = Some(LlmError::Network(e));
                continue;
            }
        };

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60)
                .min(MAX_RETRY_AFTER_SECS);
            let retry_after = Duration::from_secs(retry_after);
            debug!(?retry_after, attempt, "send_with_retry: rate limited (429)");

            if attempt < MAX_RETRIES {
                tokio::time::sleep(retry_after).await;
                last_error = Some(LlmError::RateLimited { retry_after });
                continue;
            }
            return Err(LlmError::RateLimited { retry_after });
        }

        if is_retryable_status(status) && attempt < MAX_RETRIES {
            let text = response.text().await.unwrap_or_default();
            debug!(attempt, status, "send_with_retry: retryable error");
            last_error = Some(LlmError::ApiError { status, message: text });
            continue;
        }

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            debug!(%status, "send_with_retry: API error");
            return Err(LlmError::ApiError { status, message: text });
        }

        return Ok(response);
    }

    Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("Max retries exceeded".to_string())))
}
