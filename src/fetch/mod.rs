//! HTTP fetching with classified failures and bounded retries.

mod basic;
mod client;
#[cfg(test)]
pub(crate) mod fake;

pub use basic::BasicClient;
pub use client::HttpClient;

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::FetchError;

/// How many times to try a fetch and how long to wait between attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    /// Wait before attempt `n + 1` is `backoff * n`.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff: Duration::from_millis(500),
        }
    }
}

/// GETs `url`. Non-success statuses become a [`FetchError`].
async fn get<C: HttpClient>(client: &C, url: &str) -> Result<reqwest::Response, FetchError> {
    let parsed = url.parse::<reqwest::Url>().map_err(|e| FetchError::Permanent {
        url: url.to_string(),
        reason: format!("{e}"),
    })?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let resp = client
        .execute(req)
        .await
        .map_err(|e| FetchError::from_reqwest(url, &e))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::from_status(url, status));
    }
    Ok(resp)
}

/// GETs `url` and returns the raw body.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>, FetchError> {
    let bytes = get(client, url)
        .await?
        .bytes()
        .await
        .map_err(|e| FetchError::from_reqwest(url, &e))?;
    Ok(bytes.to_vec())
}

/// GETs `url` and decodes the body with the charset of its `Content-Type`,
/// falling back to UTF-8.
pub async fn fetch_text<C: HttpClient>(client: &C, url: &str) -> Result<String, FetchError> {
    get(client, url)
        .await?
        .text()
        .await
        .map_err(|e| FetchError::from_reqwest(url, &e))
}

/// Runs `op` until it succeeds, fails permanently, or `policy.max_attempts`
/// attempts have been made. The last error is returned.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < attempts => {
                debug!(attempt, error = %e, "Retrying fetch");
                tokio::time::sleep(policy.backoff * attempt as u32).await;
                attempt += 1;
            }
            Err(e) => {
                warn!(attempt, error = %e, "Fetch gave up");
                return Err(e);
            }
        }
    }
}

/// [`fetch_bytes`] under a [`RetryPolicy`].
pub async fn fetch_with_retry<C: HttpClient>(
    client: &C,
    url: &str,
    policy: &RetryPolicy,
) -> Result<Vec<u8>, FetchError> {
    with_retry(policy, || fetch_bytes(client, url)).await
}

/// [`fetch_text`] under a [`RetryPolicy`].
pub async fn fetch_text_with_retry<C: HttpClient>(
    client: &C,
    url: &str,
    policy: &RetryPolicy,
) -> Result<String, FetchError> {
    with_retry(policy, || fetch_text(client, url)).await
}

#[cfg(test)]
mod tests {
    use super::fake::{Canned, FakeClient};
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: Duration::ZERO,
        }
    }

    fn transient() -> FetchError {
        FetchError::Transient {
            url: "http://example.test".into(),
            reason: "connection reset".into(),
        }
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = AtomicUsize::new(0);
        let result = with_retry(&policy(10), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 3 {
                Err(transient())
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = with_retry(&policy(10), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(transient())
        })
        .await;

        assert!(result.unwrap_err().is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = with_retry(&policy(10), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::Permanent {
                url: "http://example.test/missing.xls".into(),
                reason: "HTTP 404 Not Found".into(),
            })
        })
        .await;

        assert!(!result.unwrap_err().is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_url_is_permanent() {
        let client = BasicClient::new().unwrap();
        let err = fetch_bytes(&client, "not a url").await.unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_not_found_fails_after_one_request() {
        let url = "http://example.test/missing.xls";
        let client = FakeClient::new().route(url, vec![Canned::status(404)]);

        let err = fetch_with_retry(&client, url, &policy(10)).await.unwrap_err();

        assert!(matches!(err, FetchError::Permanent { .. }));
        assert_eq!(client.calls(url), 1);
    }

    #[tokio::test]
    async fn test_unavailable_is_retried() {
        let url = "http://example.test/01.xls";
        let client = FakeClient::new().route(
            url,
            vec![
                Canned::status(503),
                Canned::status(503),
                Canned::ok(b"sheet".to_vec()),
            ],
        );

        let body = fetch_with_retry(&client, url, &policy(10)).await.unwrap();

        assert_eq!(body, b"sheet");
        assert_eq!(client.calls(url), 3);
    }

    #[tokio::test]
    async fn test_unavailable_until_attempts_run_out() {
        let url = "http://example.test/02.xls";
        let client = FakeClient::new().route(url, vec![Canned::status(503)]);

        let err = fetch_with_retry(&client, url, &policy(4)).await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(client.calls(url), 4);
    }

    #[tokio::test]
    async fn test_fetch_text_decodes_declared_charset() {
        let url = "http://example.test/index.php";
        let client = FakeClient::new().route(
            url,
            vec![Canned::ok(b"<caption>Mar\xE7o</caption>".to_vec())
                .content_type("text/html; charset=ISO-8859-1")],
        );

        let text = fetch_text(&client, url).await.unwrap();

        assert_eq!(text, "<caption>Março</caption>");
    }
}
