//! HTTP Client Abstraction
//!
//! Provides async HTTP operations plus the retry discipline shared by every
//! remote connector: bounded exponential backoff, applied to transport faults
//! only.

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{BridgeError, Result};

/// HTTP method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// HTTP request builder
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Attach a raw `Cookie` header carrying the session credential.
    pub fn cookie(self, cookie: impl Into<String>) -> Self {
        self.header("Cookie", cookie)
    }

    /// Encode `fields` as an `application/x-www-form-urlencoded` body.
    pub fn form<K, V>(mut self, fields: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let encoded = fields
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(key.as_ref()),
                    urlencoding::encode(value.as_ref())
                )
            })
            .collect::<Vec<_>>()
            .join("&");
        self.body = Some(Bytes::from(encoded));
        self.headers.insert(
            "Content-Type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// HTTP response
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Parse response body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| BridgeError::Decode(format!("JSON deserialization failed: {}", e)))
    }

    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, the first one included
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Whether to use exponential backoff
    pub use_exponential_backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
            use_exponential_backoff: true,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = if self.use_exponential_backoff {
            let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
            self.base_delay.saturating_mul(factor)
        } else {
            self.base_delay
        };
        delay.min(self.max_delay)
    }
}

/// Runs an operation under a [`RetryPolicy`].
///
/// Only errors for which [`BridgeError::is_transient`] holds are retried.
/// Status rejections and decode failures are returned after the attempt that
/// produced them. When attempts run out, the last fault is propagated.
#[derive(Debug, Clone, Default)]
pub struct RetryingTransport {
    policy: RetryPolicy,
}

impl RetryingTransport {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Drive `operation` until it succeeds, fails permanently, or exhausts
    /// the attempt budget. The closure receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(label, attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) if error.is_transient() && attempt < max_attempts => {
                    let delay = self.policy.delay_for_attempt(attempt);
                    warn!(
                        label,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Transient transport fault, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    if error.is_transient() {
                        warn!(label, attempt, error = %error, "Retry budget exhausted");
                    }
                    return Err(error);
                }
            }
        }
    }
}

/// Async HTTP client trait
///
/// This trait abstracts HTTP operations to allow platform-specific
/// implementations. `execute` performs exactly one round trip and must map
/// timeouts to [`BridgeError::Timeout`] and unreachable hosts to
/// [`BridgeError::Connection`]; non-2xx statuses are returned as ordinary
/// responses so callers decide how to classify them.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{HttpClient, HttpRequest, HttpMethod, RetryPolicy};
///
/// async fn fetch_page(client: &dyn HttpClient) -> Result<serde_json::Value> {
///     let request = HttpRequest::new(HttpMethod::Post, "https://music.163.com/api/v1/cloud/get")
///         .cookie("MUSIC_U=...")
///         .form(&[("limit", "1"), ("offset", "0")]);
///
///     let response = client.execute_with_retry(request, RetryPolicy::default()).await?;
///     response.json()
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request once
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network connection fails
    /// - Request times out
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Execute an HTTP request, retrying transport faults per `policy`
    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let label = request.url.clone();
        RetryingTransport::new(policy)
            .run(&label, |_| self.execute(request.clone()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_http_request_builder() {
        let request = HttpRequest::new(HttpMethod::Post, "https://example.com")
            .header("User-Agent", "test")
            .cookie("MUSIC_U=abc")
            .timeout(Duration::from_secs(30));

        assert_eq!(request.url, "https://example.com");
        assert_eq!(request.headers.get("User-Agent"), Some(&"test".to_string()));
        assert_eq!(request.headers.get("Cookie"), Some(&"MUSIC_U=abc".to_string()));
        assert_eq!(request.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_form_body_is_percent_encoded() {
        let request = HttpRequest::new(HttpMethod::Post, "https://example.com")
            .form(&[("song", "Hello World"), ("artist", "A&B")]);

        let body = request.body.expect("form body");
        assert_eq!(&body[..], b"song=Hello%20World&artist=A%26B");
        assert_eq!(
            request.headers.get("Content-Type"),
            Some(&"application/x-www-form-urlencoded".to_string())
        );
    }

    #[test]
    fn test_http_response_status_checks() {
        let response = HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from("test"),
        };

        assert!(response.is_success());

        let rejected = HttpResponse {
            status: 429,
            headers: HashMap::new(),
            body: Bytes::new(),
        };
        assert!(!rejected.is_success());
    }

    #[test]
    fn test_malformed_json_is_decode_error() {
        let response = HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from("not json"),
        };

        let result: Result<serde_json::Value> = response.json();
        assert!(matches!(result, Err(BridgeError::Decode(_))));
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(10));
        assert_eq!(policy.delay_for_attempt(40), Duration::from_secs(10));

        let flat = RetryPolicy {
            use_exponential_backoff: false,
            ..RetryPolicy::default()
        };
        assert_eq!(flat.delay_for_attempt(3), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_faults_are_retried_with_backoff() {
        let attempts = Arc::new(AtomicU32::new(0));
        let transport = RetryingTransport::default();
        let started = tokio::time::Instant::now();

        let counter = attempts.clone();
        let result = transport
            .run("flaky", move |attempt| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(BridgeError::Timeout("slow".into()))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(6), "waited {:?}", waited);
        assert!(waited < Duration::from_secs(7), "waited {:?}", waited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_attempts_propagate_last_fault() {
        let attempts = Arc::new(AtomicU32::new(0));
        let transport = RetryingTransport::default();

        let counter = attempts.clone();
        let result: Result<()> = transport
            .run("down", move |attempt| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { Err(BridgeError::Connection(format!("refused #{attempt}"))) }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        match result {
            Err(BridgeError::Connection(message)) => assert_eq!(message, "refused #3"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_and_decode_errors_are_not_retried() {
        let transport = RetryingTransport::default();

        for error in [
            BridgeError::HttpStatus {
                status: 503,
                message: "busy".into(),
            },
            BridgeError::Decode("garbage".into()),
        ] {
            let attempts = Arc::new(AtomicU32::new(0));
            let counter = attempts.clone();
            let mut slot = Some(error);
            let result: Result<()> = transport
                .run("fatal", move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let error = slot.take();
                    async move { Err(error.unwrap_or(BridgeError::OperationFailed("again".into()))) }
                })
                .await;

            assert!(result.is_err());
            assert_eq!(attempts.load(Ordering::SeqCst), 1);
        }
    }
}
