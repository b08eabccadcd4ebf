//! Shared fetch client all outbound HTTP goes through. One limiter instance
//! per run keeps the whole process under the relay-friendly request rate,
//! and transient transport failures are retried with exponential backoff.
//! Non-2xx responses and undecodable bodies are "no data", never errors.
use backoff::backoff::Backoff;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

pub const DEFAULT_REQUEST_INTERVAL_MILLIS: u64 = 200;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_BASE_MILLIS: u64 = 300;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport failure talking to {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Process-wide throttle on request starts. The last-start timestamp lives
/// behind a Mutex so concurrent callers serialize, each sleeping out the
/// remainder of the interval before stamping its own start.
pub struct RateLimiter {
    min_interval: Duration,
    last_request_started: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request_started: Mutex::new(None),
        }
    }

    pub async fn wait_turn(&self) {
        let mut last_started = self.last_request_started.lock().await;
        if let Some(started) = *last_started {
            let since_last = started.elapsed();
            if since_last < self.min_interval {
                tokio::time::sleep(self.min_interval - since_last).await;
            }
        }
        *last_started = Some(Instant::now());
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MILLIS),
        }
    }
}

/// Backoff that gives up after a fixed attempt count, waiting
/// base * 2^n between attempts.
struct BoundedBackoff {
    policy: RetryPolicy,
    failed_attempts: u32,
}

impl BoundedBackoff {
    fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            failed_attempts: 0,
        }
    }
}

impl Backoff for BoundedBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        self.failed_attempts += 1;
        if self.failed_attempts >= self.policy.max_attempts {
            return None;
        }
        Some(self.policy.backoff_base * 2u32.pow(self.failed_attempts - 1))
    }

    fn reset(&mut self) {
        self.failed_attempts = 0;
    }
}

pub struct FetchClient {
    client: reqwest::Client,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl FetchClient {
    pub fn new(limiter: RateLimiter, retry: RetryPolicy) -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("expect reqwest client to build");
        Self {
            client,
            limiter,
            retry,
        }
    }

    pub async fn get_json(
        &self,
        url: &str,
    ) -> Result<Option<Value>, FetchError> {
        self.request_json(url, None).await
    }

    pub async fn post_json(
        &self,
        url: &str,
        body: &Value,
    ) -> Result<Option<Value>, FetchError> {
        self.request_json(url, Some(body)).await
    }

    async fn request_json(
        &self,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Option<Value>, FetchError> {
        let send_once = || async {
            // every attempt waits for its own slot
            self.limiter.wait_turn().await;

            let request = match body {
                None => self.client.get(url),
                Some(body) => self.client.post(url).json(body),
            };
            let response =
                request.send().await.map_err(backoff::Error::transient)?;

            if !response.status().is_success() {
                debug!(
                    url,
                    status = %response.status(),
                    "non-success response, treating as no data"
                );
                return Ok(None);
            }

            match response.json::<Value>().await {
                Ok(value) => Ok(Some(value)),
                Err(err) => {
                    warn!(
                        url,
                        %err,
                        "failed to decode response body, treating as no data"
                    );
                    Ok(None)
                }
            }
        };

        backoff::future::retry(BoundedBackoff::new(self.retry), send_once)
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant_client(retry: RetryPolicy) -> FetchClient {
        FetchClient::new(RateLimiter::new(Duration::ZERO), retry)
    }

    #[tokio::test]
    async fn limiter_spaces_request_starts_test() {
        let limiter = RateLimiter::new(Duration::from_millis(200));
        let started = Instant::now();
        for _ in 0..10 {
            limiter.wait_turn().await;
        }
        // 10 starts means 9 full intervals between them
        assert!(started.elapsed() >= Duration::from_millis(9 * 200));
    }

    #[tokio::test]
    async fn limiter_shared_across_tasks_test() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(50)));
        let started = Instant::now();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.wait_turn().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        assert!(started.elapsed() >= Duration::from_millis(3 * 50));
    }

    #[tokio::test]
    async fn transport_failure_retries_then_surfaces_test() {
        let client = instant_client(RetryPolicy {
            max_attempts: 3,
            backoff_base: Duration::from_millis(50),
        });

        let started = Instant::now();
        // nothing listens on port 1
        let result = client.get_json("http://127.0.0.1:1/thing").await;

        assert!(matches!(result, Err(FetchError::Transport { .. })));
        // two backoff waits happened: 50ms then 100ms
        assert!(started.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn non_success_status_is_no_data_not_retried_test() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/relay/v1/data/bidtraces/builder_blocks_received")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let client = instant_client(RetryPolicy::default());
        let url = format!(
            "{}/relay/v1/data/bidtraces/builder_blocks_received",
            server.url()
        );
        let result = client.get_json(&url).await.unwrap();

        assert_eq!(result, None);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn undecodable_body_is_no_data_test() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/thing")
            .with_status(200)
            .with_body("not json at all")
            .create_async()
            .await;

        let client = instant_client(RetryPolicy::default());
        let url = format!("{}/thing", server.url());
        let result = client.get_json(&url).await.unwrap();

        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn get_json_success_test() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/thing")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"value": "0x64"}]"#)
            .create_async()
            .await;

        let client = instant_client(RetryPolicy::default());
        let url = format!("{}/thing", server.url());
        let body = client.get_json(&url).await.unwrap().unwrap();

        assert_eq!(body[0]["value"], "0x64");
    }

    #[tokio::test]
    async fn post_json_sends_body_test() {
        use serde_json::json;

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(mockito::Matcher::PartialJson(
                json!({ "method": "eth_getBlockByNumber" }),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"result": null}"#)
            .create_async()
            .await;

        let client = instant_client(RetryPolicy::default());
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_getBlockByNumber",
            "params": ["0xf42400", true],
        });
        let body = client
            .post_json(&server.url(), &payload)
            .await
            .unwrap()
            .unwrap();

        assert!(body["result"].is_null());
        mock.assert_async().await;
    }
}
