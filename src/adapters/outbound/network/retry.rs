use crate::shared::{RiskError, RiskResult};
use chrono::{DateTime, Utc};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// Longest `Retry-After` delay honoured before retrying
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Retry behaviour shared by all outbound HTTP adapters
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    /// Per-attempt timeout
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(1000),
            timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff: `base * 2^(attempt - 1)`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_backoff.saturating_mul(1 << exponent)
    }
}

/// HTTP executor with bounded retries.
///
/// Network errors, timeouts, 429 and 5xx responses are retried up to
/// `max_attempts` times. A 429 waits for its `Retry-After` delay when present,
/// anything else waits for the exponential backoff. Other 4xx responses fail
/// immediately with `RiskError::Api`.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
    policy: RetryPolicy,
}

impl HttpExecutor {
    pub fn new(policy: RetryPolicy) -> RiskResult<Self> {
        let user_agent = format!("npm-risk-report/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| RiskError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, policy })
    }

    /// Sends the request built by `build`, retrying transient failures.
    ///
    /// `target` names the remote service in logs and errors.
    pub async fn execute<F>(&self, target: &str, build: F) -> RiskResult<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let outcome = match build(&self.client).timeout(self.policy.timeout).send().await {
                Ok(response) => Self::check_status(target, response).await,
                Err(e) => Err(self.transport_error(target, &e)),
            };

            match outcome {
                Ok(response) => {
                    debug!(
                        service = target,
                        attempt = attempt,
                        outcome = "success",
                        "HTTP request succeeded"
                    );
                    return Ok(response);
                }
                Err(error) if error.is_retryable() && attempt < max_attempts => {
                    let delay = self.retry_delay(&error, attempt);
                    warn!(
                        service = target,
                        attempt = attempt,
                        outcome = error.code(),
                        delay_ms = delay.as_millis() as u64,
                        "HTTP request failed, retrying: {}",
                        error
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    warn!(
                        service = target,
                        attempt = attempt,
                        outcome = error.code(),
                        "HTTP request failed: {}",
                        error
                    );
                    return Err(error);
                }
            }
        }

        Err(RiskError::internal(format!("No request was attempted for {}", target)))
    }

    /// `Retry-After` (capped) for rate limits, exponential backoff otherwise
    fn retry_delay(&self, error: &RiskError, attempt: u32) -> Duration {
        match error {
            RiskError::RateLimited {
                retry_after: Some(retry_after),
                ..
            } => (*retry_after).min(MAX_RETRY_AFTER),
            _ => self.policy.backoff(attempt),
        }
    }

    async fn check_status(target: &str, response: Response) -> RiskResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| parse_retry_after(value, Utc::now()));
            return Err(RiskError::RateLimited {
                target: target.to_string(),
                retry_after,
            });
        }

        let body = response.text().await.unwrap_or_default();
        let message: String = body.chars().take(200).collect();
        Err(RiskError::Api {
            target: target.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    fn transport_error(&self, target: &str, error: &reqwest::Error) -> RiskError {
        if error.is_timeout() {
            RiskError::Timeout {
                target: target.to_string(),
                timeout_ms: self.policy.timeout.as_millis() as u64,
            }
        } else {
            RiskError::Network {
                target: target.to_string(),
                details: error.to_string(),
            }
        }
    }
}

/// Reads a `Retry-After` value: either delay seconds or an HTTP-date.
/// A date already in the past means "retry now".
fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_backoff: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff(2), Duration::from_millis(2000));
        assert_eq!(policy.backoff(3), Duration::from_millis(4000));
    }

    #[tokio::test]
    async fn test_success_is_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/ok")
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let executor = HttpExecutor::new(fast_policy()).unwrap();
        let url = format!("{}/ok", server.url());
        let response = executor.execute("test", |c| c.get(&url)).await;

        mock.assert_async().await;
        assert!(response.is_ok());
    }

    #[tokio::test]
    async fn test_server_errors_exhaust_attempts() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/flaky")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let executor = HttpExecutor::new(fast_policy()).unwrap();
        let url = format!("{}/flaky", server.url());
        let err = executor.execute("test", |c| c.get(&url)).await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, RiskError::Api { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_client_errors_fail_fast() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let executor = HttpExecutor::new(fast_policy()).unwrap();
        let url = format!("{}/missing", server.url());
        let err = executor.execute("test", |c| c.get(&url)).await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, RiskError::Api { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_rate_limit_honours_retry_after() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/limited")
            .with_status(429)
            .with_header("retry-after", "0")
            .expect(3)
            .create_async()
            .await;

        let executor = HttpExecutor::new(fast_policy()).unwrap();
        let url = format!("{}/limited", server.url());
        let err = executor.execute("test", |c| c.get(&url)).await.unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.code(), "RATE_LIMIT");
        match err {
            RiskError::RateLimited { retry_after, .. } => {
                assert_eq!(retry_after, Some(Duration::from_secs(0)))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_with_past_http_date_retries_immediately() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/limited")
            .with_status(429)
            .with_header("retry-after", "Wed, 21 Oct 2015 07:28:00 GMT")
            .expect(3)
            .create_async()
            .await;

        let executor = HttpExecutor::new(fast_policy()).unwrap();
        let url = format!("{}/limited", server.url());
        let err = executor.execute("test", |c| c.get(&url)).await.unwrap_err();

        mock.assert_async().await;
        match err {
            RiskError::RateLimited { retry_after, .. } => assert_eq!(retry_after, Some(Duration::ZERO)),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_retry_after_forms() {
        let now = DateTime::parse_from_rfc2822("Wed, 21 Oct 2015 07:28:00 GMT")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(parse_retry_after(" 120 ", now), Some(Duration::from_secs(120)));
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:30 GMT", now),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:00:00 GMT", now),
            Some(Duration::ZERO)
        );
        assert_eq!(parse_retry_after("soon", now), None);
    }

    #[test]
    fn test_http_date_retry_after_is_capped() {
        let now = Utc::now();
        let later = (now + chrono::Duration::hours(1)).to_rfc2822();
        let retry_after = parse_retry_after(&later, now);
        assert!(retry_after.is_some_and(|delay| delay > MAX_RETRY_AFTER));

        let executor = HttpExecutor::new(fast_policy()).unwrap();
        let error = RiskError::RateLimited {
            target: "test".to_string(),
            retry_after,
        };
        assert_eq!(executor.retry_delay(&error, 1), MAX_RETRY_AFTER);
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let executor = HttpExecutor::new(RetryPolicy {
            max_attempts: 2,
            ..fast_policy()
        })
        .unwrap();
        let err = executor
            .execute("test", |c| c.get("http://127.0.0.1:9/unreachable"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RiskError::Network { .. } | RiskError::Timeout { .. }
        ));
    }
}
