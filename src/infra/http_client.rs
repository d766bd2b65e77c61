use crate::error::{EtlError, Result};
use metrics::counter;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest single wait between attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt; 0 disables retrying.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff: base, 2*base, 4*base ... capped at [`MAX_BACKOFF`].
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

/// How a non-success response should be treated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Daily quota gone; retrying cannot help.
    Quota(String),
    /// The addressed resource does not exist (e.g. an uploads playlist of a channel
    /// that never uploaded).
    NotFound(String),
    /// Rate limiting or a server-side fault; worth another attempt.
    Transient(String),
    Fatal(String),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorReason>,
}

#[derive(Debug, Deserialize)]
struct ErrorReason {
    #[serde(default)]
    reason: String,
}

/// Classify an error response from its status and Google-style JSON error body.
pub fn classify_failure(status: u16, body: &str) -> Failure {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok();
    let reasons: Vec<&str> = parsed
        .as_ref()
        .map(|b| b.error.errors.iter().map(|e| e.reason.as_str()).collect())
        .unwrap_or_default();
    let message = parsed
        .as_ref()
        .map(|b| b.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.chars().take(200).collect());
    let message = format!("HTTP {status}: {message}");

    if reasons
        .iter()
        .any(|r| matches!(*r, "quotaExceeded" | "dailyLimitExceeded"))
    {
        return Failure::Quota(message);
    }
    if status == 404
        || reasons
            .iter()
            .any(|r| matches!(*r, "playlistNotFound" | "channelNotFound" | "videoNotFound"))
    {
        return Failure::NotFound(message);
    }
    if status == 429
        || status >= 500
        || reasons
            .iter()
            .any(|r| matches!(*r, "rateLimitExceeded" | "userRateLimitExceeded"))
    {
        return Failure::Transient(message);
    }
    Failure::Fatal(message)
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// JSON-over-GET client with bounded retries for transient failures.
pub struct ReqwestHttp {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl ReqwestHttp {
    pub fn new(timeout: Duration, policy: RetryPolicy) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("yt_etl/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, policy })
    }

    /// GET `url` with `query` and decode the body as `T`.
    ///
    /// `endpoint` names the call in errors, logs and metrics. Quota errors, 404s and
    /// other client errors return immediately; connection failures, 429 and 5xx are
    /// retried up to the policy's bound. A 2xx body that does not decode as `T` is an
    /// [`EtlError::Api`].
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let mut attempt = 0u32;
        loop {
            counter!("yt_etl_api_requests_total", "endpoint" => endpoint.to_string()).increment(1);

            let failure = match self.client.get(url).query(query).send().await {
                Ok(resp) if resp.status().is_success() => {
                    let bytes = resp.bytes().await.map_err(|e| {
                        EtlError::api(endpoint, format!("reading body: {}", e.without_url()))
                    })?;
                    return serde_json::from_slice(&bytes).map_err(|e| {
                        EtlError::api(endpoint, format!("malformed response: {e}"))
                    });
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    match classify_failure(status.as_u16(), &body) {
                        Failure::Quota(message) => {
                            return Err(EtlError::QuotaExceeded {
                                endpoint: endpoint.to_string(),
                                message,
                            })
                        }
                        Failure::NotFound(message) => {
                            return Err(EtlError::NotFound {
                                endpoint: endpoint.to_string(),
                                message,
                            })
                        }
                        Failure::Fatal(message) => return Err(EtlError::api(endpoint, message)),
                        Failure::Transient(message) => EtlError::api(endpoint, message),
                    }
                }
                // The URL carries the API key; keep it out of messages
                Err(e) if is_transient(&e) => EtlError::api(endpoint, e.without_url().to_string()),
                Err(e) => return Err(EtlError::api(endpoint, e.without_url().to_string())),
            };

            if attempt >= self.policy.max_retries {
                return Err(failure);
            }
            let delay = self.policy.delay_for(attempt);
            attempt += 1;
            counter!("yt_etl_api_retries_total", "endpoint" => endpoint.to_string()).increment(1);
            warn!(
                endpoint,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "Transient API failure, retrying"
            );
            tokio::time::sleep(delay).await;
            debug!(endpoint, attempt, "Retrying request");
        }
    }
}
