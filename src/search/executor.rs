//! Single-candidate HTTP attempts with timeout, retry and backoff.
//!
//! [`AttemptExecutor::attempt`] never fails: transport errors, 5xx and 429
//! responses are retried up to `max_retries` times with exponential backoff,
//! and whatever happens ends up in an [`AttemptOutcome`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use serde::Serialize;

use super::candidate::Candidate;
use super::detector::SuccessDetector;
use crate::config::{HttpMethod, SearchConfig};
use crate::error::TransportError;

/// Cap on the backoff exponent so the multiplier cannot overflow.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// One outbound request for one candidate.
#[derive(Debug, Clone)]
pub struct PinRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub param: String,
    pub pin: String,
    pub timeout: Duration,
}

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// "Send one request, get status/body or error".
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &PinRequest) -> Result<HttpReply, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest` connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds a client carrying the configured `User-Agent` and proxy.
    pub fn new(config: &SearchConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy.clone())
                .map_err(|e| TransportError::RequestFailed(e.to_string()))?;
            builder = builder.proxy(proxy);
        } else if !config.system_proxy {
            builder = builder.no_proxy();
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &PinRequest) -> Result<HttpReply, TransportError> {
        let builder = match request.method {
            HttpMethod::Get => {
                let mut url = request.url.clone();
                url.query_pairs_mut().append_pair(&request.param, &request.pin);
                self.client.get(url)
            }
            HttpMethod::Post => {
                let body = format!(
                    "{}={}",
                    urlencoding::encode(&request.param),
                    urlencoding::encode(&request.pin)
                );
                self.client
                    .post(request.url.clone())
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(body)
            }
        };

        let response = builder
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(e, request.timeout))?;

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(pin = %request.pin, status, error = %e, "Failed to read response body");
                String::new()
            }
        };

        Ok(HttpReply { status, body })
    }
}

fn classify_reqwest_error(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::RequestFailed(err.to_string())
    }
}

/// Exponential backoff: `base * 2^retry_index`, plus optional jitter.
///
/// Jitter adds a random `[0, jitter * delay)` and is clamped to `[0, 1]`, so
/// the delay before retry `k + 1` is never shorter than before retry `k`.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    base: Duration,
    jitter: f64,
}

impl BackoffPolicy {
    pub fn new(base: Duration, jitter: f64) -> Self {
        Self {
            base,
            jitter: jitter.clamp(0.0, 1.0),
        }
    }

    /// Delay before retry `retry_index` (0 for the first retry).
    pub fn delay_for(&self, retry_index: u32) -> Duration {
        let delay = self
            .base
            .saturating_mul(1u32 << retry_index.min(MAX_BACKOFF_EXPONENT));
        if self.jitter <= 0.0 || delay.is_zero() {
            return delay;
        }

        use rand::RngExt;
        let fraction: f64 = rand::rng().random_range(0.0..self.jitter);
        delay.saturating_add(delay.mul_f64(fraction))
    }
}

/// Classification of an attempt.
///
/// `TransientError` only describes an individual try; an exhausted retry loop
/// is reported as `FatalError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Success,
    Failure,
    TransientError,
    FatalError,
}

/// Final result of testing one candidate, retries included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptOutcome {
    pub candidate: Candidate,
    pub status: AttemptStatus,
    pub http_status: Option<u16>,
    pub flag: Option<String>,
    /// Retries performed after the first try.
    pub retries: u32,
    /// Last transient error, for fatal outcomes.
    pub error: Option<String>,
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        self.status == AttemptStatus::Success
    }

    pub fn is_fatal(&self) -> bool {
        self.status == AttemptStatus::FatalError
    }
}

/// Performs the HTTP attempt for one candidate.
pub struct AttemptExecutor {
    transport: Arc<dyn Transport>,
    detector: SuccessDetector,
    backoff: BackoffPolicy,
    method: HttpMethod,
    url: Url,
    param: String,
    timeout: Duration,
    delay: Duration,
    max_retries: u32,
}

impl AttemptExecutor {
    pub fn new(config: &SearchConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            detector: SuccessDetector::new(config.flag_key.clone()),
            backoff: BackoffPolicy::new(config.backoff_base, config.jitter),
            method: config.method,
            url: config.target_url.clone(),
            param: config.param_name.clone(),
            timeout: config.timeout,
            delay: config.delay,
            max_retries: config.max_retries,
        }
    }

    fn request_for(&self, candidate: Candidate) -> PinRequest {
        PinRequest {
            method: self.method,
            url: self.url.clone(),
            param: self.param.clone(),
            pin: candidate.as_pin(),
            timeout: self.timeout,
        }
    }

    fn classify(&self, reply: &HttpReply) -> (AttemptStatus, Option<String>) {
        if is_transient_status(reply.status) {
            return (AttemptStatus::TransientError, None);
        }

        let verdict = self.detector.evaluate(reply);
        if verdict.is_success {
            (AttemptStatus::Success, verdict.flag)
        } else {
            (AttemptStatus::Failure, None)
        }
    }

    /// Tests `candidate`, retrying transient failures, then applies the
    /// per-attempt rate-limit delay.
    pub async fn attempt(&self, candidate: Candidate) -> AttemptOutcome {
        let request = self.request_for(candidate);
        let mut retries = 0u32;

        let outcome = loop {
            let (http_status, error) = match self.transport.send(&request).await {
                Ok(reply) => match self.classify(&reply) {
                    (AttemptStatus::TransientError, _) => {
                        (Some(reply.status), format!("HTTP {}", reply.status))
                    }
                    (status, flag) => {
                        break AttemptOutcome {
                            candidate,
                            status,
                            http_status: Some(reply.status),
                            flag,
                            retries,
                            error: None,
                        };
                    }
                },
                Err(e) => (None, e.to_string()),
            };

            if retries >= self.max_retries {
                tracing::debug!(
                    pin = %candidate,
                    retries,
                    error = %error,
                    "Retries exhausted, abandoning candidate"
                );
                break AttemptOutcome {
                    candidate,
                    status: AttemptStatus::FatalError,
                    http_status,
                    flag: None,
                    retries,
                    error: Some(error),
                };
            }

            let delay = self.backoff.delay_for(retries);
            tracing::trace!(
                pin = %candidate,
                retry = retries + 1,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Transient error, backing off"
            );
            tokio::time::sleep(delay).await;
            retries += 1;
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        outcome
    }
}

/// 5xx and 429 are worth retrying.
pub fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}
