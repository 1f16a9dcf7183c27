//! REST client for the rubric backend.
//!
//! Talks to the `/api/v1/rubrics` resource tree:
//!
//! ```text
//! GET    /api/v1/rubrics?page&size&instructor_uuid
//! POST   /api/v1/rubrics
//! PUT    /api/v1/rubrics/{rubric}
//! DELETE /api/v1/rubrics/{rubric}
//! GET    /api/v1/rubrics/{rubric}/criteria?page&size
//! ...    /api/v1/rubrics/{rubric}/criteria/{criterion}
//! GET    /api/v1/rubrics/{rubric}/criteria/{criterion}/scoring?page&size
//! ...    /api/v1/rubrics/{rubric}/criteria/{criterion}/scoring/{level}
//! ```
//!
//! Identifiers are placed into the path as encoded segments, never spliced
//! into a format string. Transient failures of list reads are retried with
//! exponential backoff; mutations are sent exactly once. A circuit breaker
//! stops hammering a backend that keeps failing and lets a single request
//! through while it checks whether the backend has recovered.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use config::ApiConfig;
use errors::ApiError;
use gb_core::{
    ApiResponse, Criterion, CriterionInput, MessageResponse, Page, PageRequest, Rubric,
    RubricApi, RubricInput, ScoringLevel, ScoringLevelInput
};
use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, warn};

const API_PREFIX: [&str; 2] = ["api", "v1"];
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitState {
    Closed,
    Open,
    HalfOpen
}

struct CircuitBreaker {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    /// Start of the one request allowed through while half-open.
    trial_started: Option<Instant>,
    threshold: u32,
    reset_timeout: Duration
}

impl CircuitBreaker {
    fn new(threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure: None,
            trial_started: None,
            threshold,
            reset_timeout
        }
    }

    fn can_execute(&mut self) -> bool {
        match self.state {
            CircuitState::Open => match self.last_failure {
                Some(last) if last.elapsed() < self.reset_timeout => false,
                _ => {
                    self.state = CircuitState::HalfOpen;
                    self.trial_started = Some(Instant::now());
                    true
                }
            },
            // A trial that never reported back (its caller was dropped) stops
            // blocking others after one reset window.
            CircuitState::HalfOpen => match self.trial_started {
                Some(started) if started.elapsed() < self.reset_timeout => false,
                _ => {
                    self.trial_started = Some(Instant::now());
                    true
                }
            },
            CircuitState::Closed => true
        }
    }

    fn record_success(&mut self) {
        self.failure_count = 0;
        self.trial_started = None;
        self.state = CircuitState::Closed;
    }

    fn record_failure(&mut self) {
        self.failure_count += 1;
        self.last_failure = Some(Instant::now());
        self.trial_started = None;

        if self.state == CircuitState::HalfOpen || self.failure_count >= self.threshold {
            self.state = CircuitState::Open;
            warn!(
                failures = self.failure_count,
                "Rubric backend circuit breaker opened"
            );
        }
    }
}

/// One request, described well enough to be replayed on retry.
struct Call<'a> {
    method: Method,
    url: Url,
    body: Option<serde_json::Value>,
    resource: &'static str,
    id: &'a str
}

impl Call<'_> {
    /// Only list reads are idempotent; a repeated POST could create a
    /// duplicate record.
    fn retryable(&self) -> bool {
        self.method == Method::GET
    }
}

/// [`RubricApi`] over HTTP.
pub struct HttpRubricApi {
    config: ApiConfig,
    base: Url,
    http: Client,
    circuit_breaker: Arc<RwLock<CircuitBreaker>>
}

impl HttpRubricApi {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let base = Url::parse(&config.base_url).map_err(|e| ApiError::Transport {
            url: config.base_url.clone(),
            reason: format!("Invalid base URL: {e}")
        })?;
        if base.cannot_be_a_base() {
            return Err(ApiError::Transport {
                url: config.base_url.clone(),
                reason: "Base URL cannot carry a path".to_string()
            });
        }

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ApiError::Transport {
                url: config.base_url.clone(),
                reason: format!("Failed to create HTTP client: {e}")
            })?;

        let circuit_breaker =
            CircuitBreaker::new(config.circuit_breaker_threshold, config.circuit_breaker_reset());

        Ok(Self {
            config,
            base,
            http,
            circuit_breaker: Arc::new(RwLock::new(circuit_breaker))
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(API_PREFIX.iter().chain(segments.iter()));
        }
        url
    }

    fn paged(mut url: Url, page: PageRequest, extra: &[(&str, &str)]) -> Url {
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("page", &page.page.to_string())
                .append_pair("size", &page.size.to_string());
            for (key, value) in extra {
                query.append_pair(key, value);
            }
        }
        url
    }

    fn with_body<'a, B: Serialize>(
        method: Method,
        url: Url,
        body: &B,
        resource: &'static str,
        id: &'a str
    ) -> Result<Call<'a>, ApiError> {
        let body = serde_json::to_value(body).map_err(|e| ApiError::Decode {
            what: format!("{resource} payload"),
            reason: e.to_string()
        })?;
        Ok(Call {
            method,
            url,
            body: Some(body),
            resource,
            id
        })
    }

    async fn execute<T: DeserializeOwned>(&self, call: Call<'_>) -> Result<T, ApiError> {
        debug!(method = %call.method, url = %call.url, "Rubric backend request");
        let max_attempts = if call.retryable() {
            self.config.max_retries.max(1)
        } else {
            1
        };
        self.execute_with_circuit_breaker(max_attempts, || self.send_once(&call))
            .await
    }

    async fn send_once<T: DeserializeOwned>(&self, call: &Call<'_>) -> Result<T, ApiError> {
        let mut request = self
            .http
            .request(call.method.clone(), call.url.clone())
            .header(ACCEPT, "application/json");
        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = &call.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| ApiError::Transport {
            url: call.url.to_string(),
            reason: e.to_string()
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(ApiError::RateLimited { retry_after });
        }

        let body = response.bytes().await.map_err(|e| ApiError::Transport {
            url: call.url.to_string(),
            reason: e.to_string()
        })?;

        if status.is_success() {
            return decode_body(&body, call.resource);
        }

        let message = extract_message(&body);
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ApiError::Unauthorized { reason: message }
            }
            StatusCode::NOT_FOUND => ApiError::NotFound {
                resource: call.resource.to_string(),
                id: call.id.to_string()
            },
            other => ApiError::Status {
                status: other.as_u16(),
                message
            }
        })
    }

    async fn execute_with_circuit_breaker<F, Fut, T>(
        &self,
        max_attempts: u32,
        f: F
    ) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, ApiError>>
    {
        {
            let mut cb = self.circuit_breaker.write().await;
            if !cb.can_execute() {
                return Err(ApiError::Unavailable {
                    reason: "Circuit breaker is open".to_string()
                });
            }
        }

        let max_retries = max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_retries {
            match f().await {
                Ok(v) => {
                    self.circuit_breaker.write().await.record_success();
                    return Ok(v);
                }
                Err(e) if e.is_retryable() && attempt < max_retries => {
                    warn!(attempt, max_retries, error = %e, "Transient rubric backend error");
                    let delay = Duration::from_millis(100 * (1 << (attempt - 1)));
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => {
                    if counts_against_breaker(&e) {
                        self.circuit_breaker.write().await.record_failure();
                    } else {
                        self.circuit_breaker.write().await.record_success();
                    }
                    return Err(e);
                }
            }
        }

        self.circuit_breaker.write().await.record_failure();
        Err(last_error.unwrap_or_else(|| ApiError::Unavailable {
            reason: format!("Max retries ({max_retries}) exceeded")
        }))
    }
}

/// Client-side rejections (validation, missing records) mean the backend is
/// healthy.
fn counts_against_breaker(error: &ApiError) -> bool {
    match error {
        ApiError::Transport { .. } | ApiError::Unavailable { .. } => true,
        ApiError::Status { status, .. } => *status >= 500,
        ApiError::Decode { .. }
        | ApiError::Unauthorized { .. }
        | ApiError::NotFound { .. }
        | ApiError::RateLimited { .. } => false
    }
}

fn decode_body<T: DeserializeOwned>(body: &[u8], resource: &str) -> Result<T, ApiError> {
    // 204 and empty 200 bodies decode as an empty envelope.
    let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        body
    };
    serde_json::from_slice(body).map_err(|e| ApiError::Decode {
        what: format!("{resource} response"),
        reason: e.to_string()
    })
}

/// Pull a human-readable message out of an error body.
///
/// Prefers a JSON `message`, then `error`, then the raw text.
fn extract_message(body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        for field in ["message", "error"] {
            if let Some(text) = value.get(field).and_then(|v| v.as_str()) {
                return text.trim().to_string();
            }
        }
    }
    String::from_utf8_lossy(body).trim().to_string()
}

#[async_trait]
impl RubricApi for HttpRubricApi {
    async fn list_rubrics(
        &self,
        instructor_uuid: &str,
        page: PageRequest
    ) -> Result<Page<Rubric>, ApiError> {
        let url = Self::paged(
            self.endpoint(&["rubrics"]),
            page,
            &[("instructor_uuid", instructor_uuid)]
        );
        self.execute(Call {
            method: Method::GET,
            url,
            body: None,
            resource: "rubrics",
            id: instructor_uuid
        })
        .await
    }

    async fn list_criteria(
        &self,
        rubric_uuid: &str,
        page: PageRequest
    ) -> Result<Page<Criterion>, ApiError> {
        let url = Self::paged(self.endpoint(&["rubrics", rubric_uuid, "criteria"]), page, &[]);
        self.execute(Call {
            method: Method::GET,
            url,
            body: None,
            resource: "rubric",
            id: rubric_uuid
        })
        .await
    }

    async fn list_scoring(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str,
        page: PageRequest
    ) -> Result<Page<ScoringLevel>, ApiError> {
        let url = Self::paged(
            self.endpoint(&["rubrics", rubric_uuid, "criteria", criteria_uuid, "scoring"]),
            page,
            &[]
        );
        self.execute(Call {
            method: Method::GET,
            url,
            body: None,
            resource: "criterion",
            id: criteria_uuid
        })
        .await
    }

    async fn create_rubric(&self, input: &RubricInput) -> Result<ApiResponse<Rubric>, ApiError> {
        let call = Self::with_body(
            Method::POST,
            self.endpoint(&["rubrics"]),
            input,
            "rubric",
            ""
        )?;
        self.execute(call).await
    }

    async fn update_rubric(
        &self,
        rubric_uuid: &str,
        input: &RubricInput
    ) -> Result<ApiResponse<Rubric>, ApiError> {
        let call = Self::with_body(
            Method::PUT,
            self.endpoint(&["rubrics", rubric_uuid]),
            input,
            "rubric",
            rubric_uuid
        )?;
        self.execute(call).await
    }

    async fn delete_rubric(&self, rubric_uuid: &str) -> Result<MessageResponse, ApiError> {
        self.execute(Call {
            method: Method::DELETE,
            url: self.endpoint(&["rubrics", rubric_uuid]),
            body: None,
            resource: "rubric",
            id: rubric_uuid
        })
        .await
    }

    async fn create_criterion(
        &self,
        rubric_uuid: &str,
        input: &CriterionInput
    ) -> Result<ApiResponse<Criterion>, ApiError> {
        let call = Self::with_body(
            Method::POST,
            self.endpoint(&["rubrics", rubric_uuid, "criteria"]),
            input,
            "rubric",
            rubric_uuid
        )?;
        self.execute(call).await
    }

    async fn update_criterion(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str,
        input: &CriterionInput
    ) -> Result<ApiResponse<Criterion>, ApiError> {
        let call = Self::with_body(
            Method::PUT,
            self.endpoint(&["rubrics", rubric_uuid, "criteria", criteria_uuid]),
            input,
            "criterion",
            criteria_uuid
        )?;
        self.execute(call).await
    }

    async fn delete_criterion(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str
    ) -> Result<MessageResponse, ApiError> {
        self.execute(Call {
            method: Method::DELETE,
            url: self.endpoint(&["rubrics", rubric_uuid, "criteria", criteria_uuid]),
            body: None,
            resource: "criterion",
            id: criteria_uuid
        })
        .await
    }

    async fn create_scoring(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str,
        input: &ScoringLevelInput
    ) -> Result<ApiResponse<ScoringLevel>, ApiError> {
        let call = Self::with_body(
            Method::POST,
            self.endpoint(&["rubrics", rubric_uuid, "criteria", criteria_uuid, "scoring"]),
            input,
            "criterion",
            criteria_uuid
        )?;
        self.execute(call).await
    }

    async fn update_scoring(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str,
        scoring_uuid: &str,
        input: &ScoringLevelInput
    ) -> Result<ApiResponse<ScoringLevel>, ApiError> {
        let call = Self::with_body(
            Method::PUT,
            self.endpoint(&[
                "rubrics",
                rubric_uuid,
                "criteria",
                criteria_uuid,
                "scoring",
                scoring_uuid
            ]),
            input,
            "scoring level",
            scoring_uuid
        )?;
        self.execute(call).await
    }

    async fn delete_scoring(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str,
        scoring_uuid: &str
    ) -> Result<MessageResponse, ApiError> {
        self.execute(Call {
            method: Method::DELETE,
            url: self.endpoint(&[
                "rubrics",
                rubric_uuid,
                "criteria",
                criteria_uuid,
                "scoring",
                scoring_uuid
            ]),
            body: None,
            resource: "scoring level",
            id: scoring_uuid
        })
        .await
    }
}
