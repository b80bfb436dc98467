//! Request executor: the interceptor pipeline.
//!
//! Every outbound call runs through a fixed stage order. Request side:
//! Logging (stamps `start`), CorrelationId, Authorization (when a token
//! store is attached). Response side: Logging, NotFoundToNull, Retry,
//! UnauthorizedHandler. A resubmitted request, whether from the retry
//! stage or from a refresh-and-retry, re-enters the chain from the top
//! with its accumulated metadata, so a retried request stays eligible
//! for further retries and a refreshed request stays eligible for 5xx
//! retries afterwards.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::dedup::InflightMap;
use crate::error::ApiError;
use crate::http::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, CORRELATION_ID_HEADER,
    TOKEN_EXPIRED_HEADER,
};
use crate::patch::PatchOperation;
use crate::token::TokenStore;

/// Per-logical-request state carried across resubmissions.
///
/// Never persisted; lives only as long as the pipeline invocation.
#[derive(Debug, Clone, Default)]
struct RequestMetadata {
    start: Option<Instant>,
    end: Option<Instant>,
    correlation_id: Option<String>,
    retry_number: u32,
    refresh_retry_attempted: bool,
}

/// Executes requests with the full interceptor pipeline attached.
///
/// Cloning is cheap; clones share the transport, the token store, and
/// the in-flight map, preserving single-instance-per-process semantics
/// for the deduplicator.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn HttpTransport>,
    config: ClientConfig,
    auth: Option<Arc<TokenStore>>,
    inflight: InflightMap,
}

impl RequestExecutor {
    /// Executor without the Authorization/UnauthorizedHandler stages,
    /// used for the auth endpoints themselves.
    pub fn new(transport: Arc<dyn HttpTransport>, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            auth: None,
            inflight: InflightMap::new(),
        }
    }

    /// Attach a token store, enabling bearer injection and the one-shot
    /// refresh-on-401 handler.
    pub fn with_token_store(mut self, token_store: Arc<TokenStore>) -> Self {
        self.auth = Some(token_store);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Execute a call through deduplication and the pipeline.
    ///
    /// Identical concurrent `(method, url)` calls share one network call
    /// unless `allow_simultaneous_duplicates` is set.
    pub async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<String>,
        allow_simultaneous_duplicates: bool,
    ) -> Result<HttpResponse, ApiError> {
        let mut request = HttpRequest::new(method, self.config.url(path));
        if let Some(body) = body {
            request = request.with_body(body);
        }

        self.send_request(request, allow_simultaneous_duplicates)
            .await
    }

    /// Execute a caller-built request (absolute URL, any extra headers)
    /// through deduplication and the pipeline.
    pub async fn send_request(
        &self,
        request: HttpRequest,
        allow_simultaneous_duplicates: bool,
    ) -> Result<HttpResponse, ApiError> {
        let key = InflightMap::key(request.method, &request.url);

        let pipeline = self.clone();
        self.inflight
            .run(key, allow_simultaneous_duplicates, move || {
                pipeline.run_pipeline(request)
            })
            .await
    }

    fn run_pipeline(
        self,
        template: HttpRequest,
    ) -> futures::future::BoxFuture<'static, Result<HttpResponse, ApiError>> {
        async move {
        let mut metadata = RequestMetadata::default();

        loop {
            let mut request = template.clone();

            // Logging stage, request side.
            metadata.start = Some(Instant::now());
            metadata.end = None;
            info!(
                method = %request.method,
                url = %request.url,
                "sending request"
            );

            // CorrelationId stage. Caller-supplied ids pass through; the
            // generated id is kept in metadata so resubmissions reuse it.
            if let Some(existing) = request.header(CORRELATION_ID_HEADER) {
                debug!("correlation id already attached to request");
                metadata.correlation_id = Some(existing.to_string());
            } else {
                let id = metadata
                    .correlation_id
                    .clone()
                    .unwrap_or_else(|| Uuid::new_v4().to_string());
                request.set_header(CORRELATION_ID_HEADER, id.clone());
                metadata.correlation_id = Some(id);
            }

            // Authorization stage. Runs on every attempt, so a token
            // refreshed between attempts is picked up automatically.
            if let Some(token_store) = &self.auth {
                if let Some(token) = token_store.get_access_token().await? {
                    request.set_header("authorization", format!("Bearer {token}"));
                }
            }

            let outcome = self.transport.execute(request).await;

            // Logging stage, response side.
            metadata.end = Some(Instant::now());
            let duration_ms = match (metadata.start, metadata.end) {
                (Some(start), Some(end)) => end.duration_since(start).as_millis() as u64,
                _ => 0,
            };

            match &outcome {
                Ok(response) if response.is_success() => {
                    info!(
                        method = %template.method,
                        url = %template.url,
                        status = response.status,
                        duration_ms,
                        correlation_id = metadata.correlation_id.as_deref(),
                        "received response"
                    );
                }
                Ok(response) if response.status < 500 => {
                    warn!(
                        method = %template.method,
                        url = %template.url,
                        status = response.status,
                        duration_ms,
                        correlation_id = metadata.correlation_id.as_deref(),
                        "received response"
                    );
                }
                Ok(response) => {
                    error!(
                        method = %template.method,
                        url = %template.url,
                        status = response.status,
                        duration_ms,
                        correlation_id = metadata.correlation_id.as_deref(),
                        "received response"
                    );
                }
                Err(transport_error) => {
                    error!(
                        method = %template.method,
                        url = %template.url,
                        error = %transport_error,
                        correlation_id = metadata.correlation_id.as_deref(),
                        "unexpected error during response pipeline"
                    );
                }
            }

            match outcome {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(mut response) => {
                    // NotFoundToNull stage: a GET 404 is a successful
                    // null result, not an error.
                    if template.method == HttpMethod::Get && response.status == 404 {
                        info!(
                            url = %template.url,
                            "404 on GET translated to null response"
                        );
                        response.body = String::from("null");
                        return Ok(response);
                    }

                    // Retry stage.
                    if self
                        .retry_stage(&mut metadata, Some(response.status), &template)
                        .await
                    {
                        continue;
                    }

                    // UnauthorizedHandler stage.
                    if let Some(token_store) = &self.auth {
                        if response.status == 401
                            && response.header(TOKEN_EXPIRED_HEADER).is_some()
                            && !metadata.refresh_retry_attempted
                        {
                            debug!(
                                "{TOKEN_EXPIRED_HEADER} present with 401 status, \
                                 attempting token refresh"
                            );
                            token_store.refresh_access_token().await?;
                            metadata.refresh_retry_attempted = true;
                            info!("access token refreshed, retrying original request");
                            continue;
                        }

                        if response.status == 401 || response.status == 403 {
                            warn!(status = response.status, "unauthorized action attempted");
                            token_store.notify_unauthorized(response.status);
                        }
                    }

                    return Err(ApiError::Status {
                        status: response.status,
                        body: response.body,
                    });
                }
                Err(transport_error) => {
                    if self.retry_stage(&mut metadata, None, &template).await {
                        continue;
                    }

                    return Err(ApiError::Network(transport_error.to_string()));
                }
            }
        }
        }
        .boxed()
    }

    /// Decide retry eligibility and, when eligible, consume the backoff
    /// delay. Returns whether the request should be resubmitted.
    async fn retry_stage(
        &self,
        metadata: &mut RequestMetadata,
        status: Option<u16>,
        template: &HttpRequest,
    ) -> bool {
        let retry = self.config.retry;

        if !retry.enabled {
            debug!("retry not enabled");
            return false;
        }

        if metadata.retry_number >= retry.max_retry_attempts {
            info!(
                max_retry_attempts = retry.max_retry_attempts,
                url = %template.url,
                "max retries reached, no longer attempting retries"
            );
            return false;
        }

        let eligible = match status {
            // Network-level failure, no response at all.
            None => true,
            Some(status) => {
                if !retry_eligible_method(template.method) {
                    debug!(
                        method = %template.method,
                        "request method is not eligible for retry"
                    );
                    false
                } else {
                    retry_eligible_status(status)
                }
            }
        };

        if !eligible {
            return false;
        }

        metadata.retry_number += 1;
        let delay_ms = backoff_delay_ms(metadata.retry_number, retry.delay_time_ms);

        info!(
            retry_number = metadata.retry_number,
            max_retry_attempts = retry.max_retry_attempts,
            delay_ms,
            url = %template.url,
            "retrying request"
        );

        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        true
    }

    // ---- typed helpers -----------------------------------------------

    /// GET returning `Ok(None)` on 404.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ApiError> {
        let response = self.execute(HttpMethod::Get, path, None, false).await?;
        decode_optional(&response.body)
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let payload = encode_body(body)?;
        let response = self
            .execute(HttpMethod::Post, path, Some(payload), false)
            .await?;
        decode_required(&response.body)
    }

    /// POST where the response body is irrelevant.
    pub async fn post_no_content<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        let payload = encode_body(body)?;
        self.execute(HttpMethod::Post, path, Some(payload), false)
            .await?;
        Ok(())
    }

    pub async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let payload = encode_body(body)?;
        let response = self
            .execute(HttpMethod::Put, path, Some(payload), false)
            .await?;
        decode_required(&response.body)
    }

    /// PATCH with a JSON-Patch document body.
    pub async fn patch_json<T: DeserializeOwned>(
        &self,
        path: &str,
        document: &[PatchOperation],
    ) -> Result<T, ApiError> {
        let payload = encode_body(&document)?;
        let response = self
            .execute(HttpMethod::Patch, path, Some(payload), false)
            .await?;
        decode_required(&response.body)
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute(HttpMethod::Delete, path, None, false).await?;
        Ok(())
    }
}

fn encode_body<B: Serialize>(body: &B) -> Result<String, ApiError> {
    serde_json::to_string(body)
        .map_err(|e| ApiError::Decode(format!("failed to serialize request body: {e}")))
}

fn decode_required<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

fn decode_optional<T: DeserializeOwned>(body: &str) -> Result<Option<T>, ApiError> {
    if body.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Idempotent-by-convention methods are the only ones worth resubmitting
/// once an HTTP response exists.
const fn retry_eligible_method(method: HttpMethod) -> bool {
    matches!(
        method,
        HttpMethod::Get
            | HttpMethod::Put
            | HttpMethod::Options
            | HttpMethod::Delete
            | HttpMethod::Head
    )
}

/// Status bands eligible for retry:
/// 1xx (request still processing), 429 (too many requests), 5xx (server
/// errors). 2xx/3xx/other 4xx are never retried.
const fn retry_eligible_status(status: u16) -> bool {
    matches!(status, 100..=199 | 429 | 500..=599)
}

/// First resubmission goes out immediately; each one after doubles the
/// base delay: `0, 2d, 4d, 8d, ...`.
fn backoff_delay_ms(retry_number: u32, delay_time_ms: u64) -> u64 {
    if retry_number <= 1 {
        0
    } else {
        delay_time_ms.saturating_mul(2u64.saturating_pow(retry_number - 1))
    }
}
