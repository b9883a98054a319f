use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;

use crate::backoff::BackoffPolicy;
use crate::cancel::CancelSignal;
use crate::config::ClientConfig;
use crate::error::{ProviderError, is_retryable_status};
use crate::extract::ResponsePath;
use crate::rate_limit::RateLimiter;
use crate::template::RequestTemplate;
use crate::types::EmbeddingResponse;

/// Attempts per top-level call, the first one included.
pub const MAX_ATTEMPTS: u32 = 5;

/// Error body reported when a failed response's body cannot be read.
pub const NO_ERROR_BODY: &str = "No error stream";

/// Executes one batched embedding call end to end: wait for a rate slot,
/// render the body, POST it, retry throttling and server errors with
/// backoff, and extract the vectors from a 200 response.
#[derive(Debug)]
pub struct EmbeddingClient {
    endpoint: Url,
    model: String,
    headers: HeaderMap,
    template: RequestTemplate,
    response_path: ResponsePath,
    backoff: BackoffPolicy,
    limiter: RateLimiter,
    http: Client,
}

enum Attempt {
    Done(EmbeddingResponse),
    Retryable { status: u16, body: String },
}

impl EmbeddingClient {
    pub fn new(config: ClientConfig) -> Result<Self, ProviderError> {
        let endpoint = Url::parse(config.endpoint.trim()).map_err(|e| {
            ProviderError::Config(format!("invalid api_url [{}]: {e}", config.endpoint))
        })?;
        let headers = build_headers(&config)?;
        // No idle pooling: every attempt opens its own connection and the
        // connection is closed when the response is dropped.
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .pool_max_idle_per_host(0)
            .build()?;

        tracing::info!(
            endpoint = %endpoint,
            model = %config.model,
            max_requests_per_second = config.max_requests_per_second,
            "embedding client initialized"
        );

        Ok(Self {
            endpoint,
            model: config.model,
            headers,
            template: RequestTemplate::new(config.request_template),
            response_path: ResponsePath::new(config.response_path),
            backoff: config.backoff,
            limiter: RateLimiter::new(config.max_requests_per_second),
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn response_path(&self) -> &ResponsePath {
        &self.response_path
    }

    /// Returns one vector per `data` entry in the provider's order. Whether
    /// that count matches `texts` is for the caller to check.
    pub async fn get_embeddings(
        &self,
        texts: &[String],
        cancel: &CancelSignal,
    ) -> Result<EmbeddingResponse, ProviderError> {
        if texts.is_empty() {
            return Err(ProviderError::Config(
                "embedding input is empty".to_string(),
            ));
        }

        self.limiter.acquire(cancel).await?;

        let mut backoff = self.backoff.start();
        backoff.reset();
        let body = self.template.render(texts, &self.model);

        for attempt in 1..=MAX_ATTEMPTS {
            tracing::debug!(attempt, inputs = texts.len(), "sending embedding request");
            match self.send_once(&body).await? {
                Attempt::Done(response) => return Ok(response),
                Attempt::Retryable { status, body } => {
                    if attempt == MAX_ATTEMPTS {
                        tracing::warn!(status, attempt, "embedding retries exhausted");
                        return Err(ProviderError::Api { status, body });
                    }
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        status,
                        attempt,
                        delay_ms = delay.as_millis(),
                        "retryable embedding failure, backing off"
                    );
                    cancel.sleep(delay, "Backoff").await?;
                }
            }
        }

        Err(ProviderError::MaxRetriesExceeded)
    }

    async fn send_once(&self, body: &str) -> Result<Attempt, ProviderError> {
        let res = self
            .http
            .post(self.endpoint.clone())
            .headers(self.headers.clone())
            .body(body.to_owned())
            .send()
            .await?;

        let status = res.status();
        if status == StatusCode::OK {
            let bytes = res.bytes().await?;
            let parsed: Value = serde_json::from_slice(&bytes).map_err(|e| {
                tracing::warn!(error = %e, "embedding response is not valid JSON");
                self.response_path.not_found("response body is not valid JSON")
            })?;
            let vectors = self.response_path.extract(&parsed)?;
            let usage = parsed.get("usage").and_then(Value::as_object).cloned();
            return Ok(Attempt::Done(EmbeddingResponse {
                provider: String::new(),
                model: self.model.clone(),
                vectors,
                usage,
            }));
        }

        let status = status.as_u16();
        let body = match res.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(status, error = %e, "could not read error response body");
                NO_ERROR_BODY.to_string()
            }
        };
        if is_retryable_status(status) {
            Ok(Attempt::Retryable { status, body })
        } else {
            Err(ProviderError::Api { status, body })
        }
    }
}

fn build_headers(config: &ClientConfig) -> Result<HeaderMap, ProviderError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    for (name, value) in &config.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ProviderError::Config(format!("invalid header name [{name}]: {e}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| ProviderError::Config(format!("invalid value for header [{name}]: {e}")))?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}
