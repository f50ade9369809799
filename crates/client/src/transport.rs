//! HTTP transport shared by the SDK client and the MCP proxy.
//!
//! `send(method, endpoint, payload)` returns the decoded JSON body or a
//! classified [`ApiError`]. Every request carries `Content-Type:
//! application/json`; `Authorization: Bearer <key>` is added only when a
//! non-empty key is configured. Each call picks a [`TimeoutTier`].

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use vap_core::{TimeoutTier, Timeouts};

use crate::error::ApiError;
use crate::retry::RetryPolicy;

/// Upper bound on how much of a payload is echoed into debug logs.
const LOG_PAYLOAD_CHARS: usize = 500;

/// A configured HTTP endpoint with auth, timeouts and retry policy.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeouts: Timeouts,
    retry: RetryPolicy,
}

impl HttpTransport {
    /// Create a transport rooted at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("vap-client-rust/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;
        Ok(Self::with_client(http, base_url))
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            timeouts: Timeouts::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Set the bearer token. Empty or whitespace-only keys are ignored.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let key = api_key.into().trim().to_string();
        self.api_key = if key.is_empty() { None } else { Some(key) };
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Issue a request and decode the JSON response.
    ///
    /// Non-GET requests without a payload send `{}`.
    pub async fn send(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<&Value>,
        tier: TimeoutTier,
    ) -> Result<Value, ApiError> {
        self.send_with_query(method, endpoint, payload, &[], tier)
            .await
    }

    /// [`send`](Self::send) with URL query parameters.
    pub async fn send_with_query(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<&Value>,
        query: &[(&str, String)],
        tier: TimeoutTier,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        self.retry
            .run(|attempt| self.attempt(method.clone(), &url, payload, query, tier, attempt))
            .await
    }

    async fn attempt(
        &self,
        method: Method,
        url: &str,
        payload: Option<&Value>,
        query: &[(&str, String)],
        tier: TimeoutTier,
        attempt: u32,
    ) -> Result<Value, ApiError> {
        debug!(
            method = %method,
            url = %url,
            attempt,
            payload = %payload.map(|p| truncate(&p.to_string())).unwrap_or_default(),
            "Sending request"
        );

        let empty = Value::Object(Default::default());
        let mut request = self
            .http
            .request(method.clone(), url)
            .timeout(self.timeouts.for_tier(tier))
            .header(reqwest::header::CONTENT_TYPE, "application/json");

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        if !query.is_empty() {
            request = request.query(query);
        }
        match payload {
            Some(body) => request = request.json(body),
            None if method != Method::GET => request = request.json(&empty),
            None => {}
        }

        let response = request.send().await.map_err(|e| {
            let err = ApiError::from(e);
            debug!(url = %url, error = %err, "Request failed before response");
            err
        })?;

        let status = response.status();
        let text = response.text().await.map_err(ApiError::from)?;

        if !status.is_success() {
            let err = ApiError::from_response(status.as_u16(), &text);
            debug!(
                url = %url,
                status = status.as_u16(),
                kind = err.kind().as_str(),
                error = %err.message(),
                "Request returned error status"
            );
            return Err(err);
        }

        if text.trim().is_empty() {
            return Ok(empty);
        }

        serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse {
            message: format!("{} (status {})", e, status.as_u16()),
        })
    }
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= LOG_PAYLOAD_CHARS {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(LOG_PAYLOAD_CHARS).collect();
        out.push_str("...");
        out
    }
}
