//! Remote services the proxy talks to.
//!
//! Two HTTP bases are involved: the MCP endpoint base (`/initialize`,
//! `/tools/call`, ...) and the REST API base (`/v3/tasks`). Both go through
//! the shared [`HttpTransport`], so classification and retries are
//! identical to the SDK.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use vap_client::{ApiError, HttpTransport, RetryPolicy};
use vap_core::{Config, TimeoutTier};

#[async_trait]
pub trait Upstream: Send + Sync {
    /// POST `payload` to `{mcp_base}{endpoint}`.
    async fn mcp(&self, endpoint: &str, payload: Value) -> Result<Value, ApiError>;

    /// POST `body` to `{api_base}/v3/tasks`.
    async fn create_task(&self, body: Value) -> Result<Value, ApiError>;

    /// GET `{api_base}/v3/tasks/{task_id}`.
    async fn get_task(&self, task_id: &str) -> Result<Value, ApiError>;
}

/// Production [`Upstream`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    mcp: HttpTransport,
    api: HttpTransport,
}

impl HttpUpstream {
    pub fn new(mcp: HttpTransport, api: HttpTransport) -> Self {
        Self { mcp, api }
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let build = |base: &str| -> Result<HttpTransport, ApiError> {
            Ok(HttpTransport::new(base)?
                .with_api_key(config.api_key.clone())
                .with_timeouts(config.timeouts)
                .with_retry(RetryPolicy::new(config.max_retries)))
        };
        Ok(Self::new(build(&config.mcp_url)?, build(&config.api_base_url)?))
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn mcp(&self, endpoint: &str, payload: Value) -> Result<Value, ApiError> {
        self.mcp
            .send(Method::POST, endpoint, Some(&payload), TimeoutTier::Standard)
            .await
    }

    async fn create_task(&self, body: Value) -> Result<Value, ApiError> {
        self.api
            .send(Method::POST, "/v3/tasks", Some(&body), TimeoutTier::Create)
            .await
    }

    async fn get_task(&self, task_id: &str) -> Result<Value, ApiError> {
        self.api
            .send(
                Method::GET,
                &format!("/v3/tasks/{}", task_id),
                None,
                TimeoutTier::Read,
            )
            .await
    }
}
