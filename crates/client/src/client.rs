//! Async SDK client for the v3 REST API.
//!
//! [`VapClient`] is cheap to clone and safe to share across tasks. The
//! underlying HTTP connection pool is created on first use and reused by
//! every clone.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tokio::sync::OnceCell;
use tracing::debug;

use vap_core::config::{DEFAULT_API_BASE_URL, DEFAULT_MAX_RETRIES};
use vap_core::{TimeoutTier, Timeouts};

use crate::error::ApiError;
use crate::models::{
    Balance, GenerateResult, HealthStatus, MusicResult, TaskListResult, TaskResult,
    UpscaleResult, ValidateResult, VideoResult,
};
use crate::retry::RetryPolicy;
use crate::transport::HttpTransport;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const MISSING_IMAGE: &str = "Either image_url or image_base64 is required";

/// Builder for [`VapClient`].
#[derive(Debug, Clone)]
pub struct VapClientBuilder {
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
}

impl Default for VapClientBuilder {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl VapClientBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Per-request timeout applied to every call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total attempts per call, including the first.
    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn build(self) -> VapClient {
        VapClient {
            inner: Arc::new(Inner {
                settings: self,
                transport: OnceCell::new(),
            }),
        }
    }
}

#[derive(Debug)]
struct Inner {
    settings: VapClientBuilder,
    transport: OnceCell<HttpTransport>,
}

/// Client for image, video, music and task endpoints.
#[derive(Debug, Clone)]
pub struct VapClient {
    inner: Arc<Inner>,
}

impl VapClient {
    pub fn builder() -> VapClientBuilder {
        VapClientBuilder::default()
    }

    /// Client with default settings and the given key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::builder().api_key(api_key).build()
    }

    pub fn base_url(&self) -> &str {
        &self.inner.settings.base_url
    }

    async fn transport(&self) -> Result<&HttpTransport, ApiError> {
        self.inner
            .transport
            .get_or_try_init(|| async {
                let settings = &self.inner.settings;
                debug!(base_url = %settings.base_url, "Initializing HTTP transport");
                let mut transport = HttpTransport::new(&settings.base_url)?
                    .with_timeouts(Timeouts::uniform(settings.timeout))
                    .with_retry(RetryPolicy::new(settings.max_retries));
                if let Some(key) = &settings.api_key {
                    transport = transport.with_api_key(key.clone());
                }
                Ok::<_, ApiError>(transport)
            })
            .await
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<&Value>,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let transport = self.transport().await?;
        let data = transport
            .send_with_query(method, endpoint, payload, query, TimeoutTier::Standard)
            .await?;
        decode(data)
    }

    // ── Images ──────────────────────────────────────────────────────

    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.call(Method::GET, "/v3/health", None, &[]).await
    }

    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResult, ApiError> {
        let payload = request.to_payload();
        self.call(Method::POST, "/v3/generate", Some(&payload), &[])
            .await
    }

    /// Upscale an image given by URL or base64. `scale` is `"2x"` or `"4x"`.
    pub async fn upscale(
        &self,
        image: &ImageSource,
        scale: &str,
    ) -> Result<UpscaleResult, ApiError> {
        let mut payload = image.to_payload()?;
        payload.insert("scale".into(), json!(scale));
        self.call(
            Method::POST,
            "/v3/upscale",
            Some(&Value::Object(payload)),
            &[],
        )
        .await
    }

    pub async fn validate(
        &self,
        image: &ImageSource,
        checks: &[String],
    ) -> Result<ValidateResult, ApiError> {
        let mut payload = image.to_payload()?;
        if !checks.is_empty() {
            payload.insert("checks".into(), json!(checks));
        }
        self.call(
            Method::POST,
            "/v3/validate",
            Some(&Value::Object(payload)),
            &[],
        )
        .await
    }

    pub async fn get_balance(&self) -> Result<Balance, ApiError> {
        self.call(Method::GET, "/v3/balance", None, &[]).await
    }

    // ── Tasks ───────────────────────────────────────────────────────

    /// Create a Veo 3.1 video task. Parameters are sent as given.
    pub async fn generate_video(&self, request: &VideoRequest) -> Result<VideoResult, ApiError> {
        let payload = request.to_payload();
        self.call(Method::POST, "/v3/tasks", Some(&payload), &[])
            .await
    }

    /// Create a Suno music task.
    pub async fn generate_music(&self, request: &MusicRequest) -> Result<MusicResult, ApiError> {
        let payload = request.to_payload();
        self.call(Method::POST, "/v3/tasks", Some(&payload), &[])
            .await
    }

    pub async fn get_task(&self, task_id: &str) -> Result<TaskResult, ApiError> {
        self.call(Method::GET, &format!("/v3/tasks/{}", task_id), None, &[])
            .await
    }

    /// Recent tasks, optionally filtered by status.
    pub async fn list_tasks(
        &self,
        status: Option<&str>,
        limit: u32,
    ) -> Result<TaskListResult, ApiError> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(status) = status.filter(|s| !s.is_empty()) {
            query.push(("status", status.to_string()));
        }
        self.call(Method::GET, "/v3/tasks", None, &query).await
    }
}

fn decode<T: DeserializeOwned>(data: Value) -> Result<T, ApiError> {
    serde_json::from_value(data).map_err(|e| ApiError::InvalidResponse {
        message: e.to_string(),
    })
}

/// Where an input image comes from. Either field may be set; at least one
/// must be.
#[derive(Debug, Clone, Default)]
pub struct ImageSource {
    pub image_url: Option<String>,
    pub image_base64: Option<String>,
}

impl ImageSource {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            image_url: Some(url.into()),
            image_base64: None,
        }
    }

    pub fn base64(data: impl Into<String>) -> Self {
        Self {
            image_url: None,
            image_base64: Some(data.into()),
        }
    }

    fn to_payload(&self) -> Result<Map<String, Value>, ApiError> {
        let mut payload = Map::new();
        if let Some(url) = self.image_url.as_deref().filter(|s| !s.is_empty()) {
            payload.insert("image_url".into(), json!(url));
        }
        if let Some(data) = self.image_base64.as_deref().filter(|s| !s.is_empty()) {
            payload.insert("image_base64".into(), json!(data));
        }
        if payload.is_empty() {
            return Err(ApiError::local_validation(MISSING_IMAGE));
        }
        Ok(payload)
    }
}

/// Image generation parameters.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub description: String,
    pub aspect_ratio: String,
    pub style: Option<String>,
    pub negative_prompt: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

impl GenerateRequest {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            aspect_ratio: "1:1".to_string(),
            style: None,
            negative_prompt: None,
            metadata: None,
        }
    }

    fn to_payload(&self) -> Value {
        let mut payload = json!({
            "description": self.description,
            "aspect_ratio": self.aspect_ratio,
        });
        insert_non_empty(&mut payload, "style", self.style.as_deref());
        insert_non_empty(&mut payload, "negative_prompt", self.negative_prompt.as_deref());
        if let Some(metadata) = self.metadata.as_ref().filter(|m| !m.is_empty()) {
            payload["metadata"] = Value::Object(metadata.clone());
        }
        payload
    }
}

/// Video task parameters.
#[derive(Debug, Clone)]
pub struct VideoRequest {
    pub prompt: String,
    pub duration: u32,
    pub aspect_ratio: String,
    pub generate_audio: bool,
    pub resolution: String,
    pub negative_prompt: Option<String>,
}

impl VideoRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            duration: 8,
            aspect_ratio: "16:9".to_string(),
            generate_audio: true,
            resolution: "720p".to_string(),
            negative_prompt: None,
        }
    }

    fn to_payload(&self) -> Value {
        let mut params = json!({
            "description": self.prompt,
            "duration": self.duration,
            "aspect_ratio": self.aspect_ratio,
            "generate_audio": self.generate_audio,
            "resolution": self.resolution,
        });
        insert_non_empty(&mut params, "negative_prompt", self.negative_prompt.as_deref());
        json!({"type": "video_generation", "params": params})
    }
}

/// Music task parameters.
#[derive(Debug, Clone)]
pub struct MusicRequest {
    pub prompt: String,
    /// Target length in seconds (30 to 480).
    pub duration: u32,
    pub instrumental: bool,
    /// `streaming`, `apple` or `broadcast`.
    pub loudness_preset: String,
    /// `mp3` or `wav`.
    pub audio_format: String,
}

impl MusicRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            duration: 120,
            instrumental: false,
            loudness_preset: "streaming".to_string(),
            audio_format: "mp3".to_string(),
        }
    }

    fn to_payload(&self) -> Value {
        json!({
            "type": "music_generation",
            "params": {
                "description": self.prompt,
                "duration": self.duration,
                "instrumental": self.instrumental,
                "loudness_preset": self.loudness_preset,
                "audio_format": self.audio_format,
            }
        })
    }
}

fn insert_non_empty(target: &mut Value, key: &str, value: Option<&str>) {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        target[key] = json!(v);
    }
}
