//! Typed response models for the v3 REST API.
//!
//! Every field the API may omit carries a serde default, so decoding only
//! fails on a genuinely malformed body. Prices and balances accept numbers,
//! numeric strings or `null`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

fn default_unknown() -> String {
    "unknown".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_audio_format() -> String {
    "mp3".to_string()
}

fn default_limit() -> u32 {
    10
}

fn amount_from(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_amount<'de, D: Deserializer<'de>>(de: D) -> Result<Option<f64>, D::Error> {
    Ok(Option::<Value>::deserialize(de)?.as_ref().and_then(amount_from))
}

fn amount_or_zero<'de, D: Deserializer<'de>>(de: D) -> Result<f64, D::Error> {
    Ok(lenient_amount(de)?.unwrap_or(0.0))
}

// ── Images ──────────────────────────────────────────────────────────

/// Result of `POST /v3/generate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateResult {
    #[serde(default)]
    pub success: bool,
    pub image_url: Option<String>,
    pub image_base64: Option<String>,
    pub request_id: Option<String>,
    pub aspect_ratio: Option<String>,
    #[serde(default, deserialize_with = "amount_or_zero")]
    pub cost: f64,
    pub metadata: Option<Value>,
    pub error: Option<String>,
}

/// Result of `POST /v3/upscale`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpscaleResult {
    #[serde(default)]
    pub success: bool,
    pub image_url: Option<String>,
    pub image_base64: Option<String>,
    pub scale: Option<String>,
    #[serde(default, deserialize_with = "amount_or_zero")]
    pub cost: f64,
    pub error: Option<String>,
}

/// Result of `POST /v3/validate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidateResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub validation: Validation,
    #[serde(default, deserialize_with = "amount_or_zero")]
    pub cost: f64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Validation {
    #[serde(default)]
    pub valid: bool,
    pub issues: Option<Vec<String>>,
    pub warnings: Option<Vec<String>>,
    pub format: Option<Value>,
    pub dimensions: Option<Value>,
    pub size: Option<Value>,
}

// ── Account ─────────────────────────────────────────────────────────

/// Result of `GET /v3/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default = "default_unknown")]
    pub status: String,
    pub version: Option<String>,
    pub service: Option<String>,
    pub dependencies: Option<Value>,
}

/// Result of `GET /v3/balance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    #[serde(default, deserialize_with = "amount_or_zero")]
    pub balance: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, deserialize_with = "amount_or_zero")]
    pub reserved: f64,
    #[serde(default, deserialize_with = "lenient_amount")]
    usable: Option<f64>,
}

impl Balance {
    /// Spendable amount; the API may omit it, in which case it equals `balance`.
    pub fn usable(&self) -> f64 {
        self.usable.unwrap_or(self.balance)
    }
}

// ── Tasks ───────────────────────────────────────────────────────────

/// Result of creating a video task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoResult {
    #[serde(default)]
    pub success: bool,
    pub task_id: Option<String>,
    video_url: Option<String>,
    result_url: Option<String>,
    pub duration: Option<u32>,
    pub resolution: Option<String>,
    pub aspect_ratio: Option<String>,
    #[serde(default)]
    pub has_audio: bool,
    #[serde(default, deserialize_with = "amount_or_zero")]
    pub cost: f64,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub estimated_cost: Option<f64>,
    pub status: Option<String>,
    pub error: Option<String>,
}

impl VideoResult {
    pub fn video_url(&self) -> Option<&str> {
        self.video_url.as_deref().or(self.result_url.as_deref())
    }
}

/// Result of creating a music task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicResult {
    #[serde(default)]
    pub success: bool,
    pub task_id: Option<String>,
    audio_url: Option<String>,
    result_url: Option<String>,
    pub duration: Option<u32>,
    #[serde(default = "default_audio_format")]
    pub audio_format: String,
    #[serde(default)]
    pub instrumental: bool,
    #[serde(default, deserialize_with = "amount_or_zero")]
    pub cost: f64,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub estimated_cost: Option<f64>,
    pub status: Option<String>,
    pub error: Option<String>,
}

impl MusicResult {
    pub fn audio_url(&self) -> Option<&str> {
        self.audio_url.as_deref().or(self.result_url.as_deref())
    }
}

/// Snapshot of a task from `GET /v3/tasks/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    #[serde(default)]
    pub task_id: String,
    #[serde(default = "default_unknown")]
    pub status: String,
    task_type: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    result_url: Option<String>,
    image_url: Option<String>,
    video_url: Option<String>,
    audio_url: Option<String>,
    #[serde(default, deserialize_with = "amount_or_zero")]
    pub cost: f64,
    pub estimated_cost: Option<Value>,
    pub actual_cost: Option<Value>,
    pub created_at: Option<String>,
    pub completed_at: Option<String>,
    pub error: Option<String>,
    pub error_message: Option<String>,
    pub result: Option<Value>,
    pub metadata: Option<Value>,
}

impl TaskResult {
    pub fn task_type(&self) -> Option<&str> {
        self.task_type.as_deref().or(self.kind.as_deref())
    }

    /// First URL found among `result_url`, `image_url`, `video_url`, `audio_url`.
    pub fn result_url(&self) -> Option<&str> {
        self.result_url
            .as_deref()
            .or(self.image_url.as_deref())
            .or(self.video_url.as_deref())
            .or(self.audio_url.as_deref())
    }
}

/// Result of `GET /v3/tasks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskListResult {
    #[serde(default)]
    pub tasks: Vec<TaskResult>,
    total: Option<u64>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

impl TaskListResult {
    /// Total matching tasks; defaults to the number returned.
    pub fn total(&self) -> u64 {
        self.total.unwrap_or(self.tasks.len() as u64)
    }
}
