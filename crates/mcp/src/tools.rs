//! `tools/call` dispatch.
//!
//! Three tools are handled locally: `generate_video`, `estimate_video_cost`
//! and `get_task`. Every other tool name is forwarded verbatim to
//! `{mcp_base}/tools/call`.
//!
//! Local tools report business failures (missing arguments, upstream
//! errors) as a successful result carrying `isError: true`, never as a
//! JSON-RPC error.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use vap_client::normalize::normalize;
use vap_client::pricing::{duration_from_value, format_cost, pricing_table, video_cost};

use crate::error::McpError;
use crate::types::{is_truthy, CallToolResult};
use crate::upstream::Upstream;

pub const ASPECT_RATIOS: [&str; 2] = ["16:9", "9:16"];
pub const DEFAULT_ASPECT_RATIO: &str = "16:9";
pub const RESOLUTIONS: [&str; 2] = ["720p", "1080p"];
pub const DEFAULT_RESOLUTION: &str = "720p";

/// Tools with proxy-side logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalTool {
    GenerateVideo,
    EstimateVideoCost,
    GetTask,
}

impl LocalTool {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "generate_video" => Some(LocalTool::GenerateVideo),
            "estimate_video_cost" => Some(LocalTool::EstimateVideoCost),
            "get_task" => Some(LocalTool::GetTask),
            _ => None,
        }
    }
}

/// Validated `generate_video` arguments. Out-of-range values are replaced
/// by defaults rather than rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoArgs {
    pub prompt: Value,
    pub duration: u32,
    pub aspect_ratio: String,
    pub generate_audio: bool,
    pub resolution: String,
    pub negative_prompt: Option<Value>,
}

impl VideoArgs {
    /// `None` when the prompt is missing or empty.
    pub fn from_arguments(args: &Value) -> Option<Self> {
        let prompt = args.get("prompt").filter(|p| is_truthy(p))?.clone();
        Some(Self {
            prompt,
            duration: duration_from_value(args.get("duration")),
            aspect_ratio: pick(args.get("aspect_ratio"), &ASPECT_RATIOS, DEFAULT_ASPECT_RATIO),
            generate_audio: audio_flag(args),
            resolution: pick(args.get("resolution"), &RESOLUTIONS, DEFAULT_RESOLUTION),
            negative_prompt: args
                .get("negative_prompt")
                .filter(|p| is_truthy(p))
                .cloned(),
        })
    }

    /// Request body for `POST /v3/tasks`.
    pub fn task_body(&self) -> Value {
        let mut params = Map::new();
        params.insert("prompt".into(), self.prompt.clone());
        params.insert("duration".into(), json!(self.duration));
        params.insert("aspect_ratio".into(), json!(self.aspect_ratio));
        params.insert("generate_audio".into(), json!(self.generate_audio));
        params.insert("resolution".into(), json!(self.resolution));
        if let Some(negative) = &self.negative_prompt {
            params.insert("negative_prompt".into(), negative.clone());
        }
        json!({"type": "video", "params": params})
    }

    pub fn local_cost(&self) -> f64 {
        video_cost(self.duration, self.generate_audio)
    }
}

fn pick(value: Option<&Value>, allowed: &[&str], default: &str) -> String {
    value
        .and_then(Value::as_str)
        .filter(|v| allowed.contains(v))
        .unwrap_or(default)
        .to_string()
}

/// `generate_audio` defaults to on; present values follow JSON truthiness.
fn audio_flag(args: &Value) -> bool {
    args.get("generate_audio").map(is_truthy).unwrap_or(true)
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// Strings verbatim, everything else in JSON form.
fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Routes `tools/call` to a local handler or the remote MCP endpoint.
#[derive(Clone)]
pub struct ToolDispatcher {
    upstream: Arc<dyn Upstream>,
}

impl ToolDispatcher {
    pub fn new(upstream: Arc<dyn Upstream>) -> Self {
        Self { upstream }
    }

    /// Run a tool. Local tools always yield a `CallToolResult` payload;
    /// forwarded tools yield whatever the remote returned.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> Result<Value, McpError> {
        let result = match LocalTool::parse(name) {
            Some(LocalTool::GenerateVideo) => self.generate_video(&arguments).await,
            Some(LocalTool::EstimateVideoCost) => estimate_video_cost(&arguments),
            Some(LocalTool::GetTask) => self.get_task(&arguments).await,
            None => {
                debug!(tool = %name, "Forwarding tool call");
                return Ok(self
                    .upstream
                    .mcp("/tools/call", json!({"name": name, "arguments": arguments}))
                    .await?);
            }
        };
        Ok(serde_json::to_value(result)?)
    }

    async fn generate_video(&self, arguments: &Value) -> CallToolResult {
        let Some(args) = VideoArgs::from_arguments(arguments) else {
            return CallToolResult::error("prompt is required");
        };

        info!(
            duration = args.duration,
            audio = args.generate_audio,
            resolution = %args.resolution,
            "Creating video task"
        );

        let response = match self.upstream.create_task(args.task_body()).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Video task creation failed");
                return CallToolResult::error(e.message());
            }
        };
        if let Some(err) = response.get("error") {
            return CallToolResult::error(display(err));
        }

        let task_id = response
            .get("task_id")
            .map(display)
            .unwrap_or_else(|| "unknown".to_string());
        let cost = response
            .get("estimated_cost")
            .filter(|c| !c.is_null())
            .map(display)
            .unwrap_or_else(|| format_cost(args.local_cost()));

        CallToolResult::text(format!(
            "Video generation task created (Veo 3.1)!\n\n\
             Task ID: {}\n\
             Duration: {} seconds\n\
             Aspect Ratio: {}\n\
             Resolution: {}\n\
             Audio: {}\n\
             Estimated Cost: ${}\n\n\
             Use get_task with this task_id to check status and get the video URL when complete.",
            task_id,
            args.duration,
            args.aspect_ratio,
            args.resolution,
            yes_no(args.generate_audio),
            cost,
        ))
    }

    async fn get_task(&self, arguments: &Value) -> CallToolResult {
        let Some(task_id) = arguments.get("task_id").filter(|t| is_truthy(t)).map(display)
        else {
            return CallToolResult::error("task_id is required");
        };

        let response = match self.upstream.get_task(&task_id).await {
            Ok(response) => response,
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "Task lookup failed");
                return CallToolResult::error(e.message());
            }
        };
        if let Some(err) = response.get("error") {
            return CallToolResult::error(display(err));
        }

        CallToolResult::text(normalize(&task_id, &response).summary())
    }
}

/// Local price lookup; never touches the network.
fn estimate_video_cost(arguments: &Value) -> CallToolResult {
    let duration = duration_from_value(arguments.get("duration"));
    let audio = audio_flag(arguments);
    CallToolResult::text(format!(
        "Video Generation Cost Estimate (Veo 3.1):\n\n\
         Duration: {} seconds\n\
         Audio: {}\n\
         Cost: ${}\n\n\
         {}",
        duration,
        yes_no(audio),
        format_cost(video_cost(duration, audio)),
        pricing_table(),
    ))
}
