//! JSON-RPC 2.0 and MCP protocol types.
//!
//! The proxy relays most payloads untouched, so ids, params and results are
//! carried as raw [`Value`]s. Only the pieces the proxy inspects or builds
//! itself get a typed form.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::McpError;

pub const JSONRPC_VERSION: &str = "2.0";

// ── JSON-RPC 2.0 Base Types ─────────────────────────────────────────

/// A JSON-RPC 2.0 response message (success or error).
///
/// `id` echoes the request id verbatim, including `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Standard JSON-RPC 2.0 error codes, plus the server-defined handler code.
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    /// Handler or upstream failure.
    pub const SERVER_ERROR: i64 = -32000;
}

impl JsonRpcResponse {
    /// Create a successful response.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self::from_rpc_error(
            id,
            JsonRpcError {
                code,
                message: message.into(),
                data: None,
            },
        )
    }

    pub fn from_rpc_error(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

// ── Incoming messages ───────────────────────────────────────────────

/// A decoded inbound line.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// Has an `id` key (its value may be `null`); answered exactly once.
    Request {
        id: Value,
        method: String,
        params: Value,
    },
    /// No `id` key; never answered.
    Notification { method: String, params: Value },
}

impl Incoming {
    /// Classify a parsed JSON value by presence of the `id` key.
    ///
    /// A missing `method` reads as the empty string. Absent, `null` or
    /// otherwise empty `params` become `{}`.
    pub fn from_value(raw: Value) -> Result<Self, McpError> {
        let Value::Object(mut obj) = raw else {
            return Err(McpError::InvalidRequest(
                "message is not a JSON object".to_string(),
            ));
        };

        let method = obj
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let params = match obj.remove("params") {
            Some(p) if is_truthy(&p) => p,
            _ => Value::Object(Map::new()),
        };

        Ok(match obj.remove("id") {
            Some(id) => Incoming::Request { id, method, params },
            None => Incoming::Notification { method, params },
        })
    }
}

/// JSON truthiness: `null`, `false`, `0`, `""`, `[]` and `{}` are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

// ── Methods ─────────────────────────────────────────────────────────

/// JSON-RPC methods the proxy answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcMethod {
    Initialize,
    ToolsList,
    ToolsCall,
    ResourcesList,
    ResourcesRead,
}

impl RpcMethod {
    pub const ALL: [RpcMethod; 5] = [
        RpcMethod::Initialize,
        RpcMethod::ToolsList,
        RpcMethod::ToolsCall,
        RpcMethod::ResourcesList,
        RpcMethod::ResourcesRead,
    ];

    pub fn parse(method: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == method)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RpcMethod::Initialize => "initialize",
            RpcMethod::ToolsList => "tools/list",
            RpcMethod::ToolsCall => "tools/call",
            RpcMethod::ResourcesList => "resources/list",
            RpcMethod::ResourcesRead => "resources/read",
        }
    }

    /// Path appended to the MCP base URL when the call is forwarded.
    pub fn endpoint(self) -> &'static str {
        match self {
            RpcMethod::Initialize => "/initialize",
            RpcMethod::ToolsList => "/tools/list",
            RpcMethod::ToolsCall => "/tools/call",
            RpcMethod::ResourcesList => "/resources/list",
            RpcMethod::ResourcesRead => "/resources/read",
        }
    }
}

// ── MCP Initialize ──────────────────────────────────────────────────

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Parameters for `initialize`, forwarded upstream as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default)]
    pub protocol_version: Value,
    #[serde(default = "empty_object")]
    pub capabilities: Value,
    #[serde(default = "empty_object")]
    pub client_info: Value,
}

// ── MCP resources/read ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadResourceParams {
    #[serde(default)]
    pub uri: Value,
}

// ── MCP tools/call ──────────────────────────────────────────────────

/// Parameters for `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    #[serde(default)]
    pub name: String,
    /// `null` or missing arguments are normalized to `{}`.
    #[serde(default = "empty_object", deserialize_with = "null_as_empty_object")]
    pub arguments: Value,
}

fn null_as_empty_object<'de, D>(deserializer: D) -> Result<Value, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(if value.is_null() { empty_object() } else { value })
}

/// Result of `tools/call` for the locally handled tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<ToolContent>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

/// Content block within a tool call result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    Text { text: String },
}

impl CallToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// A tool-level failure. The message is prefixed with `Error: `.
    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: format!("Error: {}", message),
            }],
            is_error: true,
        }
    }
}
