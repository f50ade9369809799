//! JSON-RPC session loop.
//!
//! Reads one line at a time, answers every request exactly once in arrival
//! order, and never answers notifications. A malformed line or a failing
//! handler produces an error response; neither ends the session.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::{json, Value};

use crate::error::McpError;
use crate::tools::ToolDispatcher;
use crate::transport::McpTransport;
use crate::types::*;
use crate::upstream::Upstream;

/// Longest prefix of a protocol line echoed into debug logs.
const LOG_LINE_CHARS: usize = 200;

/// Stdio-to-HTTP MCP proxy.
pub struct ProxyServer {
    upstream: Arc<dyn Upstream>,
    tools: ToolDispatcher,
}

impl ProxyServer {
    pub fn new(upstream: Arc<dyn Upstream>) -> Self {
        Self {
            tools: ToolDispatcher::new(upstream.clone()),
            upstream,
        }
    }

    /// Run the session until the transport closes.
    pub async fn run<T: McpTransport>(&self, transport: &mut T) -> Result<(), McpError> {
        tracing::info!("MCP proxy session starting");

        while let Some(line) = transport.receive().await? {
            tracing::debug!(message = %truncate(&line), "Received");

            if let Some(response) = self.handle_line(&line).await {
                let json = serde_json::to_string(&response)?;
                tracing::debug!(response = %truncate(&json), "Sending");
                transport.send(&json).await?;
            }
        }

        tracing::info!("Transport closed, shutting down");
        Ok(())
    }

    /// Process one raw line. `None` means nothing is written back.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let raw: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "Invalid JSON");
                return Some(error_response(Value::Null, McpError::JsonParse(e)));
            }
        };

        match Incoming::from_value(raw) {
            Ok(Incoming::Request { id, method, params }) => {
                Some(self.handle_request(id, &method, params).await)
            }
            Ok(Incoming::Notification { method, .. }) => {
                self.handle_notification(&method);
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Rejected message");
                Some(error_response(Value::Null, e))
            }
        }
    }

    /// Answer a single request. Never panics, never returns an error.
    pub async fn handle_request(&self, id: Value, method: &str, params: Value) -> JsonRpcResponse {
        let Some(rpc_method) = RpcMethod::parse(method) else {
            tracing::warn!(method = %method, "Unknown method");
            return error_response(id, McpError::MethodNotFound(method.to_string()));
        };

        tracing::info!(method = %method, "Processing method");

        let outcome = AssertUnwindSafe(self.call(rpc_method, params))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(result)) => match result.get("error").and_then(Value::as_str) {
                Some(message) => {
                    tracing::warn!(method = %method, error = %message, "Handler reported error");
                    JsonRpcResponse::error(id, error_codes::SERVER_ERROR, message)
                }
                None => JsonRpcResponse::success(id, result),
            },
            Ok(Err(e)) => {
                tracing::error!(method = %method, error = %e, "Handler error");
                error_response(id, e)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(method = %method, error = %message, "Handler panicked");
                error_response(id, McpError::Handler(message))
            }
        }
    }

    fn handle_notification(&self, method: &str) {
        if method == "notifications/initialized" {
            tracing::info!("Client initialized successfully");
        } else if method.starts_with("notifications/") {
            tracing::debug!(method = %method, "Received notification");
        } else {
            tracing::warn!(method = %method, "Unknown notification");
        }
    }

    async fn call(&self, method: RpcMethod, params: Value) -> Result<Value, McpError> {
        if !params.is_object() {
            return Err(McpError::InvalidParams("params must be an object".into()));
        }

        let payload = match method {
            RpcMethod::Initialize => {
                let params: InitializeParams = serde_json::from_value(params)
                    .map_err(|e| McpError::InvalidParams(e.to_string()))?;
                serde_json::to_value(params)?
            }
            RpcMethod::ToolsCall => {
                let params: CallToolParams = serde_json::from_value(params)
                    .map_err(|e| McpError::InvalidParams(e.to_string()))?;
                tracing::debug!(tool = %params.name, "Handling tools/call");
                return self.tools.dispatch(&params.name, params.arguments).await;
            }
            RpcMethod::ResourcesRead => {
                let params: ReadResourceParams = serde_json::from_value(params)
                    .map_err(|e| McpError::InvalidParams(e.to_string()))?;
                json!({"params": {"uri": params.uri}})
            }
            RpcMethod::ToolsList | RpcMethod::ResourcesList => json!({}),
        };

        Ok(self.upstream.mcp(method.endpoint(), payload).await?)
    }
}

fn error_response(id: Value, err: McpError) -> JsonRpcResponse {
    JsonRpcResponse::from_rpc_error(id, err.to_rpc_error())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= LOG_LINE_CHARS {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(LOG_LINE_CHARS).collect();
        out.push_str("...");
        out
    }
}
