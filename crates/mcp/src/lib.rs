//! MCP stdio proxy for the VAP API.
//!
//! Speaks newline-delimited JSON-RPC 2.0 on stdin/stdout and relays calls to
//! the remote MCP HTTP endpoints, handling a few tools locally.
//!
//! # Architecture
//!
//! - **types**: JSON-RPC 2.0 and MCP protocol types
//! - **transport**: Newline framing over stdio or an in-memory pipe
//! - **upstream**: Remote MCP and task endpoints behind a trait
//! - **tools**: `tools/call` dispatch and the locally handled tools
//! - **server**: The session loop
//! - **error**: Error type and JSON-RPC code mapping
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use vap_mcp::{HttpUpstream, ProxyServer, StdioTransport};
//! use vap_core::Config;
//!
//! # async fn example() {
//! let upstream = HttpUpstream::from_config(&Config::from_env()).unwrap();
//! let server = ProxyServer::new(Arc::new(upstream));
//! server.run(&mut StdioTransport::new()).await.unwrap();
//! # }
//! ```

pub mod error;
pub mod server;
pub mod tools;
pub mod transport;
pub mod types;
pub mod upstream;

pub use error::McpError;
pub use server::ProxyServer;
pub use tools::{LocalTool, ToolDispatcher};
pub use transport::{ChannelTransport, LineTransport, McpTransport, StdioTransport};
pub use types::*;
pub use upstream::{HttpUpstream, Upstream};
