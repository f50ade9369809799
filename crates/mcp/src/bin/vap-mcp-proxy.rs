//! vap-mcp-proxy: bridges an MCP stdio client to the VAP HTTP MCP API.
//!
//! stdout carries protocol frames only; all logs go to stderr.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use vap_core::config::{load_dotenv, Config};
use vap_mcp::{HttpUpstream, ProxyServer, StdioTransport};

// ── CLI ─────────────────────────────────────────────────────────────

/// MCP stdio proxy for the VAP API.
///
/// Settings default to the environment (`VAP_*`, legacy `VAPE_*`, or a
/// `.env` file); flags override them.
#[derive(Parser, Debug)]
#[command(name = "vap-mcp-proxy", version, about)]
struct Cli {
    /// API key sent as a bearer token.
    #[arg(long)]
    api_key: Option<String>,

    /// Base URL of the MCP HTTP endpoints.
    #[arg(long)]
    mcp_url: Option<String>,

    /// Base URL of the REST API.
    #[arg(long)]
    api_base_url: Option<String>,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,

    /// Total attempts per upstream call.
    #[arg(long)]
    max_retries: Option<u32>,
}

impl Cli {
    fn apply(self, mut config: Config) -> Config {
        if let Some(key) = self.api_key {
            config.api_key = key.trim().to_string();
        }
        if let Some(url) = self.mcp_url {
            config.mcp_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(url) = self.api_base_url {
            config.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(n) = self.max_retries {
            config.max_retries = n;
        }
        config.debug |= self.debug;
        config
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    let config = Cli::parse().apply(Config::from_env());

    let default_level = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("VAP MCP proxy starting");
    config.log_summary();

    let upstream =
        HttpUpstream::from_config(&config).context("failed to build HTTP client")?;
    let server = ProxyServer::new(Arc::new(upstream));

    server
        .run(&mut StdioTransport::new())
        .await
        .context("stdio session failed")?;

    info!("VAP MCP proxy stopped");
    Ok(())
}
