// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;

/// How JSON-RPC messages reach the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    Http,
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => f.write_str("stdio"),
            Self::Http => f.write_str("http"),
        }
    }
}

impl std::str::FromStr for Transport {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "http" => Ok(Self::Http),
            other => anyhow::bail!("invalid transport: {other} (expected stdio or http)"),
        }
    }
}

/// MCP tool server with Entra ID authentication.
#[derive(Debug, Clone, Parser)]
#[command(name = "pox-mcp", version, about)]
pub struct ServerConfig {
    /// Transport: stdio or http.
    #[arg(long, default_value = "stdio", env = "TRANSPORT")]
    pub transport: String,

    /// Host to bind the HTTP transport on.
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub http_host: String,

    /// Port for the HTTP transport.
    #[arg(long, default_value_t = 3000, env = "HTTP_PORT")]
    pub http_port: u16,

    /// Path the HTTP transport accepts JSON-RPC on.
    #[arg(long, default_value = "/mcp", env = "HTTP_PATH")]
    pub http_path: String,

    /// Log level (trace, debug, info, warning, error, critical) or a filter directive.
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,

    /// Log format: text or json.
    #[arg(long, default_value = "text", env = "POX_MCP_LOG_FORMAT")]
    pub log_format: String,

    /// Append logs to this file instead of stderr.
    #[arg(long, env = "LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Bearer token required by the HTTP transport. If unset, inbound auth is disabled.
    #[arg(long, env = "POX_MCP_API_TOKEN")]
    pub api_token: Option<String>,

    /// Microsoft Graph base URL used by diagnostic tools.
    #[arg(long, default_value = "https://graph.microsoft.com", env = "GRAPH_API_URL")]
    pub graph_url: String,
}

impl ServerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.transport()?;
        if !self.http_path.starts_with('/') {
            anyhow::bail!("--http-path must start with '/' (got {:?})", self.http_path);
        }
        if self.http_path.starts_with("/api/") {
            anyhow::bail!("--http-path must not shadow the /api/ routes");
        }
        match self.log_format.as_str() {
            "text" | "json" => {}
            other => anyhow::bail!("invalid log format: {other} (expected text or json)"),
        }
        if !self.graph_url.starts_with("http://") && !self.graph_url.starts_with("https://") {
            anyhow::bail!("--graph-url must be an http(s) URL");
        }
        Ok(())
    }

    pub fn transport(&self) -> anyhow::Result<Transport> {
        self.transport.parse()
    }

    /// `tracing` filter directive for the configured level.
    ///
    /// Accepts `warning` and `critical` as aliases for `warn` and `error`.
    pub fn log_filter(&self) -> String {
        match self.log_level.to_lowercase().as_str() {
            "warning" => "warn".to_owned(),
            "critical" | "fatal" => "error".to_owned(),
            other => other.to_owned(),
        }
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
