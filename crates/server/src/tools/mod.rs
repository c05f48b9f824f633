// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool registry: descriptors for `tools/list` and dispatch for `tools/call`.

pub mod diagnostics;
pub mod echo;
pub mod hello;

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::state::AppState;

/// Tool metadata advertised to clients.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    UnknownTool(String),
    InvalidArguments(String),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTool(name) => write!(f, "Unknown tool: {name}"),
            Self::InvalidArguments(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for ToolError {}

pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![hello::descriptor(), echo::descriptor(), diagnostics::descriptor()]
}

/// Run the named tool. `args` is the JSON object from `tools/call`.
pub async fn call(state: &AppState, name: &str, args: &Value) -> Result<Value, ToolError> {
    match name {
        hello::NAME => Ok(hello::call(args)),
        echo::NAME => echo::call(args),
        diagnostics::NAME => Ok(diagnostics::call(state).await),
        other => Err(ToolError::UnknownTool(other.to_owned())),
    }
}

/// Current UTC time as RFC 3339 with a `Z` suffix.
pub(crate) fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
#[path = "tools_tests.rs"]
mod tests;
