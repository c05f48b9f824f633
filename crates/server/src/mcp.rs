// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC 2.0 message handling for the MCP methods this server supports.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::ErrorCode;
use crate::state::AppState;
use crate::tools;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "pox-mcp";

#[derive(Debug, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    /// Absent for notifications.
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self { jsonrpc: "2.0".to_owned(), id, result: Some(result), error: None }
    }

    pub fn failure(id: Value, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_owned(),
            id,
            result: None,
            error: Some(RpcError { code: code.rpc_code(), message: message.into(), data: None }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

/// Handle one raw JSON-RPC message. `None` for notifications.
pub async fn handle_message(state: &AppState, raw: &str) -> Option<Response> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(err = %e, "unparseable JSON-RPC message");
            return Some(Response::failure(Value::Null, ErrorCode::ParseError, "Parse error"));
        }
    };
    let request: Request = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => {
            return Some(Response::failure(
                Value::Null,
                ErrorCode::InvalidRequest,
                format!("Invalid request: {e}"),
            ));
        }
    };
    handle_request(state, request).await
}

pub async fn handle_request(state: &AppState, request: Request) -> Option<Response> {
    if request.jsonrpc.as_deref().is_some_and(|v| v != "2.0") {
        return request.id.map(|id| {
            Response::failure(id, ErrorCode::InvalidRequest, "jsonrpc must be \"2.0\"")
        });
    }

    let Some(id) = request.id else {
        debug!(method = %request.method, "notification");
        return None;
    };

    let outcome = match request.method.as_str() {
        "initialize" => Ok(initialize_result()),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({ "tools": tools::descriptors() })),
        "tools/call" => call_tool(state, request.params).await,
        other => Err((ErrorCode::MethodNotFound, format!("Method not found: {other}"))),
    };

    Some(match outcome {
        Ok(result) => Response::success(id, result),
        Err((code, message)) => Response::failure(id, code, message),
    })
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
    })
}

async fn call_tool(
    state: &AppState,
    params: Option<Value>,
) -> Result<Value, (ErrorCode, String)> {
    let params: CallParams = params
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| (ErrorCode::InvalidParams, format!("Invalid params: {e}")))?
        .ok_or_else(|| (ErrorCode::InvalidParams, "Missing params".to_owned()))?;
    let arguments = match params.arguments {
        None | Some(Value::Null) => json!({}),
        Some(args @ Value::Object(_)) => args,
        Some(_) => {
            return Err((ErrorCode::InvalidParams, "arguments must be an object".to_owned()))
        }
    };

    info!(tool = %params.name, "tool called");
    let (text, is_error) = match tools::call(state, &params.name, &arguments).await {
        Ok(result) => (pretty(&result), false),
        Err(e) => {
            warn!(tool = %params.name, err = %e, "tool failed");
            let body = json!({
                "error": e.to_string(),
                "tool": params.name,
                "arguments": arguments,
            });
            (pretty(&body), true)
        }
    };
    Ok(json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error,
    }))
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
#[path = "mcp_tests.rs"]
mod tests;
