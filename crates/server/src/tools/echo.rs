// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::{json, Value};

use super::{timestamp, ToolDescriptor, ToolError};

pub const NAME: &str = "echo";

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: NAME,
        description: "Echo back the provided message with metadata",
        input_schema: json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The message to echo back",
                },
                "uppercase": {
                    "type": "boolean",
                    "description": "If true, return the message in uppercase",
                    "default": false,
                }
            },
            "required": ["message"],
        }),
    }
}

pub fn call(args: &Value) -> Result<Value, ToolError> {
    let message = match args.get("message") {
        Some(Value::String(s)) if !s.is_empty() => s,
        _ => {
            return Err(ToolError::InvalidArguments(
                "Message parameter must be a non-empty string".to_owned(),
            ))
        }
    };
    let uppercase = match args.get("uppercase") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            return Err(ToolError::InvalidArguments("uppercase must be a boolean".to_owned()))
        }
    };

    let echoed = if uppercase { message.to_uppercase() } else { message.clone() };
    tracing::debug!(%message, %echoed, "echo");
    Ok(json!({
        "original": message,
        "echoed": echoed,
        "uppercase": uppercase,
        "timestamp": timestamp(),
        "length": message.chars().count(),
        "service": NAME,
    }))
}
