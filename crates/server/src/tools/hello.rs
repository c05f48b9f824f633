// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::{json, Value};
use tracing::{debug, warn};

use super::ToolDescriptor;

pub const NAME: &str = "hello_world";

const DEFAULT_NAME: &str = "World";

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: NAME,
        description: "Generate a personalized greeting message",
        input_schema: json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "The name to include in the greeting",
                    "default": DEFAULT_NAME,
                }
            },
        }),
    }
}

/// Greet `name`, falling back to "World" for a missing, blank, or non-string name.
pub fn call(args: &Value) -> Value {
    let name = match args.get("name") {
        None | Some(Value::Null) => DEFAULT_NAME,
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim(),
        Some(Value::String(_)) => DEFAULT_NAME,
        Some(other) => {
            warn!(name = %other, "invalid name parameter, using default");
            DEFAULT_NAME
        }
    };
    let message = format!("Hello, {name}! Welcome to pox-mcp.");
    debug!(%message, "generated greeting");
    json!({ "message": message, "name": name, "service": NAME })
}
