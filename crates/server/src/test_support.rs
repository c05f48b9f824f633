// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: state builders and assertion helpers.

use std::sync::Arc;

use clap::Parser;
use poxauth::{AuthConfig, AuthMiddleware};
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Assert that a `Result` is `Err` and its display string contains a substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}

/// Server state with authentication disabled and default flags.
pub fn test_state() -> AppState {
    let config = ServerConfig::parse_from(["pox-mcp"]);
    let auth = Arc::new(AuthMiddleware::new(AuthConfig::disabled()));
    AppState::new(config, auth, CancellationToken::new()).expect("state")
}
