// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the JSON-RPC endpoint and operator routes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::mcp;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub auth_enabled: bool,
}

/// `GET /api/v1/health`
pub async fn health(State(s): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "running".to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        auth_enabled: s.auth.config().enabled(),
    })
}

/// `GET /api/v1/auth/status`
pub async fn auth_status(State(s): State<Arc<AppState>>) -> impl IntoResponse {
    Json(s.auth.status().await)
}

/// `POST {http_path}`: one JSON-RPC message. Notifications are answered with 202.
pub async fn rpc(State(s): State<Arc<AppState>>, body: String) -> Response {
    match mcp::handle_message(&s, &body).await {
        Some(resp) => Json(resp).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}
