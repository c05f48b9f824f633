// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! stdio and HTTP transports for the JSON-RPC dispatcher.

pub mod auth;
pub mod http;
pub mod stdio;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::state::AppState;

/// Build the axum `Router` with the RPC endpoint and operator routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let rpc_path = state.config.http_path.clone();
    Router::new()
        // Health (no auth)
        .route("/api/v1/health", get(http::health))
        .route("/api/v1/auth/status", get(http::auth_status))
        // JSON-RPC
        .route(&rpc_path, post(http::rpc))
        // Middleware
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_layer))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve HTTP until the shutdown token fires.
pub async fn serve_http(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = state.config.http_addr();
    let shutdown = state.shutdown.clone();
    let listener = TcpListener::bind(&addr).await?;
    info!("pox-mcp listening on http://{addr}{}", state.config.http_path);
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    Ok(())
}
