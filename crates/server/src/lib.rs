// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! pox-mcp: MCP tool server backed by Entra ID authentication.

pub mod config;
pub mod error;
pub mod graph;
pub mod mcp;
pub mod state;
pub mod tools;
pub mod transport;

use std::sync::Arc;

use poxauth::{AuthEvent, AuthMiddleware};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ServerConfig, Transport};
use crate::state::AppState;

#[cfg(test)]
pub(crate) mod test_support;

/// Run the server until the transport finishes or shutdown is requested.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let transport = config.transport()?;
    let auth = Arc::new(AuthMiddleware::from_env()?);
    info!(config = ?auth.config().safe_config(), "auth configuration");

    let status = auth.status().await;
    info!(enabled = status.enabled, mode = ?status.mode, "{}", status.message);

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());
    spawn_server_auth(Arc::clone(&auth));

    info!(%transport, "pox-mcp starting");
    let state = Arc::new(AppState::new(config, auth, shutdown)?);
    match transport {
        Transport::Stdio => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            transport::stdio::serve(state, stdin, tokio::io::stdout()).await
        }
        Transport::Http => transport::serve_http(state).await,
    }
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            shutdown.cancel();
        }
    });
}

/// Authenticate in the background so startup never blocks on a device code.
fn spawn_server_auth(auth: Arc<AuthMiddleware>) {
    if !auth.config().enabled() {
        return;
    }
    tokio::spawn(relay_auth_events(auth.subscribe()));
    tokio::spawn(async move {
        if auth.authenticate_server().await {
            info!("server authentication complete");
        } else {
            warn!("server authentication failed, tools needing a token will report it");
        }
    });
}

/// Surface provider events; device code instructions go to stderr for the operator.
async fn relay_auth_events(mut rx: broadcast::Receiver<AuthEvent>) {
    loop {
        match rx.recv().await {
            Ok(AuthEvent::DeviceCodeIssued { message, .. }) => {
                eprintln!("\n{message}\n");
            }
            Ok(event) => debug!(?event, "auth event"),
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
}
