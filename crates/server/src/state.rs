// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use poxauth::AuthMiddleware;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::graph::GraphClient;

/// Shared server state handed to every transport and tool.
pub struct AppState {
    pub config: ServerConfig,
    pub auth: Arc<AuthMiddleware>,
    pub graph: GraphClient,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        auth: Arc<AuthMiddleware>,
        shutdown: CancellationToken,
    ) -> anyhow::Result<Self> {
        let graph = GraphClient::new(&config.graph_url)?;
        Ok(Self { config, auth, graph, shutdown })
    }
}
