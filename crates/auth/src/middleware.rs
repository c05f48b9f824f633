// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Caller-owned authentication facade for tool handlers.
//!
//! The server builds one [`AuthMiddleware`] at startup and hands an `Arc` of it
//! to everything that needs a token. The provider behind it is built lazily on
//! first use; a failed build is reported to that caller and retried next time.
//! Every provider it builds publishes on the middleware's event channel, so a
//! subscriber survives provider rebuilds.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::config::{AuthConfig, AuthMode, ConfigError};
use crate::event::AuthEvent;
use crate::provider::{AuthProvider, InitError, EVENT_CAPACITY};

/// Why a tool could not obtain a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthUnavailable {
    Disabled,
    NoToken,
    TimedOut(Duration),
}

impl fmt::Display for AuthUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str(
                "Authentication is disabled. Enable ENTRA authentication to use this tool.",
            ),
            Self::NoToken => f.write_str(
                "No valid access token. Authentication may be in progress or failed. \
                 Please wait a moment and try again.",
            ),
            Self::TimedOut(after) => write!(
                f,
                "Timeout acquiring access token after {}s. Authentication may still be in \
                 progress. Please try again in a moment.",
                after.as_secs()
            ),
        }
    }
}

impl std::error::Error for AuthUnavailable {}

/// Status reported to operators; never contains token values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    pub enabled: bool,
    pub mode: Option<AuthMode>,
    pub authenticated: bool,
    pub message: String,
}

pub struct AuthMiddleware {
    config: AuthConfig,
    provider: RwLock<Option<Arc<AuthProvider>>>,
    event_tx: broadcast::Sender<AuthEvent>,
}

impl AuthMiddleware {
    pub fn new(config: AuthConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { config, provider: RwLock::new(None), event_tx }
    }

    /// Build from the `ENTRA_*` environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(AuthConfig::from_env()?))
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Events from the current provider and any later rebuild.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.event_tx.subscribe()
    }

    /// The shared provider, built on first call.
    ///
    /// Idempotent once it succeeds. A validation or construction error leaves
    /// no provider behind, so a later call tries again.
    pub async fn provider(&self) -> Result<Arc<AuthProvider>, InitError> {
        if let Some(ref provider) = *self.provider.read().await {
            return Ok(Arc::clone(provider));
        }

        let mut slot = self.provider.write().await;
        if let Some(ref provider) = *slot {
            return Ok(Arc::clone(provider));
        }
        let provider =
            Arc::new(AuthProvider::with_events(self.config.clone(), self.event_tx.clone()).await?);
        *slot = Some(Arc::clone(&provider));
        Ok(provider)
    }

    pub async fn is_initialized(&self) -> bool {
        self.provider.read().await.is_some()
    }

    /// Drop the provider; the next call builds a fresh one.
    pub async fn reset(&self) {
        *self.provider.write().await = None;
        debug!("auth provider reset");
    }

    /// One acquisition attempt at startup. `true` immediately when disabled.
    pub async fn authenticate_server(&self) -> bool {
        if !self.config.enabled() {
            info!("authentication disabled, skipping server authentication");
            return true;
        }
        let provider = match self.provider().await {
            Ok(provider) => provider,
            Err(e) => {
                warn!(err = %e, "server authentication failed");
                return false;
            }
        };
        match provider.get_access_token(false).await {
            Some(_) => {
                info!(mode = %self.config.mode(), "server authenticated");
                true
            }
            None => {
                warn!(mode = %self.config.mode(), "server authentication failed");
                false
            }
        }
    }

    /// A valid token, or `None` on any failure. Never errors.
    pub async fn get_valid_token(&self) -> Option<String> {
        if !self.config.enabled() {
            return None;
        }
        match self.provider().await {
            Ok(provider) => provider.get_access_token(false).await,
            Err(e) => {
                warn!(err = %e, "auth provider unavailable");
                None
            }
        }
    }

    /// A token for an outbound call, with the reason when there is none.
    ///
    /// With a `timeout`, the acquisition runs as its own task and only the
    /// caller's wait is bounded. A device code sign-in keeps polling after the
    /// caller gives up; later callers queue behind it and get the cached token.
    pub async fn bearer_token(&self, timeout: Option<Duration>) -> Result<String, AuthUnavailable> {
        if !self.config.enabled() {
            return Err(AuthUnavailable::Disabled);
        }
        let Some(limit) = timeout else {
            return self.get_valid_token().await.ok_or(AuthUnavailable::NoToken);
        };

        let provider = match self.provider().await {
            Ok(provider) => provider,
            Err(e) => {
                warn!(err = %e, "auth provider unavailable");
                return Err(AuthUnavailable::NoToken);
            }
        };
        let attempt = tokio::spawn(async move { provider.get_access_token(false).await });
        match tokio::time::timeout(limit, attempt).await {
            Ok(Ok(token)) => token.ok_or(AuthUnavailable::NoToken),
            Ok(Err(e)) => {
                warn!(err = %e, "token acquisition task failed");
                Err(AuthUnavailable::NoToken)
            }
            Err(_) => {
                debug!(timeout_secs = limit.as_secs(), "still acquiring, caller stopped waiting");
                Err(AuthUnavailable::TimedOut(limit))
            }
        }
    }

    pub async fn status(&self) -> AuthStatus {
        if !self.config.enabled() {
            return AuthStatus {
                enabled: false,
                mode: None,
                authenticated: false,
                message: "Authentication is disabled".to_owned(),
            };
        }
        let provider = self.provider.read().await.clone();
        let Some(provider) = provider else {
            return AuthStatus {
                enabled: true,
                mode: Some(self.config.mode()),
                authenticated: false,
                message: "Auth provider not initialized".to_owned(),
            };
        };
        let status = provider.status().await;
        let message = if status.authenticated {
            "Authenticated"
        } else if status.token.has_refresh_token {
            "Token expired, refresh pending"
        } else {
            "Not authenticated"
        };
        AuthStatus {
            enabled: true,
            mode: Some(status.mode),
            authenticated: status.authenticated,
            message: message.to_owned(),
        }
    }

    /// Clear cached credentials. A no-op when no provider exists yet.
    pub async fn clear_auth(&self) {
        let provider = self.provider.read().await.clone();
        if let Some(provider) = provider {
            provider.clear_cache().await;
            info!("authentication state cleared");
        }
    }
}

#[cfg(test)]
#[path = "middleware_tests.rs"]
mod tests;
