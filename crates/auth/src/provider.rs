// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authentication provider: decides whether to reuse, refresh, or acquire.
//!
//! Every identity-provider failure is logged and reported as "no token";
//! only configuration problems surface as errors, and only at construction.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use crate::config::{AuthConfig, AuthMode, ConfigError};
use crate::event::AuthEvent;
use crate::flow::{self, AuthState, FlowInput, RefreshOutcome, Transition};
use crate::manager::{TokenStatus, TokenStore};
use crate::oauth::{EntraClient, GrantError, TokenGrant};

pub(crate) const EVENT_CAPACITY: usize = 16;

/// Provider construction failure.
#[derive(Debug)]
pub enum InitError {
    Config(ConfigError),
    Client(reqwest::Error),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid auth config: {e}"),
            Self::Client(e) => write!(f, "failed to build http client: {e}"),
        }
    }
}

impl std::error::Error for InitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Client(e) => Some(e),
        }
    }
}

impl From<ConfigError> for InitError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Provider-level status; never contains token values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    pub enabled: bool,
    pub mode: AuthMode,
    pub authenticated: bool,
    pub token: TokenStatus,
}

pub struct AuthProvider {
    config: AuthConfig,
    store: TokenStore,
    client: EntraClient,
    /// Serializes refresh and acquisition so concurrent misses share one grant.
    acquire_lock: Mutex<()>,
    event_tx: broadcast::Sender<AuthEvent>,
}

impl AuthProvider {
    /// Validate `config`, open its token cache, and build the HTTP client.
    pub async fn new(config: AuthConfig) -> Result<Self, InitError> {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self::with_events(config, event_tx).await
    }

    /// Like [`AuthProvider::new`], publishing events on an existing channel.
    pub async fn with_events(
        config: AuthConfig,
        event_tx: broadcast::Sender<AuthEvent>,
    ) -> Result<Self, InitError> {
        config.validate()?;
        let client = EntraClient::new(&config).map_err(InitError::Client)?;
        let store = TokenStore::open(config.cache_path().map(Path::to_path_buf)).await;
        info!(mode = %config.mode(), enabled = config.enabled(), "auth provider initialized");
        Ok(Self { config, store, client, acquire_lock: Mutex::new(()), event_tx })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: AuthEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Return a usable access token, refreshing or acquiring one if needed.
    ///
    /// `None` when authentication is disabled or every path failed.
    pub async fn get_access_token(&self, force_refresh: bool) -> Option<String> {
        if !self.config.enabled() {
            debug!("authentication disabled, no token");
            return None;
        }
        if !force_refresh {
            if let Some(token) = self.store.access_token().await {
                return Some(token);
            }
        }

        let _guard = self.acquire_lock.lock().await;

        // Another caller may have finished a grant while we waited.
        let cached = if force_refresh { None } else { self.store.access_token().await };
        let mut state = flow::start(FlowInput {
            enabled: true,
            mode: self.config.mode(),
            cached,
            refresh_token: self.store.refresh_token().await,
            force_refresh,
        });

        loop {
            state = match state {
                AuthState::Disabled => return None,
                AuthState::CacheValid(token) => {
                    debug!("using cached access token");
                    return Some(token);
                }
                AuthState::Refreshing(refresh_token) => {
                    let outcome = self.refresh(refresh_token).await;
                    match flow::after_refresh(self.config.mode(), outcome) {
                        Transition::Finish(token) => return token,
                        Transition::Continue { clear_credentials, next } => {
                            if clear_credentials {
                                self.store.clear().await;
                            }
                            next
                        }
                    }
                }
                AuthState::Acquiring(mode) => return self.acquire(mode).await,
            };
        }
    }

    async fn refresh(&self, refresh_token: String) -> RefreshOutcome {
        info!("refreshing access token");
        match self.client.refresh(&refresh_token, self.config.scopes()).await {
            Ok(TokenGrant { access_token, refresh_token: rotated, expires_in }) => {
                // Entra may omit the refresh token; keep the one we already hold.
                let keep = rotated.or(Some(refresh_token));
                self.store.store(access_token.clone(), keep, expires_in).await;
                info!(expires_in, "access token refreshed");
                self.emit(AuthEvent::TokenRefreshed);
                RefreshOutcome::Refreshed(access_token)
            }
            Err(e) => {
                warn!(kind = e.kind(), err = %e, "token refresh failed, clearing credentials");
                self.emit(AuthEvent::RefreshFailed { error: e.to_string() });
                RefreshOutcome::Failed
            }
        }
    }

    async fn acquire(&self, mode: AuthMode) -> Option<String> {
        let result = match mode {
            AuthMode::Application => {
                info!("acquiring token with client credentials");
                self.client.client_credentials(self.config.scopes()).await
            }
            AuthMode::Delegated => self.device_code_grant().await,
        };

        match result {
            Ok(grant) => {
                let access_token = grant.access_token.clone();
                self.store.store(grant.access_token, grant.refresh_token, grant.expires_in).await;
                info!(%mode, expires_in = grant.expires_in, "access token acquired");
                self.emit(AuthEvent::TokenAcquired { mode });
                Some(access_token)
            }
            Err(e) => {
                error!(%mode, kind = e.kind(), err = %e, "token acquisition failed");
                self.emit(AuthEvent::AcquireFailed { error: e.to_string() });
                None
            }
        }
    }

    async fn device_code_grant(&self) -> Result<TokenGrant, GrantError> {
        info!("starting device code flow");
        let device = self.client.start_device_flow(self.config.scopes()).await?;
        let message = device.instructions();
        info!(
            user_code = %device.user_code,
            verification_uri = %device.verification_uri,
            expires_in = device.expires_in,
            "device code issued: {message}"
        );
        self.emit(AuthEvent::DeviceCodeIssued {
            user_code: device.user_code.clone(),
            verification_uri: device.verification_uri.clone(),
            message,
        });
        self.client.poll_device_code(&device).await
    }

    /// Discard all credentials, in memory and on disk.
    pub async fn clear_cache(&self) {
        self.store.clear().await;
        info!("token cache cleared");
        self.emit(AuthEvent::Cleared);
    }

    pub async fn status(&self) -> ProviderStatus {
        let token = self.store.status().await;
        ProviderStatus {
            enabled: self.config.enabled(),
            mode: self.config.mode(),
            authenticated: token.has_access_token && !token.is_expired,
            token,
        }
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
