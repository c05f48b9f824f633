// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token manager: the single owner of the credential record.
//!
//! [`TokenManager`] is synchronous and does blocking file I/O. Async code goes
//! through [`TokenStore`], which serializes access behind a mutex and runs each
//! operation on the blocking pool so the scheduler never stalls on disk.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::store::{self, CredentialRecord};

/// Safety margin applied when deciding whether a cached token is still usable.
pub const DEFAULT_EXPIRY_BUFFER: Duration = Duration::from_secs(300);

/// Lifetime assumed when the identity provider omits `expires_in`.
pub const DEFAULT_EXPIRES_IN: u64 = 3600;

/// Non-secret summary of the credential record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenStatus {
    pub has_access_token: bool,
    pub has_refresh_token: bool,
    pub is_expired: bool,
    pub expiry: Option<DateTime<Utc>>,
    pub cache_enabled: bool,
}

impl TokenStatus {
    fn unavailable() -> Self {
        Self {
            has_access_token: false,
            has_refresh_token: false,
            is_expired: true,
            expiry: None,
            cache_enabled: false,
        }
    }
}

pub struct TokenManager {
    record: CredentialRecord,
    cache_path: Option<PathBuf>,
}

impl TokenManager {
    /// Create a manager, loading the cache file when one is configured.
    ///
    /// An expired, unreadable, or malformed cache is cleared. Never fails.
    pub fn new(cache_path: Option<PathBuf>) -> Self {
        let mut manager = Self { record: CredentialRecord::default(), cache_path };
        manager.load_cache();
        manager
    }

    /// In-memory manager with no cache file.
    pub fn in_memory() -> Self {
        Self::new(None)
    }

    fn load_cache(&mut self) {
        let Some(path) = self.cache_path.clone() else {
            return;
        };
        if !path.exists() {
            return;
        }
        match store::load(&path) {
            Ok(record) if record.is_expired_at(Utc::now(), Duration::ZERO) => {
                info!(path = %path.display(), "cached token expired, clearing");
                self.clear();
            }
            Ok(record) => {
                info!(path = %path.display(), expiry = ?record.expiry, "loaded cached token");
                self.record = record;
            }
            Err(e) => {
                warn!(path = %path.display(), err = %e, "failed to load token cache, clearing");
                self.clear();
            }
        }
    }

    fn save_cache(&self) {
        let Some(ref path) = self.cache_path else {
            return;
        };
        match store::save(path, &self.record) {
            Ok(()) => debug!(path = %path.display(), "token cache saved"),
            Err(e) => error!(path = %path.display(), err = %e, "failed to save token cache"),
        }
    }

    /// Replace the record with a freshly issued token and persist it.
    pub fn store(&mut self, access_token: String, refresh_token: Option<String>, expires_in: u64) {
        self.record = CredentialRecord::issued(access_token, refresh_token, expires_in, Utc::now());
        debug!(expiry = ?self.record.expiry, "tokens stored");
        self.save_cache();
    }

    /// The access token, if present and not expiring within the default buffer.
    pub fn access_token(&self) -> Option<String> {
        if self.is_expired(DEFAULT_EXPIRY_BUFFER) {
            return None;
        }
        self.record.access_token.clone()
    }

    /// The refresh token as stored; no freshness check.
    pub fn refresh_token(&self) -> Option<String> {
        self.record.refresh_token.clone()
    }

    pub fn is_expired(&self, buffer: Duration) -> bool {
        self.record.is_expired_at(Utc::now(), buffer)
    }

    /// Reset the record and delete the cache file. Idempotent.
    pub fn clear(&mut self) {
        self.record = CredentialRecord::default();
        if let Some(ref path) = self.cache_path {
            match store::remove(path) {
                Ok(true) => debug!(path = %path.display(), "token cache deleted"),
                Ok(false) => {}
                Err(e) => error!(path = %path.display(), err = %e, "failed to delete token cache"),
            }
        }
    }

    pub fn status(&self) -> TokenStatus {
        TokenStatus {
            has_access_token: self.record.access_token.is_some(),
            has_refresh_token: self.record.refresh_token.is_some(),
            is_expired: self.is_expired(DEFAULT_EXPIRY_BUFFER),
            expiry: self.record.expiry,
            cache_enabled: self.cache_path.is_some(),
        }
    }

    pub fn record(&self) -> &CredentialRecord {
        &self.record
    }
}

/// Async, cloneable handle to a lock-guarded [`TokenManager`].
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<Mutex<TokenManager>>,
}

impl TokenStore {
    /// Build the manager (including its cache load) on the blocking pool.
    pub async fn open(cache_path: Option<PathBuf>) -> Self {
        let manager = match tokio::task::spawn_blocking(move || TokenManager::new(cache_path)).await
        {
            Ok(manager) => manager,
            Err(e) => {
                error!(err = %e, "token cache load task failed, continuing without cache");
                TokenManager::in_memory()
            }
        };
        Self::from_manager(manager)
    }

    pub fn from_manager(manager: TokenManager) -> Self {
        Self { inner: Arc::new(Mutex::new(manager)) }
    }

    /// Run `op` under the lock on the blocking pool, or return `fallback` if the task dies.
    async fn run<T, F>(&self, fallback: T, op: F) -> T
    where
        T: Send + 'static,
        F: FnOnce(&mut TokenManager) -> T + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        match tokio::task::spawn_blocking(move || op(&mut inner.lock())).await {
            Ok(value) => value,
            Err(e) => {
                error!(err = %e, "token store task failed");
                fallback
            }
        }
    }

    pub async fn store(&self, access_token: String, refresh_token: Option<String>, expires_in: u64) {
        self.run((), move |m| m.store(access_token, refresh_token, expires_in)).await
    }

    pub async fn access_token(&self) -> Option<String> {
        self.run(None, |m| m.access_token()).await
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.run(None, |m| m.refresh_token()).await
    }

    pub async fn is_expired(&self, buffer: Duration) -> bool {
        self.run(true, move |m| m.is_expired(buffer)).await
    }

    pub async fn clear(&self) {
        self.run((), |m| m.clear()).await
    }

    pub async fn status(&self) -> TokenStatus {
        self.run(TokenStatus::unavailable(), |m| m.status()).await
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
