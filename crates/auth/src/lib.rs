// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entra ID token acquisition, caching, and refresh.
//!
//! Layers, top to bottom: [`middleware::AuthMiddleware`] (what tool handlers
//! hold), [`provider::AuthProvider`] (reuse, refresh, or acquire),
//! [`manager::TokenStore`] (lock-guarded credential record), and
//! [`store`] (the cache file).

pub mod config;
pub mod event;
pub mod flow;
pub mod manager;
pub mod middleware;
pub mod oauth;
pub mod provider;
pub mod store;

pub use config::{AuthConfig, AuthMode, ConfigError};
pub use event::AuthEvent;
pub use middleware::{AuthMiddleware, AuthStatus, AuthUnavailable};
pub use provider::{AuthProvider, InitError};

#[cfg(test)]
pub(crate) mod test_support;
