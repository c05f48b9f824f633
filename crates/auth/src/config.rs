// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entra ID authentication settings.
//!
//! [`AuthConfig`] is immutable once built. Use [`AuthConfig::builder`] in code
//! and [`AuthConfig::from_env`] at process startup.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use tracing::{info, warn};

/// Scope requested when none is configured.
pub const DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Redirect URI registered for interactive flows when none is configured.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8000/callback";

/// Placeholder recorded for a tenant or client id absent from the environment.
pub const NOT_CONFIGURED: &str = "not-configured";

const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Which grant the provider uses to obtain tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Client credentials grant on behalf of the app registration itself.
    #[default]
    Application,
    /// Device code grant on behalf of a signed-in user.
    Delegated,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::Delegated => "delegated",
        }
    }
}

impl FromStr for AuthMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "application" => Ok(Self::Application),
            "delegated" => Ok(Self::Delegated),
            other => Err(ConfigError::InvalidMode(other.to_owned())),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected authentication configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidMode(String),
    EmptyScopes,
    MissingTenantId,
    MissingClientId,
    MissingClientSecret,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMode(got) => {
                write!(f, "auth_mode must be either 'delegated' or 'application' (got {got:?})")
            }
            Self::EmptyScopes => f.write_str("scopes must be a non-empty list"),
            Self::MissingTenantId => {
                f.write_str("tenant_id is required when authentication is enabled")
            }
            Self::MissingClientId => {
                f.write_str("client_id is required when authentication is enabled")
            }
            Self::MissingClientSecret => {
                f.write_str("client_secret is required for application authentication mode")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Immutable Entra ID configuration record.
#[derive(Clone)]
pub struct AuthConfig {
    tenant_id: String,
    client_id: String,
    client_secret: Option<String>,
    authority: String,
    scopes: Vec<String>,
    redirect_uri: String,
    enabled: bool,
    mode: AuthMode,
    cache_path: Option<PathBuf>,
}

impl AuthConfig {
    pub fn builder(tenant_id: impl Into<String>, client_id: impl Into<String>) -> AuthConfigBuilder {
        AuthConfigBuilder {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: None,
            authority: None,
            scopes: vec![DEFAULT_SCOPE.to_owned()],
            redirect_uri: DEFAULT_REDIRECT_URI.to_owned(),
            enabled: false,
            mode: AuthMode::default(),
            cache_path: None,
        }
    }

    /// Configuration with authentication switched off and placeholder ids.
    pub fn disabled() -> Self {
        Self::builder(NOT_CONFIGURED, NOT_CONFIGURED).into_config()
    }

    /// Load from the `ENTRA_*` process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup using the `ENTRA_*` variable names.
    ///
    /// A missing tenant or client id yields a disabled configuration rather
    /// than an error. An unknown auth mode or an empty scope list is an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let (tenant_id, client_id) =
            match (non_empty("ENTRA_TENANT_ID"), non_empty("ENTRA_CLIENT_ID")) {
                (Some(tenant), Some(client)) => (tenant, client),
                (tenant, client) => {
                    warn!("ENTRA_TENANT_ID and ENTRA_CLIENT_ID not found, authentication disabled");
                    return Ok(Self::builder(
                        tenant.unwrap_or_else(|| NOT_CONFIGURED.to_owned()),
                        client.unwrap_or_else(|| NOT_CONFIGURED.to_owned()),
                    )
                    .into_config());
                }
            };

        let scopes = match lookup("ENTRA_SCOPES") {
            Some(raw) => parse_scopes(&raw),
            None => vec![DEFAULT_SCOPE.to_owned()],
        };
        let enabled =
            lookup("ENTRA_ENABLE_AUTH").is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
        let mode = match non_empty("ENTRA_AUTH_MODE") {
            Some(raw) => raw.trim().parse()?,
            None => AuthMode::default(),
        };

        let mut builder = Self::builder(tenant_id, client_id)
            .scopes(scopes)
            .enabled(enabled)
            .mode(mode)
            .redirect_uri(
                non_empty("ENTRA_REDIRECT_URI").unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_owned()),
            );
        if let Some(secret) = non_empty("ENTRA_CLIENT_SECRET") {
            builder = builder.client_secret(secret);
        }
        if let Some(authority) = non_empty("ENTRA_AUTHORITY") {
            builder = builder.authority(authority);
        }
        if let Some(path) = non_empty("ENTRA_TOKEN_CACHE_PATH") {
            builder = builder.cache_path(path);
        }

        let config = builder.build()?;
        info!(enabled, mode = %config.mode, "auth config loaded from environment");
        Ok(config)
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref()
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn cache_path(&self) -> Option<&Path> {
        self.cache_path.as_deref()
    }

    /// `{authority}/oauth2/v2.0/token`
    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority.trim_end_matches('/'))
    }

    /// `{authority}/oauth2/v2.0/devicecode`
    pub fn device_code_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/devicecode", self.authority.trim_end_matches('/'))
    }

    /// Check that an enabled configuration has everything its mode needs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        if self.tenant_id.is_empty() || self.tenant_id == NOT_CONFIGURED {
            return Err(ConfigError::MissingTenantId);
        }
        if self.client_id.is_empty() || self.client_id == NOT_CONFIGURED {
            return Err(ConfigError::MissingClientId);
        }
        if self.mode == AuthMode::Application && self.client_secret.is_none() {
            return Err(ConfigError::MissingClientSecret);
        }
        Ok(())
    }

    /// A loggable view with the client secret masked.
    pub fn safe_config(&self) -> SafeConfig<'_> {
        SafeConfig {
            tenant_id: &self.tenant_id,
            client_id: &self.client_id,
            client_secret: self.client_secret.as_ref().map(|_| "***"),
            authority: &self.authority,
            scopes: &self.scopes,
            redirect_uri: &self.redirect_uri,
            enabled: self.enabled,
            mode: self.mode,
            cache_path: self.cache_path.as_deref(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.safe_config(), f)
    }
}

/// Serializable configuration view without secrets.
#[derive(Debug, Serialize)]
pub struct SafeConfig<'a> {
    pub tenant_id: &'a str,
    pub client_id: &'a str,
    pub client_secret: Option<&'static str>,
    pub authority: &'a str,
    pub scopes: &'a [String],
    pub redirect_uri: &'a str,
    pub enabled: bool,
    pub mode: AuthMode,
    pub cache_path: Option<&'a Path>,
}

/// Builder for [`AuthConfig`].
#[derive(Debug)]
pub struct AuthConfigBuilder {
    tenant_id: String,
    client_id: String,
    client_secret: Option<String>,
    authority: Option<String>,
    scopes: Vec<String>,
    redirect_uri: String,
    enabled: bool,
    mode: AuthMode,
    cache_path: Option<PathBuf>,
}

impl AuthConfigBuilder {
    pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Override the default `https://login.microsoftonline.com/{tenant}`.
    pub fn authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = Some(authority.into());
        self
    }

    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = uri.into();
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn mode(mut self, mode: AuthMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<AuthConfig, ConfigError> {
        if self.scopes.is_empty() {
            return Err(ConfigError::EmptyScopes);
        }
        if self.mode == AuthMode::Application && self.client_secret.is_none() && self.enabled {
            warn!("application mode requires a client secret, authentication may fail");
        }
        Ok(self.into_config())
    }

    fn into_config(self) -> AuthConfig {
        let authority =
            self.authority.unwrap_or_else(|| format!("{AUTHORITY_HOST}/{}", self.tenant_id));
        AuthConfig {
            tenant_id: self.tenant_id,
            client_id: self.client_id,
            client_secret: self.client_secret,
            authority,
            scopes: self.scopes,
            redirect_uri: self.redirect_uri,
            enabled: self.enabled,
            mode: self.mode,
            cache_path: self.cache_path,
        }
    }
}

fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned).collect()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
