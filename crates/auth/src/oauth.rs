// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entra ID token endpoint client.
//!
//! Covers the client credentials grant, the refresh token grant, and the
//! OAuth 2.0 Device Authorization Grant (RFC 8628). A reply is judged by its
//! body: `access_token` means success, `error` means a rejection, anything
//! else is malformed.

use std::fmt;
use std::sync::Once;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::config::AuthConfig;
use crate::manager::DEFAULT_EXPIRES_IN;

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

/// Install the ring crypto provider for rustls once per process.
pub fn ensure_crypto() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Token endpoint reply, success or error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenReply {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl TokenReply {
    pub fn into_grant(self) -> Result<TokenGrant, GrantError> {
        match (self.access_token, self.error) {
            (Some(access_token), _) => Ok(TokenGrant {
                access_token,
                refresh_token: self.refresh_token,
                expires_in: self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN),
            }),
            (None, Some(error)) => {
                Err(GrantError::Rejected { error, description: self.error_description })
            }
            (None, None) => {
                Err(GrantError::Malformed("reply has neither access_token nor error".into()))
            }
        }
    }
}

/// Tokens issued by a successful grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: u64,
}

/// RFC 8628 device authorization response.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCode {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default = "default_device_expiry")]
    pub expires_in: u64,
    #[serde(default = "default_interval")]
    pub interval: u64,
    /// Human-readable sign-in instructions from the provider.
    #[serde(default)]
    pub message: Option<String>,
}

impl DeviceCode {
    /// Provider instructions, or a generic message built from the code and URL.
    pub fn instructions(&self) -> String {
        match self.message {
            Some(ref message) => message.clone(),
            None => format!(
                "To sign in, open {} and enter the code {}",
                self.verification_uri, self.user_code
            ),
        }
    }
}

fn default_device_expiry() -> u64 {
    900
}

fn default_interval() -> u64 {
    5
}

/// Why a grant produced no token.
#[derive(Debug)]
pub enum GrantError {
    /// The identity provider answered with an OAuth error.
    Rejected { error: String, description: Option<String> },
    Transport(reqwest::Error),
    Malformed(String),
    /// The device code lapsed before the user finished signing in.
    Expired,
    MissingSecret,
}

impl GrantError {
    /// Short machine-readable label for logs and events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Rejected { .. } => "rejected",
            Self::Transport(_) => "transport",
            Self::Malformed(_) => "malformed",
            Self::Expired => "expired",
            Self::MissingSecret => "missing_secret",
        }
    }
}

impl fmt::Display for GrantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { error, description: Some(description) } => {
                write!(f, "{error}: {description}")
            }
            Self::Rejected { error, description: None } => f.write_str(error),
            Self::Transport(e) => write!(f, "request failed: {e}"),
            Self::Malformed(msg) => write!(f, "malformed token response: {msg}"),
            Self::Expired => f.write_str("device code expired before user completed authorization"),
            Self::MissingSecret => f.write_str("client secret is not configured"),
        }
    }
}

impl std::error::Error for GrantError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GrantError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e)
    }
}

/// HTTP client bound to one app registration and authority.
pub struct EntraClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: Option<String>,
    token_url: String,
    device_code_url: String,
}

impl EntraClient {
    pub fn new(config: &AuthConfig) -> Result<Self, reqwest::Error> {
        ensure_crypto();
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            client_id: config.client_id().to_owned(),
            client_secret: config.client_secret().map(str::to_owned),
            token_url: config.token_endpoint(),
            device_code_url: config.device_code_endpoint(),
        })
    }

    /// Client credentials grant for the app registration itself.
    pub async fn client_credentials(&self, scopes: &[String]) -> Result<TokenGrant, GrantError> {
        let secret = self.client_secret.as_deref().ok_or(GrantError::MissingSecret)?;
        let scope = scopes.join(" ");
        self.post_token(&[
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", secret),
            ("scope", scope.as_str()),
        ])
        .await?
        .into_grant()
    }

    /// Refresh token grant as a public client.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        scopes: &[String],
    ) -> Result<TokenGrant, GrantError> {
        let scope = scopes.join(" ");
        self.post_token(&[
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("scope", scope.as_str()),
        ])
        .await?
        .into_grant()
    }

    /// Begin device authorization by POSTing to the device code endpoint.
    pub async fn start_device_flow(&self, scopes: &[String]) -> Result<DeviceCode, GrantError> {
        let scope = scopes.join(" ");
        let resp = self
            .http
            .post(&self.device_code_url)
            .form(&[("client_id", self.client_id.as_str()), ("scope", scope.as_str())])
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;

        if let Ok(device) = serde_json::from_str::<DeviceCode>(&text) {
            return Ok(device);
        }
        match serde_json::from_str::<TokenReply>(&text) {
            Ok(TokenReply { error: Some(error), error_description, .. }) => {
                Err(GrantError::Rejected { error, description: error_description })
            }
            _ => Err(GrantError::Malformed(format!(
                "device code reply ({status}): {}",
                snippet(&text)
            ))),
        }
    }

    /// Poll the token endpoint until the user completes authorization or the code expires.
    pub async fn poll_device_code(&self, device: &DeviceCode) -> Result<TokenGrant, GrantError> {
        let mut poll_interval = Duration::from_secs(device.interval.max(1));
        let deadline = tokio::time::Instant::now() + Duration::from_secs(device.expires_in);

        loop {
            tokio::time::sleep(poll_interval).await;

            if tokio::time::Instant::now() >= deadline {
                return Err(GrantError::Expired);
            }

            let reply = self
                .post_token(&[
                    ("grant_type", DEVICE_CODE_GRANT),
                    ("client_id", self.client_id.as_str()),
                    ("device_code", device.device_code.as_str()),
                ])
                .await?;

            match reply.error.as_deref() {
                Some("authorization_pending") => continue,
                Some("slow_down") => {
                    poll_interval += SLOW_DOWN_STEP;
                    debug!(interval = ?poll_interval, "device code poll slowed down");
                    continue;
                }
                Some("expired_token") => return Err(GrantError::Expired),
                _ => return reply.into_grant(),
            }
        }
    }

    async fn post_token(&self, form: &[(&str, &str)]) -> Result<TokenReply, GrantError> {
        let resp = self.http.post(&self.token_url).form(form).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        serde_json::from_str(&text)
            .map_err(|_| GrantError::Malformed(format!("token reply ({status}): {}", snippet(&text))))
    }
}

fn snippet(text: &str) -> &str {
    match text.char_indices().nth(200) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
#[path = "oauth_tests.rs"]
mod tests;
