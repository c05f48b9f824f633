// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal Microsoft Graph client for permission probes.

use std::time::Duration;

use reqwest::StatusCode;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a single authenticated GET against Graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Ok,
    Forbidden,
    Status(u16),
    TimedOut,
    Failed(String),
}

#[derive(Clone)]
pub struct GraphClient {
    http: reqwest::Client,
    base_url: String,
}

impl GraphClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        poxauth::oauth::ensure_crypto();
        let http = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET {base}{path}` with `Authorization: Bearer <token>`.
    pub async fn probe(&self, path: &str, token: &str) -> ProbeOutcome {
        let url = format!("{}{path}", self.base_url);
        match self.http.get(&url).bearer_auth(token).send().await {
            Ok(resp) => match resp.status() {
                StatusCode::OK => ProbeOutcome::Ok,
                StatusCode::FORBIDDEN => ProbeOutcome::Forbidden,
                other => ProbeOutcome::Status(other.as_u16()),
            },
            Err(e) if e.is_timeout() => ProbeOutcome::TimedOut,
            Err(e) => ProbeOutcome::Failed(e.to_string()),
        }
    }
}
