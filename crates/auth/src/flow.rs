// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token acquisition state machine.
//!
//! Pure transitions only; the provider performs the I/O each state calls for.
//!
//! ```text
//! Disabled ──────────────────────────────► (none)
//! CacheValid(token) ─────────────────────► token
//! Refreshing(rt) ── ok ──────────────────► token
//!                └─ failed (clear all) ──► Acquiring(mode)
//! Acquiring(application) ─ client credentials ─► token | none
//! Acquiring(delegated) ─── device code ─────────► token | none
//! ```

use crate::config::AuthMode;

/// Where a token request currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Disabled,
    CacheValid(String),
    Refreshing(String),
    Acquiring(AuthMode),
}

/// What the provider knows when a token request begins.
#[derive(Debug, Clone, Default)]
pub struct FlowInput {
    pub enabled: bool,
    pub mode: AuthMode,
    /// Cached access token that is outside the expiry buffer.
    pub cached: Option<String>,
    pub refresh_token: Option<String>,
    pub force_refresh: bool,
}

/// Result of a refresh attempt, as seen by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed(String),
    Failed,
}

/// Next step after a state has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Finish(Option<String>),
    Continue { clear_credentials: bool, next: AuthState },
}

/// Entry state for a token request.
///
/// Refresh is only attempted in delegated mode; application mode re-runs
/// client credentials instead.
pub fn start(input: FlowInput) -> AuthState {
    if !input.enabled {
        return AuthState::Disabled;
    }
    if !input.force_refresh {
        if let Some(token) = input.cached {
            return AuthState::CacheValid(token);
        }
    }
    match (input.mode, input.refresh_token) {
        (AuthMode::Delegated, Some(rt)) => AuthState::Refreshing(rt),
        (mode, _) => AuthState::Acquiring(mode),
    }
}

/// Transition out of `Refreshing`. A failed refresh discards every credential.
pub fn after_refresh(mode: AuthMode, outcome: RefreshOutcome) -> Transition {
    match outcome {
        RefreshOutcome::Refreshed(token) => Transition::Finish(Some(token)),
        RefreshOutcome::Failed => {
            Transition::Continue { clear_credentials: true, next: AuthState::Acquiring(mode) }
        }
    }
}

#[cfg(test)]
#[path = "flow_tests.rs"]
mod tests;
