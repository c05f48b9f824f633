// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::Serialize;

use crate::config::AuthMode;

/// Events broadcast by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthEvent {
    /// A device code was issued; a human must visit the URL and enter the code.
    DeviceCodeIssued { user_code: String, verification_uri: String, message: String },
    /// A new token was obtained through a full grant.
    TokenAcquired { mode: AuthMode },
    TokenRefreshed,
    /// Refresh failed; all credentials were discarded.
    RefreshFailed { error: String },
    AcquireFailed { error: String },
    Cleared,
}
