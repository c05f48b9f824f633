// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `check_token_permissions`: probe Graph endpoints with the server's token
//! and report which application permissions actually work.

use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{timestamp, ToolDescriptor};
use crate::graph::ProbeOutcome;
use crate::state::AppState;

pub const NAME: &str = "check_token_permissions";

/// Upper bound on waiting for a token before reporting "try later".
pub const TOKEN_TIMEOUT: Duration = Duration::from_secs(10);

/// `(permission, Graph path, resource description)`
const PROBES: &[(&str, &str, &str)] = &[
    ("Application.Read.All", "/v1.0/applications?$top=1", "applications"),
    ("Device.Read.All", "/v1.0/devices?$top=1", "devices"),
    ("DeviceManagementApps.Read.All", "/beta/deviceAppManagement/mobileApps?$top=1", "Intune apps"),
    (
        "DeviceManagementApps.ReadWrite.All",
        "/beta/deviceAppManagement/mobileApps?$top=1",
        "Intune apps (write)",
    ),
    (
        "DeviceManagementConfiguration.ReadWrite.All",
        "/beta/deviceManagement/deviceConfigurations?$top=1",
        "device configurations",
    ),
    (
        "DeviceManagementManagedDevices.ReadWrite.All",
        "/beta/deviceManagement/managedDevices?$top=1",
        "managed devices",
    ),
    ("Directory.Read.All", "/v1.0/users?$top=1", "directory data"),
    (
        "EntitlementManagement.ReadWrite.All",
        "/v1.0/identityGovernance/entitlementManagement/catalogs?$top=1",
        "entitlement management",
    ),
    ("Group.Read.All", "/v1.0/groups?$top=1", "groups"),
    ("Group.ReadWrite.All", "/v1.0/groups?$top=1", "groups (write)"),
    ("GroupMember.Read.All", "/v1.0/groups?$top=1&$select=id", "group memberships"),
    ("GroupMember.ReadWrite.All", "/v1.0/groups?$top=1&$select=id", "group memberships (write)"),
    ("NetworkAccess.Read.All", "/beta/networkAccess/forwardingProfiles", "network access"),
    ("NetworkAccess.ReadWrite.All", "/beta/networkAccess/forwardingProfiles", "network access (write)"),
    ("Policy.Read.All", "/v1.0/policies/authorizationPolicy", "policies"),
    (
        "Policy.Read.ConditionalAccess",
        "/v1.0/identity/conditionalAccess/policies?$top=1",
        "conditional access policies",
    ),
    (
        "Policy.ReadWrite.ConditionalAccess",
        "/beta/identity/conditionalAccess/policies?$top=1",
        "conditional access policies (write)",
    ),
    ("User.Read.All", "/v1.0/users?$top=1", "users' full profiles"),
    ("User.ReadBasic.All", "/v1.0/users?$top=1&$select=id,displayName", "users' basic profiles"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionStatus {
    Working,
    Missing,
    Error,
    Timeout,
}

#[derive(Debug, Clone, Serialize)]
pub struct PermissionTest {
    pub permission: &'static str,
    pub status: PermissionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub endpoint: String,
}

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: NAME,
        description: "Check Microsoft Graph API token permissions and troubleshoot access issues",
        input_schema: json!({ "type": "object", "properties": {} }),
    }
}

fn error_report(message: String) -> Value {
    json!({ "status": "error", "message": message, "timestamp": timestamp() })
}

pub async fn call(state: &AppState) -> Value {
    let token = match state.auth.bearer_token(Some(TOKEN_TIMEOUT)).await {
        Ok(token) => token,
        Err(e) => {
            warn!(reason = %e, "no token for permission diagnostics");
            return error_report(e.to_string());
        }
    };

    info!("starting token permissions diagnostic");
    let mut lines = vec!["Token Permissions Diagnostic".to_owned(), String::new()];
    let mut tests = Vec::with_capacity(PROBES.len());

    for (num, (permission, path, resource)) in PROBES.iter().enumerate() {
        lines.push(format!("Test {}: {permission}", num + 1));
        let endpoint = format!("{}{path}", state.graph.base_url());
        let (status, error, line) = match state.graph.probe(path, &token).await {
            ProbeOutcome::Ok => (PermissionStatus::Working, None, format!("can read {resource}")),
            ProbeOutcome::Forbidden => (
                PermissionStatus::Missing,
                Some("Insufficient privileges".to_owned()),
                format!("cannot read {resource}: insufficient privileges"),
            ),
            ProbeOutcome::Status(code) => (
                PermissionStatus::Error,
                Some(format!("HTTP {code}")),
                format!("cannot read {resource}: HTTP {code}"),
            ),
            ProbeOutcome::TimedOut => (
                PermissionStatus::Timeout,
                Some("Request timed out".to_owned()),
                format!("request timed out for {resource}"),
            ),
            ProbeOutcome::Failed(e) => {
                let line = format!("error testing {resource}: {e}");
                (PermissionStatus::Error, Some(e), line)
            }
        };
        lines.push(format!("  {line}"));
        tests.push(PermissionTest { permission, status, error, endpoint });
    }

    let working = tests.iter().filter(|t| t.status == PermissionStatus::Working).count();
    let missing = tests
        .iter()
        .filter(|t| matches!(t.status, PermissionStatus::Missing | PermissionStatus::Error))
        .count();

    lines.push(String::new());
    lines.push(format!("Results: {working} working / {missing} missing"));
    for test in &tests {
        lines.push(format!("  {:?} {}", test.status, test.permission));
    }
    lines.push(String::new());
    if missing > 0 {
        lines.extend(
            [
                "Missing permissions detected. To fix:",
                "  1. Open App Registrations in the Azure portal",
                "  2. Select this app registration",
                "  3. Open API Permissions",
                "  4. Add the missing permissions",
                "  5. Grant admin consent",
                "  6. Allow 10-30 minutes for propagation",
            ]
            .map(str::to_owned),
        );
    } else {
        lines.push("All tested permissions are working.".to_owned());
    }

    info!(working, total = tests.len(), "permission diagnostic completed");

    let data = json!({
        "summary": {
            "working": working,
            "missing": missing,
            "total": tests.len(),
            "timestamp": timestamp(),
        },
        "tests": tests,
    });
    json!({
        "status": "success",
        "message": lines.join("\n"),
        "data": data,
        "timestamp": timestamp(),
    })
}
