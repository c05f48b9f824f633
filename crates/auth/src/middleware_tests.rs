// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;

use super::*;
use crate::test_support::{error_body, token_body, MockIdp};

fn device_reply() -> serde_json::Value {
    json!({
        "device_code": "d",
        "user_code": "u",
        "verification_uri": "https://microsoft.com/devicelogin",
        "expires_in": 60,
        "interval": 1,
    })
}

#[tokio::test]
async fn disabled_middleware_short_circuits() {
    let auth = AuthMiddleware::new(AuthConfig::disabled());

    assert!(auth.authenticate_server().await);
    assert_eq!(auth.get_valid_token().await, None);
    assert_eq!(auth.bearer_token(None).await, Err(AuthUnavailable::Disabled));
    assert!(!auth.is_initialized().await);

    let status = auth.status().await;
    assert!(!status.enabled);
    assert_eq!(status.mode, None);
    assert_eq!(status.message, "Authentication is disabled");
}

#[tokio::test]
async fn provider_is_built_once() -> anyhow::Result<()> {
    let idp = MockIdp::start(vec![], vec![]).await;
    let auth = AuthMiddleware::new(idp.config(AuthMode::Application));
    assert_eq!(auth.status().await.message, "Auth provider not initialized");

    let first = auth.provider().await?;
    let second = auth.provider().await?;
    assert!(Arc::ptr_eq(&first, &second));

    auth.reset().await;
    assert!(!auth.is_initialized().await);
    let third = auth.provider().await?;
    assert!(!Arc::ptr_eq(&first, &third));
    Ok(())
}

#[tokio::test]
async fn invalid_config_propagates_and_leaves_slot_empty() -> anyhow::Result<()> {
    let config = AuthConfig::builder("tenant", "client-1").enabled(true).build()?;
    let auth = AuthMiddleware::new(config);

    crate::assert_err_contains!(auth.provider().await.map(|_| ()), "client_secret is required");
    assert!(!auth.is_initialized().await);
    assert!(!auth.authenticate_server().await);
    assert_eq!(auth.get_valid_token().await, None);
    assert_eq!(auth.bearer_token(None).await, Err(AuthUnavailable::NoToken));
    Ok(())
}

#[tokio::test]
async fn authenticate_then_serve_tokens() -> anyhow::Result<()> {
    let idp = MockIdp::start(vec![(200, token_body("app-token", None, 3600))], vec![]).await;
    let auth = AuthMiddleware::new(idp.config(AuthMode::Application));

    assert!(auth.authenticate_server().await);
    assert_eq!(auth.get_valid_token().await.as_deref(), Some("app-token"));
    assert_eq!(auth.bearer_token(Some(Duration::from_secs(5))).await.as_deref(), Ok("app-token"));
    assert_eq!(idp.token_calls(), 1);

    let status = auth.status().await;
    assert!(status.authenticated);
    assert_eq!(status.mode, Some(AuthMode::Application));
    assert_eq!(status.message, "Authenticated");

    auth.clear_auth().await;
    assert!(!auth.status().await.authenticated);
    Ok(())
}

#[tokio::test]
async fn failed_server_authentication_returns_false() -> anyhow::Result<()> {
    let idp = MockIdp::start(vec![(401, error_body("invalid_client"))], vec![]).await;
    let auth = AuthMiddleware::new(idp.config(AuthMode::Application));

    assert!(!auth.authenticate_server().await);
    assert_eq!(auth.bearer_token(None).await, Err(AuthUnavailable::NoToken));
    assert_eq!(auth.status().await.message, "Not authenticated");
    Ok(())
}

#[tokio::test]
async fn device_flow_outlives_a_timed_out_caller() -> anyhow::Result<()> {
    let idp = MockIdp::start(
        vec![(400, error_body("authorization_pending")), (200, token_body("signed-in", None, 3600))],
        vec![(200, device_reply())],
    )
    .await;
    let auth = AuthMiddleware::new(idp.config(AuthMode::Delegated));

    let result = auth.bearer_token(Some(Duration::from_millis(300))).await;
    assert_eq!(result, Err(AuthUnavailable::TimedOut(Duration::from_millis(300))));

    // The user finishes signing in while nobody is waiting.
    let provider = auth.provider().await?;
    let mut stored = None;
    for _ in 0..100 {
        stored = provider.store().access_token().await;
        if stored.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(stored.as_deref(), Some("signed-in"));

    let again = auth.bearer_token(Some(Duration::from_millis(300))).await;
    assert_eq!(again.as_deref(), Ok("signed-in"));
    assert_eq!(idp.device_calls(), 1);
    assert_eq!(idp.token_calls(), 2);
    Ok(())
}

#[tokio::test]
async fn callers_queue_behind_a_pending_device_flow() -> anyhow::Result<()> {
    let idp = MockIdp::start(
        vec![(400, error_body("authorization_pending")), (200, token_body("signed-in", None, 3600))],
        vec![(200, device_reply())],
    )
    .await;
    let auth = AuthMiddleware::new(idp.config(AuthMode::Delegated));

    let short = auth.bearer_token(Some(Duration::from_millis(100))).await;
    assert_eq!(short, Err(AuthUnavailable::TimedOut(Duration::from_millis(100))));

    let patient = auth.bearer_token(Some(Duration::from_secs(10))).await;
    assert_eq!(patient.as_deref(), Ok("signed-in"));
    assert_eq!(idp.device_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn events_follow_provider_rebuilds() -> anyhow::Result<()> {
    let idp = MockIdp::start(vec![(200, token_body("app-token", None, 3600))], vec![]).await;
    let auth = AuthMiddleware::new(idp.config(AuthMode::Application));
    let mut events = auth.subscribe();

    auth.provider().await?;
    auth.reset().await;
    assert!(auth.authenticate_server().await);

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv()).await??;
    assert_eq!(event, AuthEvent::TokenAcquired { mode: AuthMode::Application });
    Ok(())
}

#[test]
fn unavailable_messages_guide_the_user() {
    assert!(AuthUnavailable::Disabled.to_string().contains("Enable ENTRA authentication"));
    assert!(AuthUnavailable::NoToken.to_string().contains("try again"));
    assert!(AuthUnavailable::TimedOut(Duration::from_secs(10)).to_string().contains("after 10s"));
}
