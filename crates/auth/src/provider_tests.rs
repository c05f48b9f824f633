// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use serde_json::json;

use super::*;
use crate::test_support::{error_body, token_body, MockIdp};

fn device_reply() -> serde_json::Value {
    json!({
        "device_code": "dev-1",
        "user_code": "WXYZ-1234",
        "verification_uri": "https://microsoft.com/devicelogin",
        "expires_in": 60,
        "interval": 1,
    })
}

fn drain(rx: &mut broadcast::Receiver<AuthEvent>) -> Vec<AuthEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

#[tokio::test]
async fn disabled_provider_never_calls_out() -> anyhow::Result<()> {
    let idp = MockIdp::start(vec![(200, token_body("x", None, 3600))], vec![]).await;
    let config = AuthConfig::builder("tenant", "client-1").authority(idp.authority()).build()?;
    let provider = AuthProvider::new(config).await?;

    assert_eq!(provider.get_access_token(false).await, None);
    assert_eq!(provider.get_access_token(true).await, None);
    assert_eq!(idp.token_calls(), 0);
    assert!(!provider.status().await.enabled);
    Ok(())
}

#[tokio::test]
async fn construction_rejects_invalid_config() -> anyhow::Result<()> {
    let config = AuthConfig::builder("tenant", "client-1").enabled(true).build()?;
    let result = AuthProvider::new(config).await;
    assert!(matches!(result, Err(InitError::Config(ConfigError::MissingClientSecret))));
    Ok(())
}

#[tokio::test]
async fn application_token_is_cached() -> anyhow::Result<()> {
    let idp = MockIdp::start(vec![(200, token_body("app-token", None, 3600))], vec![]).await;
    let provider = AuthProvider::new(idp.config(AuthMode::Application)).await?;
    let mut events = provider.subscribe();

    assert_eq!(provider.get_access_token(false).await.as_deref(), Some("app-token"));
    assert_eq!(provider.get_access_token(false).await.as_deref(), Some("app-token"));
    assert_eq!(idp.token_calls(), 1);

    let status = provider.status().await;
    assert!(status.authenticated);
    assert!(!status.token.has_refresh_token);
    assert_eq!(drain(&mut events), vec![AuthEvent::TokenAcquired { mode: AuthMode::Application }]);
    Ok(())
}

#[tokio::test]
async fn force_refresh_bypasses_cache() -> anyhow::Result<()> {
    let idp = MockIdp::start(
        vec![(200, token_body("first", None, 3600)), (200, token_body("second", None, 3600))],
        vec![],
    )
    .await;
    let provider = AuthProvider::new(idp.config(AuthMode::Application)).await?;

    assert_eq!(provider.get_access_token(false).await.as_deref(), Some("first"));
    assert_eq!(provider.get_access_token(true).await.as_deref(), Some("second"));
    assert_eq!(idp.token_calls(), 2);
    Ok(())
}

#[tokio::test]
async fn concurrent_misses_share_one_grant() -> anyhow::Result<()> {
    let idp = MockIdp::start(vec![(200, token_body("shared", None, 3600))], vec![]).await;
    let provider = Arc::new(AuthProvider::new(idp.config(AuthMode::Application)).await?);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.get_access_token(false).await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await?.as_deref(), Some("shared"));
    }
    assert_eq!(idp.token_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn failed_acquisition_yields_none() -> anyhow::Result<()> {
    let idp = MockIdp::start(vec![(401, error_body("invalid_client"))], vec![]).await;
    let provider = AuthProvider::new(idp.config(AuthMode::Application)).await?;
    let mut events = provider.subscribe();

    assert_eq!(provider.get_access_token(false).await, None);
    assert!(!provider.status().await.token.has_access_token);
    assert!(matches!(drain(&mut events).as_slice(), [AuthEvent::AcquireFailed { .. }]));
    Ok(())
}

#[tokio::test]
async fn failed_forced_acquisition_keeps_cached_token() -> anyhow::Result<()> {
    let idp = MockIdp::start(vec![(400, error_body("invalid_scope"))], vec![]).await;
    let provider = AuthProvider::new(idp.config(AuthMode::Application)).await?;
    provider.store().store("held".into(), None, 3600).await;

    assert_eq!(provider.get_access_token(true).await, None);
    assert_eq!(idp.token_calls(), 1);
    assert_eq!(provider.store().access_token().await.as_deref(), Some("held"));
    let status = provider.status().await;
    assert!(status.token.has_access_token);
    assert!(status.authenticated);
    Ok(())
}

#[tokio::test]
async fn refresh_keeps_old_refresh_token_when_omitted() -> anyhow::Result<()> {
    let idp = MockIdp::start(vec![(200, token_body("refreshed", None, 3600))], vec![]).await;
    let provider = AuthProvider::new(idp.config(AuthMode::Delegated)).await?;
    // Inside the expiry buffer, so the cached token is not served.
    provider.store().store("stale".into(), Some("rt-1".into()), 60).await;

    assert_eq!(provider.get_access_token(false).await.as_deref(), Some("refreshed"));
    assert_eq!(provider.store().refresh_token().await.as_deref(), Some("rt-1"));
    assert!(idp.token_forms()[0].contains("grant_type=refresh_token"));
    assert_eq!(idp.device_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn refresh_rotates_refresh_token() -> anyhow::Result<()> {
    let idp =
        MockIdp::start(vec![(200, token_body("refreshed", Some("rt-2"), 3600))], vec![]).await;
    let provider = AuthProvider::new(idp.config(AuthMode::Delegated)).await?;
    provider.store().store("stale".into(), Some("rt-1".into()), 0).await;

    assert_eq!(provider.get_access_token(false).await.as_deref(), Some("refreshed"));
    assert_eq!(provider.store().refresh_token().await.as_deref(), Some("rt-2"));
    Ok(())
}

#[tokio::test]
async fn refresh_failure_clears_then_runs_device_flow() -> anyhow::Result<()> {
    let idp = MockIdp::start(
        vec![
            (400, error_body("invalid_grant")),
            (200, token_body("user-token", Some("rt-new"), 3600)),
        ],
        vec![(200, device_reply())],
    )
    .await;
    let provider = AuthProvider::new(idp.config(AuthMode::Delegated)).await?;
    provider.store().store("stale".into(), Some("rt-old".into()), 0).await;
    let mut events = provider.subscribe();

    assert_eq!(provider.get_access_token(false).await.as_deref(), Some("user-token"));
    assert_eq!(provider.store().refresh_token().await.as_deref(), Some("rt-new"));
    assert_eq!(idp.device_calls(), 1);

    let events = drain(&mut events);
    assert!(matches!(events.first(), Some(AuthEvent::RefreshFailed { .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        AuthEvent::DeviceCodeIssued { user_code, .. } if user_code == "WXYZ-1234"
    )));
    assert_eq!(events.last(), Some(&AuthEvent::TokenAcquired { mode: AuthMode::Delegated }));
    Ok(())
}

#[tokio::test]
async fn refresh_failure_with_no_fallback_leaves_nothing() -> anyhow::Result<()> {
    let idp = MockIdp::start(
        vec![(400, error_body("invalid_grant"))],
        vec![(400, error_body("invalid_client"))],
    )
    .await;
    let provider = AuthProvider::new(idp.config(AuthMode::Delegated)).await?;
    provider.store().store("stale".into(), Some("rt-old".into()), 0).await;

    assert_eq!(provider.get_access_token(false).await, None);
    let status = provider.status().await;
    assert!(!status.token.has_access_token);
    assert!(!status.token.has_refresh_token);
    Ok(())
}

#[tokio::test]
async fn clear_cache_forgets_everything() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tokens.json");
    let idp = MockIdp::start(vec![(200, token_body("app-token", None, 3600))], vec![]).await;
    let config = AuthConfig::builder("tenant", "client-1")
        .client_secret("s3cret")
        .authority(idp.authority())
        .enabled(true)
        .cache_path(&path)
        .build()?;
    let provider = AuthProvider::new(config).await?;
    let mut events = provider.subscribe();

    provider.get_access_token(false).await;
    assert!(path.exists());
    assert!(provider.status().await.token.cache_enabled);

    provider.clear_cache().await;
    assert!(!path.exists());
    assert!(!provider.status().await.authenticated);
    assert_eq!(drain(&mut events).last(), Some(&AuthEvent::Cleared));
    Ok(())
}

#[tokio::test]
async fn cached_file_serves_a_new_provider() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tokens.json");
    let idp = MockIdp::start(vec![(200, token_body("persisted", None, 3600))], vec![]).await;
    let build = || {
        AuthConfig::builder("tenant", "client-1")
            .client_secret("s3cret")
            .authority(idp.authority())
            .enabled(true)
            .cache_path(&path)
            .build()
    };

    let first = AuthProvider::new(build()?).await?;
    first.get_access_token(false).await;
    drop(first);

    let second = AuthProvider::new(build()?).await?;
    assert_eq!(second.get_access_token(false).await.as_deref(), Some("persisted"));
    assert_eq!(idp.token_calls(), 1);
    Ok(())
}
