// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: a scriptable identity provider and assertion helpers.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;

use crate::config::{AuthConfig, AuthMode};

/// Assert that a `Result` is `Err` and its display string contains a substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}

/// Scripted reply queue for one endpoint. The last reply repeats once the queue drains.
#[derive(Default)]
struct Script {
    replies: Mutex<VecDeque<(u16, String)>>,
    last: Mutex<Option<(u16, String)>>,
    calls: AtomicU32,
    forms: Mutex<Vec<String>>,
}

impl Script {
    fn new(replies: Vec<(u16, serde_json::Value)>) -> Arc<Self> {
        let script = Self::default();
        *script.replies.lock() = replies.into_iter().map(|(s, v)| (s, v.to_string())).collect();
        Arc::new(script)
    }

    fn next(&self, form: String) -> (StatusCode, String) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.forms.lock().push(form);
        let reply = match self.replies.lock().pop_front() {
            Some(reply) => {
                *self.last.lock() = Some(reply.clone());
                reply
            }
            None => self.last.lock().clone().unwrap_or((500, "{}".to_owned())),
        };
        (StatusCode::from_u16(reply.0).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), reply.1)
    }
}

/// Mock Entra ID tenant serving `/{tenant}/oauth2/v2.0/{token,devicecode}`.
pub struct MockIdp {
    pub addr: SocketAddr,
    token: Arc<Script>,
    device: Arc<Script>,
}

impl MockIdp {
    pub async fn start(
        token_replies: Vec<(u16, serde_json::Value)>,
        device_replies: Vec<(u16, serde_json::Value)>,
    ) -> Self {
        let token = Script::new(token_replies);
        let device = Script::new(device_replies);

        let app = Router::new()
            .route(
                "/tenant/oauth2/v2.0/token",
                post(|State(s): State<Arc<Script>>, body: String| async move { s.next(body) })
                    .with_state(Arc::clone(&token)),
            )
            .route(
                "/tenant/oauth2/v2.0/devicecode",
                post(|State(s): State<Arc<Script>>, body: String| async move { s.next(body) })
                    .with_state(Arc::clone(&device)),
            );

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self { addr, token, device }
    }

    pub fn authority(&self) -> String {
        format!("http://{}/tenant", self.addr)
    }

    pub fn token_calls(&self) -> u32 {
        self.token.calls.load(Ordering::SeqCst)
    }

    pub fn device_calls(&self) -> u32 {
        self.device.calls.load(Ordering::SeqCst)
    }

    /// Raw form bodies posted to the token endpoint, oldest first.
    pub fn token_forms(&self) -> Vec<String> {
        self.token.forms.lock().clone()
    }

    /// An enabled config pointed at this mock.
    pub fn config(&self, mode: AuthMode) -> AuthConfig {
        AuthConfig::builder("tenant", "client-1")
            .client_secret("s3cret")
            .authority(self.authority())
            .enabled(true)
            .mode(mode)
            .build()
            .expect("valid config")
    }
}

pub fn token_body(access: &str, refresh: Option<&str>, expires_in: u64) -> serde_json::Value {
    let mut body = serde_json::json!({
        "access_token": access,
        "token_type": "Bearer",
        "expires_in": expires_in,
    });
    if let Some(refresh) = refresh {
        body["refresh_token"] = serde_json::Value::from(refresh);
    }
    body
}

pub fn error_body(error: &str) -> serde_json::Value {
    serde_json::json!({ "error": error, "error_description": format!("{error} (test)") })
}
