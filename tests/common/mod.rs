// Shared fixtures for the integration tests: an in-process stand-in for the platform API
// bound to an ephemeral localhost port, plus token minting helpers.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use donor_link::config::ClientConfig;
use donor_link::{SessionManager, TokenPair};

pub const LOGIN: &str = "login";
pub const REGISTER: &str = "register";
pub const LOGOUT: &str = "logout";
pub const REFRESH: &str = "refresh";
pub const INTENT: &str = "intent";
pub const CONFIRM: &str = "confirm";
pub const CANCEL: &str = "cancel";

#[derive(Clone, Debug)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

#[derive(Default)]
struct StubState {
    replies: HashMap<&'static str, Reply>,
    calls: HashMap<&'static str, usize>,
    bearers: HashMap<&'static str, Option<String>>,
    bodies: HashMap<&'static str, Value>,
    gates: HashMap<&'static str, Arc<Notify>>,
    cancelled_ids: Vec<String>,
}

type Shared = Arc<Mutex<StubState>>;

/// Stand-in API server. Every route answers with its configured `Reply` and records the
/// call; a route can be held open with `hold` until the test releases it.
pub struct Stub {
    pub url: String,
    state: Shared,
    handle: JoinHandle<()>,
}

impl Stub {
    pub async fn start() -> Stub {
        let state: Shared = Arc::new(Mutex::new(StubState::default()));
        {
            let mut s = state.lock();
            s.replies.insert(LOGIN, Reply { status: 200, body: tokens(&donor_token(3600), "rt1") });
            s.replies.insert(REGISTER, Reply { status: 201, body: tokens(&donor_token(3600), "rt1") });
            s.replies.insert(REFRESH, Reply { status: 200, body: tokens(&donor_token(3600), "rt2") });
            s.replies.insert(LOGOUT, Reply { status: 200, body: Value::Null });
            s.replies.insert(INTENT, Reply {
                status: 200,
                body: json!({
                    "paymentIntentId": "pi_1",
                    "amount": 5000.0,
                    "currency": "RWF",
                    "status": "PENDING",
                    "expiresAt": "2030-01-01T00:00:00Z"
                }),
            });
            s.replies.insert(CONFIRM, Reply { status: 200, body: json!({"donationId": 99}) });
            s.replies.insert(CANCEL, Reply { status: 200, body: Value::Null });
        }

        let app = Router::new()
            .route("/api/auth/login", post(|State(s): State<Shared>, h: HeaderMap, b: Bytes| respond(s, LOGIN, h, b)))
            .route("/api/auth/register", post(|State(s): State<Shared>, h: HeaderMap, b: Bytes| respond(s, REGISTER, h, b)))
            .route("/api/auth/logout", post(|State(s): State<Shared>, h: HeaderMap, b: Bytes| respond(s, LOGOUT, h, b)))
            .route("/api/auth/refresh-token", post(|State(s): State<Shared>, h: HeaderMap, b: Bytes| respond(s, REFRESH, h, b)))
            .route("/api/payments/intent", post(|State(s): State<Shared>, h: HeaderMap, b: Bytes| respond(s, INTENT, h, b)))
            .route("/api/payments/confirm", post(|State(s): State<Shared>, h: HeaderMap, b: Bytes| respond(s, CONFIRM, h, b)))
            .route(
                "/api/payments/cancel/{id}",
                post(|State(s): State<Shared>, Path(id): Path<String>, h: HeaderMap, b: Bytes| {
                    s.lock().cancelled_ids.push(id);
                    respond(s, CANCEL, h, b)
                }),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind 127.0.0.1:0");
        let addr = listener.local_addr().expect("local addr");
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("stub server error: {e:?}");
            }
        });
        Stub { url: format!("http://{}/", addr), state, handle }
    }

    pub fn reply(&self, route: &'static str, status: u16, body: Value) {
        self.state.lock().replies.insert(route, Reply { status, body });
    }

    pub fn calls(&self, route: &'static str) -> usize {
        self.state.lock().calls.get(route).copied().unwrap_or(0)
    }

    pub fn bearer(&self, route: &'static str) -> Option<String> {
        self.state.lock().bearers.get(route).cloned().flatten()
    }

    pub fn body(&self, route: &'static str) -> Value {
        self.state.lock().bodies.get(route).cloned().unwrap_or(Value::Null)
    }

    pub fn cancelled_ids(&self) -> Vec<String> { self.state.lock().cancelled_ids.clone() }

    /// Keep the next call(s) to `route` waiting until the returned gate is notified.
    pub fn hold(&self, route: &'static str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().gates.insert(route, gate.clone());
        gate
    }

    pub async fn wait_for_calls(&self, route: &'static str, n: usize) {
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while self.calls(route) < n {
            assert!(std::time::Instant::now() < deadline, "timed out waiting for {} call(s) to {}", n, route);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    pub fn config(&self) -> ClientConfig {
        let mut cfg = ClientConfig::with_base_url(self.url.clone());
        cfg.request_timeout_ms = 5_000;
        cfg
    }

    /// In-memory session pointed at this server.
    pub fn session(&self) -> SessionManager {
        SessionManager::from_config(&self.config()).expect("session manager")
    }
}

impl Drop for Stub {
    fn drop(&mut self) { self.handle.abort(); }
}

async fn respond(s: Shared, route: &'static str, headers: HeaderMap, body: Bytes) -> Response {
    let (reply, gate) = {
        let mut g = s.lock();
        *g.calls.entry(route).or_default() += 1;
        let bearer = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);
        g.bearers.insert(route, bearer);
        g.bodies.insert(route, serde_json::from_slice(&body).unwrap_or(Value::Null));
        let reply = g.replies.get(route).cloned().unwrap_or(Reply { status: 404, body: Value::Null });
        (reply, g.gates.get(route).cloned())
    };
    if let Some(gate) = gate {
        gate.notified().await;
    }
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match reply.body {
        Value::Null => status.into_response(),
        Value::String(text) => (status, text).into_response(),
        other => (status, Json(other)).into_response(),
    }
}

/// A base URL nothing listens on.
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind 127.0.0.1:0");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}/", port)
}

pub fn unreachable_config() -> ClientConfig {
    let mut cfg = ClientConfig::with_base_url(unreachable_url());
    cfg.connect_timeout_ms = 2_000;
    cfg.request_timeout_ms = 2_000;
    cfg
}

/// Unsigned JWT-shaped token carrying `claims`.
pub fn jwt(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    format!("{}.{}.c2lnbmF0dXJl", header, payload)
}

/// Access token for a@b.com expiring `ttl_secs` from now (negative for already expired).
pub fn access_token(authorities: &[&str], ttl_secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    jwt(&json!({
        "sub": "a@b.com",
        "iat": now,
        "exp": now + ttl_secs,
        "authorities": authorities,
        "firstName": "Ada",
        "lastName": "Lovelace",
        "userId": 17
    }))
}

pub fn donor_token(ttl_secs: i64) -> String { access_token(&["ROLE_DONOR"], ttl_secs) }

pub fn tokens(access: &str, refresh: &str) -> Value {
    json!({"access_token": access, "refresh_token": refresh})
}

/// Put `session` into a signed-in state without going through login.
pub fn seed(session: &SessionManager, access: &str, refresh: &str) {
    session.store().set(&TokenPair::new(access, refresh));
}
