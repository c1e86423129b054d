// In-process stand-in for the Famly API, used by async tests

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::famly::{Credentials, FamlyClient, Session};

pub const TEST_EMAIL: &str = "parent@example.com";
pub const TEST_PASSWORD: &str = "hunter2";
const TEST_DEVICE_ID: &str = "8858035b-b514-4a7e-b2e1-5e73059425ae";

/// Behaviour and call counters for the fake server
#[derive(Clone, Default)]
pub struct FakeFamly {
    /// Calendar payload per child id; unknown children get 404
    pub calendars: HashMap<String, Value>,
    /// Sidebar payload
    pub sidebar: Value,
    /// Logins accepted before the server starts rejecting credentials
    pub accepted_logins: Option<usize>,
    /// Number of initial calendar calls answered with 401
    pub expired_calendar_calls: usize,
    /// Answer every login with 500
    pub login_server_error: bool,
    pub logins: Arc<AtomicUsize>,
    pub calendar_calls: Arc<AtomicUsize>,
    pub last_calendar_query: Arc<Mutex<Option<HashMap<String, String>>>>,
}

impl FakeFamly {
    pub fn with_calendar(mut self, child_id: &str, payload: Value) -> Self {
        self.calendars.insert(child_id.to_string(), payload);
        self
    }

    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn calendar_count(&self) -> usize {
        self.calendar_calls.load(Ordering::SeqCst)
    }

    /// Start serving on a random loopback port, returning the base URL
    pub async fn spawn(self) -> String {
        let app = Router::new()
            .route("/graphql", post(login))
            .route("/api/v2/sidebar", get(sidebar))
            .route("/api/v2/calendar", get(calendar))
            .with_state(self);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}", addr)
    }
}

/// Session pointed at a fake server
pub fn session(base_url: &str) -> Session {
    Session::new(
        FamlyClient::new(base_url, TEST_DEVICE_ID).unwrap(),
        Credentials {
            email: TEST_EMAIL.to_string(),
            password: TEST_PASSWORD.to_string(),
        },
    )
}

fn has_token(headers: &HeaderMap) -> bool {
    headers
        .get("x-famly-accesstoken")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("token-"))
        .unwrap_or(false)
}

async fn login(State(fake): State<FakeFamly>, Json(body): Json<Value>) -> Response {
    let attempt = fake.logins.fetch_add(1, Ordering::SeqCst) + 1;
    if fake.login_server_error {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let variables = &body["variables"];

    let credentials_ok =
        variables["email"] == TEST_EMAIL && variables["password"] == TEST_PASSWORD;
    let accepted = fake.accepted_logins.map(|max| attempt <= max).unwrap_or(true);

    let result = if credentials_ok && accepted && variables["deviceId"].is_string() {
        json!({ "__typename": "AuthenticationSucceeded", "accessToken": format!("token-{}", attempt) })
    } else {
        json!({ "__typename": "AuthenticationFailed", "errorTitle": "Wrong email or password" })
    };

    Json(json!({ "data": { "me": { "authenticateWithPassword": result } } })).into_response()
}

async fn sidebar(State(fake): State<FakeFamly>, headers: HeaderMap) -> Response {
    if !has_token(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(fake.sidebar.clone()).into_response()
}

async fn calendar(
    State(fake): State<FakeFamly>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let call = fake.calendar_calls.fetch_add(1, Ordering::SeqCst) + 1;
    *fake.last_calendar_query.lock().unwrap() = Some(query.clone());

    if !has_token(&headers) || call <= fake.expired_calendar_calls {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let child_id = query.get("childId").cloned().unwrap_or_default();
    match fake.calendars.get(&child_id) {
        Some(payload) => Json(payload.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
