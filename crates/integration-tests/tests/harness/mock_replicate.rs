//! Mock Replicate backend for integration tests
//!
//! Serves the prediction and account endpoints plus the audio files the
//! predictions point at. Audio responses can be held behind a gate so a
//! test can observe the service before a background download finishes.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde_json::{Value, json};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::config::TEST_TOKEN;

/// Bytes served for every audio file
pub const AUDIO_BYTES: &[u8] = b"ID3\x04\x00mock-audio-payload";

/// How predictions resolve
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Succeeded on the create call (`Prefer: wait` satisfied)
    Immediate,
    /// Reported as processing for this many polls, then succeeded
    AfterPolls(u32),
    /// Never leaves `processing`
    Stuck,
    /// Failed with the given remote error
    Fail(String),
}

/// Mock Replicate server
pub struct MockReplicate {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    addr: SocketAddr,
    outcome: Outcome,
    account_ok: bool,
    predictions: Mutex<Vec<Value>>,
    polls: AtomicU32,
    audio_requests: AtomicU32,
    gate: watch::Sender<bool>,
}

impl MockReplicate {
    /// Start a mock whose predictions succeed immediately
    pub async fn start() -> anyhow::Result<Self> {
        Self::builder().start().await
    }

    pub fn builder() -> MockBuilder {
        MockBuilder {
            outcome: Outcome::Immediate,
            account_ok: true,
            gated: false,
        }
    }

    /// Base URL for configuring the mock as the remote API
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Prediction bodies received so far
    pub fn predictions(&self) -> Vec<Value> {
        self.state.predictions.lock().unwrap().clone()
    }

    /// Number of status polls received
    pub fn poll_count(&self) -> u32 {
        self.state.polls.load(Ordering::Relaxed)
    }

    /// Number of audio downloads started
    pub fn audio_requests(&self) -> u32 {
        self.state.audio_requests.load(Ordering::Relaxed)
    }

    /// Let held audio responses complete
    pub fn open_gate(&self) {
        self.state.gate.send_replace(true);
    }
}

impl Drop for MockReplicate {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

pub struct MockBuilder {
    outcome: Outcome,
    account_ok: bool,
    gated: bool,
}

impl MockBuilder {
    pub fn outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Make `GET /v1/account` reject the token
    pub fn account_unauthorized(mut self) -> Self {
        self.account_ok = false;
        self
    }

    /// Hold audio responses until [`MockReplicate::open_gate`]
    pub fn gated(mut self) -> Self {
        self.gated = true;
        self
    }

    pub async fn start(self) -> anyhow::Result<MockReplicate> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (gate, _) = watch::channel(!self.gated);
        let state = Arc::new(MockState {
            addr,
            outcome: self.outcome,
            account_ok: self.account_ok,
            predictions: Mutex::new(Vec::new()),
            polls: AtomicU32::new(0),
            audio_requests: AtomicU32::new(0),
            gate,
        });

        let app = Router::new()
            .route("/v1/predictions", routing::post(create_prediction))
            .route("/v1/predictions/{id}", routing::get(get_prediction))
            .route("/v1/account", routing::get(account))
            .route("/audio/{name}", routing::get(audio))
            .with_state(Arc::clone(&state));

        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(MockReplicate { addr, shutdown, state })
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == format!("Bearer {TEST_TOKEN}"))
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid token."}))).into_response()
}

fn prediction(state: &MockState, id: &str, status: &str) -> Value {
    let mut body = json!({
        "id": id,
        "status": status,
        "urls": {"get": format!("http://{}/v1/predictions/{id}", state.addr)},
    });

    match (status, &state.outcome) {
        ("succeeded", _) => {
            body["output"] = json!(format!("http://{}/audio/{id}.mp3", state.addr));
            body["metrics"] = json!({"predict_time": 4.25});
        }
        ("failed", Outcome::Fail(message)) => body["error"] = json!(message),
        _ => {}
    }

    body
}

async fn create_prediction(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }

    let id = {
        let mut predictions = state.predictions.lock().unwrap();
        predictions.push(body);
        format!("pred{}", predictions.len())
    };

    let status = match &state.outcome {
        Outcome::Immediate => "succeeded",
        Outcome::Fail(_) => "failed",
        Outcome::AfterPolls(_) | Outcome::Stuck => "starting",
    };

    (StatusCode::CREATED, Json(prediction(&state, &id, status))).into_response()
}

async fn get_prediction(State(state): State<Arc<MockState>>, Path(id): Path<String>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }

    let polls = state.polls.fetch_add(1, Ordering::Relaxed) + 1;

    let status = match &state.outcome {
        Outcome::AfterPolls(n) if polls >= *n => "succeeded",
        Outcome::Immediate => "succeeded",
        Outcome::Fail(_) => "failed",
        Outcome::AfterPolls(_) | Outcome::Stuck => "processing",
    };

    Json(prediction(&state, &id, status)).into_response()
}

async fn account(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !state.account_ok || !authorized(&headers) {
        return unauthorized();
    }

    Json(json!({"type": "user", "username": "resona-tests", "name": "Resona Tests"})).into_response()
}

async fn audio(State(state): State<Arc<MockState>>, Path(_name): Path<String>) -> Response {
    state.audio_requests.fetch_add(1, Ordering::Relaxed);

    let mut gate = state.gate.subscribe();
    if gate.wait_for(|open| *open).await.is_err() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    ([(header::CONTENT_TYPE, "audio/mpeg")], AUDIO_BYTES).into_response()
}
