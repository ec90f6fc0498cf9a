//! Local HTTP origin for exercising `HttpStrategy`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;

#[derive(Clone, Default)]
pub struct OriginState {
    pub requests: Arc<AtomicUsize>,
    pub flaky_failures: Arc<AtomicUsize>,
}

impl OriginState {
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

pub struct TestOrigin {
    pub addr: SocketAddr,
    pub state: OriginState,
}

impl TestOrigin {
    /// URL template for `HttpStrategy`.
    pub fn template(&self, route: &str) -> String {
        format!("http://{}/{}/{{key}}", self.addr, route)
    }
}

/// Serves:
/// - `/items/{key}`: 200 with a body derived from the key, or the status the
///   key names (`gone`, `forbidden`, `limited`, `broken`, `empty`)
/// - `/flaky/{key}`: 503 for the first two requests, then 200
pub async fn spawn_origin() -> TestOrigin {
    let state = OriginState::default();
    let app = Router::new()
        .route("/items/{key}", get(item))
        .route("/flaky/{key}", get(flaky))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind origin");
    let addr = listener.local_addr().expect("origin addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("origin server");
    });

    TestOrigin { addr, state }
}

async fn item(State(state): State<OriginState>, Path(key): Path<String>) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    match key.as_str() {
        "gone" => StatusCode::NOT_FOUND.into_response(),
        "forbidden" => StatusCode::FORBIDDEN.into_response(),
        "limited" => (StatusCode::TOO_MANY_REQUESTS, [(header::RETRY_AFTER, "7")]).into_response(),
        "broken" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "empty" => (StatusCode::OK, "").into_response(),
        _ => format!("payload for {key}").into_response(),
    }
}

async fn flaky(State(state): State<OriginState>, Path(key): Path<String>) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    if state.flaky_failures.fetch_add(1, Ordering::SeqCst) < 2 {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    format!("recovered {key}").into_response()
}
