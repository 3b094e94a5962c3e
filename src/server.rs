//! HTTP control surface for a running recorder.
//!
//! Exposes the session controls to local tooling:
//! - `GET /health`
//! - `GET /session` current id, state and tick
//! - `PUT /session` replace the session id (Idle only)
//! - `POST /start`, `POST /stop`
//!
//! # Architecture
//!
//! ```text
//! operator ──→ PUT /session, POST /start ──→ SessionControl ──→ Recorder
//! ```

use crate::session::{SessionControl, SessionError, SessionStatus};
use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to on 127.0.0.1 (0 for random)
    pub port: u16,
}

impl ServerConfig {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

type SharedControl = Arc<dyn SessionControl>;

/// Body of `PUT /session`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetSessionRequest {
    pub session_id: String,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn session_error(e: SessionError) -> ApiError {
    let (status, code) = match e {
        SessionError::Busy => (StatusCode::CONFLICT, "SESSION_BUSY"),
        SessionError::AlreadyRecording => (StatusCode::CONFLICT, "ALREADY_RECORDING"),
        SessionError::InvalidId(_) => (StatusCode::BAD_REQUEST, "INVALID_SESSION_ID"),
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
            code: code.to_string(),
        }),
    )
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /session
async fn get_session(State(control): State<SharedControl>) -> Json<SessionStatus> {
    Json(control.status())
}

/// PUT /session
async fn put_session(
    State(control): State<SharedControl>,
    Json(request): Json<SetSessionRequest>,
) -> Result<Json<SessionStatus>, ApiError> {
    control
        .set_session_id(&request.session_id)
        .map_err(session_error)?;
    Ok(Json(control.status()))
}

/// POST /start
async fn start(State(control): State<SharedControl>) -> Result<Json<SessionStatus>, ApiError> {
    control.start().map_err(session_error)?;
    Ok(Json(control.status()))
}

/// POST /stop
async fn stop(State(control): State<SharedControl>) -> Json<SessionStatus> {
    control.stop();
    Json(control.status())
}

/// Build the control router.
pub fn router(control: SharedControl) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/session", get(get_session).put(put_session))
        .route("/start", post(start))
        .route("/stop", post(stop))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(control)
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
    control: SharedControl,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = router(control);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Control server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
