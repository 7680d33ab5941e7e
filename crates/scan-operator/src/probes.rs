//! Liveness and readiness endpoints.
//!
//! `build_router` is the single entry point; `main.rs` attaches the trace
//! layer so tests can drive the bare router.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::state::OperatorState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
}

pub fn build_router(state: Arc<OperatorState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .with_state(state)
}

fn body(st: &OperatorState, ok: bool) -> Json<ProbeResponse> {
    Json(ProbeResponse {
        ok,
        service: st.build.service.to_string(),
        version: st.build.version.to_string(),
    })
}

// GET /healthz: the process is up and serving.
pub(crate) async fn healthz(State(st): State<Arc<OperatorState>>) -> impl IntoResponse {
    (StatusCode::OK, body(&st, true))
}

// GET /readyz: 503 until the controller is running.
pub(crate) async fn readyz(State(st): State<Arc<OperatorState>>) -> impl IntoResponse {
    if st.is_ready() {
        (StatusCode::OK, body(&st, true))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, body(&st, false))
    }
}
