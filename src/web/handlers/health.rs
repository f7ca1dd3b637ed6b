use axum::{extract::State, response::Response};
use serde::Serialize;

use crate::session::SessionState;
use crate::web::{responses::ok, AppState};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub session: SessionState,
}

pub async fn health_check(State(state): State<AppState>) -> Response {
    let session = state.service.with_session(|s| s.state()).await;
    ok(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        session,
    })
}
