//! Operator surface of the authorizer.
//!
//! - `GET /healthz` : liveness, independent of the counter store
//! - `GET /metrics` : decision counters and latency, plus the current kill
//!   switch position, in Prometheus text format
//! - [`signals`] : flipping the kill switch on a running process

pub mod signals;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::app_state::AppState;

const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn metrics(State(app): State<AppState>) -> Response {
    let body = app.metrics().render(&app.metrics_extra());
    (StatusCode::OK, [(header::CONTENT_TYPE, PROMETHEUS_TEXT)], body).into_response()
}
