//! Authorizer endpoint.
//!
//! `POST /v1/authorize` takes the gateway's authorizer event as JSON and
//! answers with the encoded policy. Every body yields exactly one policy: an
//! unreadable event is decided as an empty request, so the kill switch still
//! applies and otherwise the missing identity denies it.

use axum::{extract::State, response::{IntoResponse, Response}, Json};

use authgate_core::protocol::policy;
use authgate_core::request::{parse_event, RequestContext};

use crate::app_state::AppState;

pub async fn authorize(State(app): State<AppState>, body: String) -> Response {
    let req = parse_event(&body).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "unreadable authorizer event; deciding on an empty request");
        RequestContext::default()
    });
    let verdict = app.engine().decide(&req).await;

    tracing::debug!(
        host = req.headers().get("host").unwrap_or("-"),
        path = req.path().unwrap_or("-"),
        user_agent = req.user_agent().unwrap_or("-"),
        resource = %req.resource(),
        effect = verdict.effect.as_str(),
        "authorize"
    );

    Json(policy::encode(&verdict, req.resource())).into_response()
}
