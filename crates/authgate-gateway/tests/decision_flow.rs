//! End-to-end decision pipeline tests against instrumented collaborators.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use authgate_core::protocol::policy::{self, ContextValue};
use authgate_core::verdict::Effect;
use authgate_gateway::app_state::AppState;
use authgate_gateway::auth::JwtVerifier;
use authgate_gateway::limiter::CounterStore;
use authgate_gateway::policy::{DecisionReason, RATE_LIMIT_MESSAGE};

use fixtures::{cfg, expired, mint, request, CountingStore, StuckStore, OVERRIDE_SECRET, USER_SECRET};

fn state_with(extra: &[(&str, &str)], store: Arc<dyn CounterStore>) -> AppState {
    AppState::with_collaborators(cfg(extra), store, Arc::new(JwtVerifier::new())).unwrap()
}

#[tokio::test]
async fn kill_switch_allows_anything() {
    let store = CountingStore::new();
    let app = state_with(&[("AUTHGATE_KILL_SWITCH", "1")], store.clone());

    // no identity, garbage tokens
    let req = request(&[("authorization", "Bearer ###"), ("x-override-token", "%%%")], None);
    let d = app.engine().evaluate(&req).await;
    assert_eq!(d.reason, DecisionReason::KillSwitch);
    assert!(d.verdict.is_allow());
    assert!(d.verdict.context.is_none());
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn kill_switch_can_be_flipped_at_runtime() {
    let store = CountingStore::new();
    let app = state_with(&[], store.clone());
    let req = request(&[], None);

    assert_eq!(app.engine().evaluate(&req).await.verdict.effect, Effect::Deny);
    app.engine().kill_switch().engage();
    assert_eq!(app.engine().evaluate(&req).await.verdict.effect, Effect::Allow);
    app.engine().kill_switch().release();
    assert_eq!(app.engine().evaluate(&req).await.verdict.effect, Effect::Deny);
}

#[tokio::test]
async fn override_token_bypasses_rate_limit() {
    let store = CountingStore::new();
    let app = state_with(&[("AUTHGATE_STANDARD_POINTS", "1")], store.clone());

    // exhaust the standard bucket first
    let plain = request(&[], Some("10.1.1.1"));
    app.engine().evaluate(&plain).await;
    assert_eq!(app.engine().evaluate(&plain).await.reason, DecisionReason::RateLimited);
    let calls_before = store.calls();

    let token = mint(OVERRIDE_SECRET, "deploy-bot", &[]);
    let req = request(&[("X-Override-Token", token.as_str())], Some("10.1.1.1"));
    for _ in 0..5 {
        let d = app.engine().evaluate(&req).await;
        assert_eq!(d.reason, DecisionReason::Override);
        assert!(d.verdict.is_allow());
        assert!(d.verdict.context.is_none());
    }
    assert_eq!(store.calls(), calls_before);
}

#[tokio::test]
async fn override_signed_with_user_secret_is_not_override() {
    let store = CountingStore::new();
    let app = state_with(&[], store.clone());

    let forged = mint(USER_SECRET, "mallory", &["admin"]);
    let req = request(&[("x-override-token", forged.as_str())], Some("10.1.1.2"));
    let d = app.engine().evaluate(&req).await;
    assert_eq!(d.reason, DecisionReason::WithinBudget);
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn missing_identity_denies_without_context() {
    let store = CountingStore::new();
    let app = state_with(&[], store.clone());

    let token = mint(USER_SECRET, "alice", &[]);
    let auth = format!("Bearer {token}");
    let req = request(&[("authorization", auth.as_str()), ("x-real-ip", "  ")], None);
    let d = app.engine().evaluate(&req).await;
    assert_eq!(d.reason, DecisionReason::NoIdentity);
    assert_eq!(d.verdict.effect, Effect::Deny);
    assert!(d.verdict.context.is_none());
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn nth_consume_within_budget_then_deny() {
    let app = state_with(&[], CountingStore::new());
    let req = request(&[("x-real-ip", "198.51.100.3")], Some("10.0.0.1"));

    for n in 1..=3u32 {
        let d = app.engine().evaluate(&req).await;
        assert!(d.verdict.is_allow(), "consume {n}");
        let ctx = d.verdict.context.expect("allow carries context");
        assert_eq!(ctx.consumed_points, n);
        assert_eq!(ctx.remaining_points, 3 - n);
        assert_eq!(ctx.identity, "198.51.100.3");
        assert_eq!(ctx.path.as_deref(), Some("/items"));
        assert_eq!(ctx.user_agent.as_deref(), Some("itest/1.0"));
        assert!(ctx.error_message.is_none());
        assert!(ctx.ms_before_next <= 60_000);
    }

    let d = app.engine().evaluate(&req).await;
    assert_eq!(d.reason, DecisionReason::RateLimited);
    assert_eq!(d.verdict.effect, Effect::Deny);
    let ctx = d.verdict.context.clone().expect("deny carries context");
    assert_eq!(ctx.remaining_points, 0);
    assert_eq!(ctx.consumed_points, 4);
    assert_eq!(ctx.error_message.as_deref(), Some(RATE_LIMIT_MESSAGE));

    let resp = policy::encode(&d.verdict, fixtures::RESOURCE);
    assert_eq!(
        resp.context_value("errorMessage"),
        Some(&ContextValue::String("\"Too many requests\"".into()))
    );
    assert_eq!(resp.principal_id, "198.51.100.3");
}

#[tokio::test]
async fn admin_and_standard_buckets_are_independent() {
    let app = state_with(&[], CountingStore::new());
    let admin = mint(USER_SECRET, "root", &["admin"]);
    let admin_auth = format!("Bearer {admin}");
    let admin_req = request(&[("authorization", admin_auth.as_str())], Some("10.2.2.2"));
    let anon_req = request(&[], Some("10.2.2.2"));

    // exhaust standard (budget 3)
    for _ in 0..3 {
        assert!(app.engine().evaluate(&anon_req).await.verdict.is_allow());
    }
    assert_eq!(app.engine().evaluate(&anon_req).await.reason, DecisionReason::RateLimited);

    // admin bucket untouched (budget 5)
    let d = app.engine().evaluate(&admin_req).await;
    let ctx = d.verdict.context.expect("context");
    assert_eq!(ctx.consumed_points, 1);
    assert_eq!(ctx.remaining_points, 4);
    assert_eq!(d.verdict.principal.as_deref(), Some("root"));

    // exhaust admin; standard still denied only by its own counter
    for _ in 0..4 {
        assert!(app.engine().evaluate(&admin_req).await.verdict.is_allow());
    }
    assert_eq!(app.engine().evaluate(&admin_req).await.reason, DecisionReason::RateLimited);
    let ctx = app.engine().evaluate(&anon_req).await.verdict.context.expect("context");
    assert_eq!(ctx.consumed_points, 5);
}

#[tokio::test]
async fn store_fault_fails_open_regardless_of_prior_state() {
    let store = CountingStore::new();
    let app = state_with(&[("AUTHGATE_STANDARD_POINTS", "1")], store.clone());
    let req = request(&[], Some("10.3.3.3"));

    app.engine().evaluate(&req).await;
    assert_eq!(app.engine().evaluate(&req).await.reason, DecisionReason::RateLimited);

    store.fail();
    let d = app.engine().evaluate(&req).await;
    assert_eq!(d.reason, DecisionReason::StoreFault);
    assert!(d.verdict.is_allow());
    assert!(d.verdict.context.is_none());
}

#[tokio::test]
async fn store_fault_can_fail_closed() {
    let store = CountingStore::new();
    store.fail();
    let app = state_with(&[("AUTHGATE_FAULT_POLICY", "fail_closed")], store);
    let d = app.engine().evaluate(&request(&[], Some("10.3.3.4"))).await;
    assert_eq!(d.reason, DecisionReason::StoreFault);
    assert_eq!(d.verdict.effect, Effect::Deny);
    assert!(d.verdict.context.is_none());
}

#[tokio::test(start_paused = true)]
async fn store_timeout_fails_open() {
    let app = state_with(&[], Arc::new(StuckStore));
    let d = app.engine().evaluate(&request(&[], Some("10.4.4.4"))).await;
    assert_eq!(d.reason, DecisionReason::StoreFault);
    assert!(d.verdict.is_allow());
    assert!(d.verdict.context.is_none());
}

#[tokio::test]
async fn failed_bearer_falls_through_to_anonymous() {
    let app = state_with(&[], CountingStore::new());

    let bad = [
        expired(USER_SECRET, "alice"),
        mint(OVERRIDE_SECRET, "alice", &["admin"]),
        "not.a.jwt".to_string(),
    ];
    for token in bad {
        let auth = format!("Bearer {token}");
        let d = app
            .engine()
            .evaluate(&request(&[("Authorization", auth.as_str())], Some("10.5.5.5")))
            .await;
        assert!(d.verdict.is_allow());
        assert_eq!(d.reason, DecisionReason::WithinBudget);
        // anonymous callers are attributed to their identity
        assert_eq!(d.verdict.principal.as_deref(), Some("10.5.5.5"));
    }

    // all three landed in the standard bucket
    let d = app.engine().evaluate(&request(&[], Some("10.5.5.5"))).await;
    assert_eq!(d.reason, DecisionReason::RateLimited);
}

#[tokio::test]
async fn decide_records_metrics() {
    let app = state_with(&[], CountingStore::new());
    app.engine().decide(&request(&[], Some("10.6.6.6"))).await;
    app.engine().decide(&request(&[], None)).await;

    let m = app.metrics();
    assert_eq!(m.decisions.get(&[("effect", "Allow"), ("reason", "within_budget")]), 1);
    assert_eq!(m.decisions.get(&[("effect", "Deny"), ("reason", "no_identity")]), 1);
}
