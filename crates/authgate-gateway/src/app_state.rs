//! Shared application state for the authgate service.
//!
//! Builds the long-lived collaborators (counter store, verifier, rate limiter)
//! once and injects them into the decision engine.

use std::sync::Arc;

use authgate_core::error::Result;

use crate::auth::{JwtVerifier, TokenVerifier};
use crate::config::AuthGateConfig;
use crate::limiter::{CounterStore, InMemoryCounterStore, RateLimiter};
use crate::obs::AuthGateMetrics;
use crate::policy::DecisionEngine;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: AuthGateConfig,
    engine: DecisionEngine,
    metrics: Arc<AuthGateMetrics>,
}

impl AppState {
    /// Build state with the bundled in-process store and HS256 verifier.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub fn new(cfg: AuthGateConfig) -> Result<Self> {
        let store = Arc::new(InMemoryCounterStore::new(cfg.counter_table()));
        Self::with_collaborators(cfg, store, Arc::new(JwtVerifier::new()))
    }

    pub fn with_collaborators(
        cfg: AuthGateConfig,
        store: Arc<dyn CounterStore>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Result<Self> {
        cfg.validate()?;

        let metrics = Arc::new(AuthGateMetrics::default());
        let limiter = Arc::new(RateLimiter::new(store, &cfg.limits));
        let engine = DecisionEngine::new(&cfg, limiter, verifier, Arc::clone(&metrics));

        if cfg.kill_switch {
            tracing::warn!("kill switch enabled by configuration: all requests will be allowed");
        }
        if cfg.identity.trust_forwarded_header {
            tracing::info!(
                header = %cfg.identity.forwarded_header,
                "trusting forwarded address header; a trusted proxy must overwrite it"
            );
        }

        Ok(Self {
            inner: Arc::new(AppStateInner { cfg, engine, metrics }),
        })
    }

    pub fn cfg(&self) -> &AuthGateConfig {
        &self.inner.cfg
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.inner.engine
    }

    pub fn metrics(&self) -> Arc<AuthGateMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    pub fn metrics_extra(&self) -> Vec<(&'static str, u64)> {
        let engaged = self.inner.engine.kill_switch().is_engaged();
        vec![("authgate_kill_switch", u64::from(engaged))]
    }
}
