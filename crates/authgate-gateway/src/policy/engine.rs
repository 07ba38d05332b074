use std::sync::Arc;
use std::time::Instant;

use authgate_core::request::RequestContext;
use authgate_core::verdict::{DiagnosticContext, Verdict};

use crate::auth::{TierClassifier, TokenVerifier};
use crate::config::{AuthGateConfig, FaultPolicy};
use crate::identity::IdentityResolver;
use crate::limiter::{ConsumeError, CounterState, RateLimiter};
use crate::obs::AuthGateMetrics;

use super::kill_switch::KillSwitch;

/// Message attached to rate-limit denials.
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests";

/// Which exit of the decision pipeline produced the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    KillSwitch,
    Override,
    NoIdentity,
    WithinBudget,
    RateLimited,
    StoreFault,
}

impl DecisionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionReason::KillSwitch => "kill_switch",
            DecisionReason::Override => "override",
            DecisionReason::NoIdentity => "no_identity",
            DecisionReason::WithinBudget => "within_budget",
            DecisionReason::RateLimited => "rate_limited",
            DecisionReason::StoreFault => "store_fault",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub verdict: Verdict,
    pub reason: DecisionReason,
}

impl Decision {
    fn new(verdict: Verdict, reason: DecisionReason) -> Self {
        Self { verdict, reason }
    }
}

/// Per-request decision pipeline. Construct once at startup, then share via Arc.
///
/// Holds no per-request mutable state; the only shared mutable resource is the
/// counter store behind the rate limiter.
pub struct DecisionEngine {
    kill_switch: KillSwitch,
    resolver: IdentityResolver,
    classifier: TierClassifier,
    limiter: Arc<RateLimiter>,
    fault_policy: FaultPolicy,
    metrics: Arc<AuthGateMetrics>,
}

impl DecisionEngine {
    pub fn new(
        cfg: &AuthGateConfig,
        limiter: Arc<RateLimiter>,
        verifier: Arc<dyn TokenVerifier>,
        metrics: Arc<AuthGateMetrics>,
    ) -> Self {
        Self {
            kill_switch: KillSwitch::new(cfg.kill_switch),
            resolver: IdentityResolver::new(&cfg.identity),
            classifier: TierClassifier::new(verifier, &cfg.secrets, &cfg.tokens),
            limiter,
            fault_policy: cfg.fault_policy,
            metrics,
        }
    }

    pub fn kill_switch(&self) -> &KillSwitch {
        &self.kill_switch
    }

    /// Decide and record metrics. Always yields exactly one verdict.
    pub async fn decide(&self, req: &RequestContext) -> Verdict {
        let started = Instant::now();
        let d = self.evaluate(req).await;

        self.metrics.decisions.inc(&[
            ("effect", d.verdict.effect.as_str()),
            ("reason", d.reason.as_str()),
        ]);
        self.metrics.decision_duration.observe(&[], started.elapsed());

        d.verdict
    }

    pub async fn evaluate(&self, req: &RequestContext) -> Decision {
        // 1) Kill switch
        if self.kill_switch.is_engaged() {
            return Decision::new(Verdict::allow(), DecisionReason::KillSwitch);
        }

        // 2) Override token
        if self.classifier.is_override(req) {
            return Decision::new(Verdict::allow(), DecisionReason::Override);
        }

        // 3) Identity
        let identity = match self.resolver.resolve(req) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(resource = %req.resource(), error = %e, "denying request");
                return Decision::new(Verdict::deny(), DecisionReason::NoIdentity);
            }
        };

        // 4) Tier -> bucket -> consume
        let class = self.classifier.classify_user(req);
        let principal = class.subject().unwrap_or(identity.as_str()).to_string();

        let Some(outcome) = self.limiter.consume(class.tier, &identity).await else {
            return Decision::new(Verdict::allow(), DecisionReason::Override);
        };

        match outcome {
            Ok(state) => {
                let ctx = diagnostic(req, identity, state, None);
                Decision::new(
                    Verdict::allow().with_principal(principal).with_context(ctx),
                    DecisionReason::WithinBudget,
                )
            }
            Err(ConsumeError::LimitExceeded(state)) => {
                tracing::info!(
                    identity = %identity,
                    tier = class.tier.as_str(),
                    consumed = state.consumed_points,
                    ms_before_next = state.ms_before_next,
                    "rate limit exceeded"
                );
                let ctx = diagnostic(req, identity, state, Some(RATE_LIMIT_MESSAGE));
                Decision::new(
                    Verdict::deny().with_principal(principal).with_context(ctx),
                    DecisionReason::RateLimited,
                )
            }
            Err(ConsumeError::Fault(msg)) => {
                self.metrics.store_faults.inc(&[]);
                tracing::error!(
                    identity = %identity,
                    tier = class.tier.as_str(),
                    error = %msg,
                    policy = ?self.fault_policy,
                    "counter store fault"
                );
                let verdict = match self.fault_policy {
                    FaultPolicy::FailOpen => Verdict::allow(),
                    FaultPolicy::FailClosed => Verdict::deny(),
                };
                Decision::new(verdict, DecisionReason::StoreFault)
            }
        }
    }
}

fn diagnostic(
    req: &RequestContext,
    identity: String,
    state: CounterState,
    error_message: Option<&str>,
) -> DiagnosticContext {
    DiagnosticContext {
        remaining_points: state.remaining_points,
        consumed_points: state.consumed_points,
        ms_before_next: state.ms_before_next,
        is_first_in_duration: state.is_first_in_duration,
        identity,
        path: req.path().map(str::to_string),
        user_agent: req.user_agent().map(str::to_string),
        error_message: error_message.map(str::to_string),
    }
}
