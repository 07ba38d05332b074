//! Decision outcome produced once per request.

use serde::{Deserialize, Serialize};

/// Effect of a verdict. Serialized exactly as the gateway expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    pub fn as_str(self) -> &'static str {
        match self {
            Effect::Allow => "Allow",
            Effect::Deny => "Deny",
        }
    }
}

/// Diagnostic fields attached to rate-limited decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticContext {
    pub remaining_points: u32,
    pub consumed_points: u32,
    pub ms_before_next: u64,
    pub is_first_in_duration: bool,
    pub identity: String,
    pub path: Option<String>,
    pub user_agent: Option<String>,
    /// Human-readable message; set only on rate-limit denials.
    pub error_message: Option<String>,
}

/// Final decision for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub effect: Effect,
    /// Actor the gateway should attribute the call to.
    pub principal: Option<String>,
    pub context: Option<DiagnosticContext>,
}

impl Verdict {
    pub fn allow() -> Self {
        Self { effect: Effect::Allow, principal: None, context: None }
    }

    pub fn deny() -> Self {
        Self { effect: Effect::Deny, principal: None, context: None }
    }

    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    pub fn with_context(mut self, ctx: DiagnosticContext) -> Self {
        self.context = Some(ctx);
        self
    }

    pub fn is_allow(&self) -> bool {
        self.effect == Effect::Allow
    }
}
