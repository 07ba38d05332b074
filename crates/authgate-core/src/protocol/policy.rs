//! Policy response encoder.
//!
//! The gateway consumes an IAM-style policy: principal, one statement with the
//! effect for the evaluated resource, and a flat context map whose values must
//! be primitives (string, number, boolean).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::verdict::{Effect, Verdict};

pub const POLICY_VERSION: &str = "2012-10-17";
pub const INVOKE_ACTION: &str = "execute-api:Invoke";
pub const ANONYMOUS_PRINCIPAL: &str = "anonymous";

/// Top-level authorizer response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyResponse {
    pub principal_id: String,
    pub policy_document: PolicyDocument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<BTreeMap<String, ContextValue>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Statement")]
    pub statement: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(rename = "Action")]
    pub action: String,
    #[serde(rename = "Effect")]
    pub effect: Effect,
    #[serde(rename = "Resource")]
    pub resource: String,
}

/// Primitive context value. Gateways reject nested objects and arrays here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Bool(bool),
    Number(u64),
    String(String),
}

impl PolicyResponse {
    pub fn effect(&self) -> Option<Effect> {
        self.policy_document.statement.first().map(|s| s.effect)
    }

    pub fn context_value(&self, key: &str) -> Option<&ContextValue> {
        self.context.as_ref().and_then(|c| c.get(key))
    }
}

/// Wrap `msg` in JSON string quotes so templating layers render it verbatim.
pub fn quote_literal(msg: &str) -> String {
    serde_json::Value::String(msg.to_owned()).to_string()
}

/// Encode a verdict for `resource`.
pub fn encode(verdict: &Verdict, resource: &str) -> PolicyResponse {
    let principal_id = verdict
        .principal
        .clone()
        .or_else(|| verdict.context.as_ref().map(|c| c.identity.clone()))
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| ANONYMOUS_PRINCIPAL.to_string());

    let context = verdict.context.as_ref().map(|c| {
        let mut m = BTreeMap::new();
        m.insert("remainingPoints".into(), ContextValue::Number(c.remaining_points.into()));
        m.insert("consumedPoints".into(), ContextValue::Number(c.consumed_points.into()));
        m.insert("msBeforeNext".into(), ContextValue::Number(c.ms_before_next));
        m.insert("isFirstInDuration".into(), ContextValue::Bool(c.is_first_in_duration));
        m.insert("identity".into(), ContextValue::String(c.identity.clone()));
        if let Some(p) = &c.path {
            m.insert("path".into(), ContextValue::String(p.clone()));
        }
        if let Some(ua) = &c.user_agent {
            m.insert("userAgent".into(), ContextValue::String(ua.clone()));
        }
        if let Some(msg) = &c.error_message {
            m.insert("errorMessage".into(), ContextValue::String(quote_literal(msg)));
        }
        m
    });

    PolicyResponse {
        principal_id,
        policy_document: PolicyDocument {
            version: POLICY_VERSION.to_string(),
            statement: vec![Statement {
                action: INVOKE_ACTION.to_string(),
                effect: verdict.effect,
                resource: resource.to_string(),
            }],
        },
        context,
    }
}
