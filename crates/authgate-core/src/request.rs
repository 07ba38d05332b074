//! Immutable per-request snapshot handed to the decision engine.
//!
//! A `RequestContext` is built once per invocation (usually from the
//! gateway's authorizer event) and only ever borrowed afterwards.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{AuthGateError, Result};

/// Case-insensitive header map. Names are stored lowercased.
///
/// When the same name arrives in several casings, the last one inserted wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    map: BTreeMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.map.insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Like `get`, but treats empty / whitespace-only values as absent.
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut h = Headers::new();
        for (k, v) in iter {
            h.insert(k, v);
        }
        h
    }
}

/// Snapshot of one inbound call.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    headers: Headers,
    source_addr: Option<String>,
    user_agent: Option<String>,
    resource: String,
    path: Option<String>,
}

impl RequestContext {
    pub fn new(headers: Headers, resource: impl Into<String>) -> Self {
        Self {
            headers,
            resource: resource.into(),
            ..Self::default()
        }
    }

    pub fn with_source_addr(mut self, addr: impl Into<String>) -> Self {
        self.source_addr = Some(addr.into());
        self
    }

    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Connection-level source address as declared by the gateway.
    pub fn source_addr(&self) -> Option<&str> {
        self.source_addr.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    /// Declared user-agent, falling back to the `user-agent` header.
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent
            .as_deref()
            .filter(|v| !v.is_empty())
            .or_else(|| self.headers.get_non_empty("user-agent"))
    }

    /// Protected resource identifier being evaluated (e.g. a method ARN).
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

// --------------------
// Gateway authorizer event
// --------------------

/// Request-type authorizer event as sent by the invoking gateway.
///
/// Parsing is lossy: a field of the wrong JSON type (a numeric or null header
/// value, a null `methodArn`, a non-object `requestContext`) is treated as
/// absent instead of failing the whole event.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthorizerEvent {
    #[serde(deserialize_with = "lossy_headers")]
    pub headers: Headers,
    #[serde(deserialize_with = "lossy_string")]
    pub method_arn: Option<String>,
    #[serde(deserialize_with = "lossy_string")]
    pub path: Option<String>,
    #[serde(deserialize_with = "lossy_object")]
    pub request_context: EventRequestContext,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventRequestContext {
    #[serde(deserialize_with = "lossy_object")]
    pub identity: EventIdentity,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventIdentity {
    #[serde(deserialize_with = "lossy_string")]
    pub source_ip: Option<String>,
    #[serde(deserialize_with = "lossy_string")]
    pub user_agent: Option<String>,
}

fn lossy_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

fn lossy_headers<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Headers, D::Error> {
    let Value::Object(map) = Value::deserialize(d)? else {
        return Ok(Headers::new());
    };
    Ok(map
        .into_iter()
        .filter_map(|(k, v)| match v {
            Value::String(s) => Some((k, s)),
            _ => None,
        })
        .collect())
}

fn lossy_object<'de, D, T>(d: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let v = Value::deserialize(d)?;
    Ok(serde_json::from_value(v).unwrap_or_default())
}

impl From<AuthorizerEvent> for RequestContext {
    fn from(ev: AuthorizerEvent) -> Self {
        let identity = ev.request_context.identity;

        RequestContext {
            headers: ev.headers,
            source_addr: identity.source_ip,
            user_agent: identity.user_agent,
            resource: ev.method_arn.unwrap_or_default(),
            path: ev.path,
        }
    }
}

/// Parse a JSON authorizer event into a request snapshot.
///
/// Only input that is not JSON at all, or a bare scalar, fails.
pub fn parse_event(s: &str) -> Result<RequestContext> {
    let ev: AuthorizerEvent = serde_json::from_str(s)
        .map_err(|e| AuthGateError::BadRequest(format!("invalid authorizer event: {e}")))?;
    Ok(ev.into())
}
