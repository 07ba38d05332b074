//! Client identity resolution (the rate-limit key).
//!
//! The forwarded real-address header is preferred over the connection source
//! address because requests usually reach us through a proxy that terminates
//! the client connection.
//!
//! # Trust boundary
//! The forwarded header is client-controllable unless a trusted proxy at the
//! network edge overwrites it. With the header trusted, a caller that can reach
//! the gateway directly can pick its own rate-limit key. Deployments without
//! such a proxy must set `identity.trust_forwarded_header: false`.

use thiserror::Error;

use authgate_core::request::RequestContext;

use crate::config::IdentitySection;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("no usable client identity")]
pub struct ResolutionFailure;

pub struct IdentityResolver {
    forwarded_header: Option<String>,
}

impl IdentityResolver {
    pub fn new(cfg: &IdentitySection) -> Self {
        let forwarded_header = cfg
            .trust_forwarded_header
            .then(|| cfg.forwarded_header.trim().to_ascii_lowercase());
        Self { forwarded_header }
    }

    pub fn resolve(&self, req: &RequestContext) -> Result<String, ResolutionFailure> {
        self.forwarded_header
            .as_deref()
            .and_then(|h| req.headers().get_non_empty(h))
            .or_else(|| req.source_addr())
            .map(str::to_string)
            .ok_or(ResolutionFailure)
    }
}
