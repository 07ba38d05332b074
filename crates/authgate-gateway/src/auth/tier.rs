//! Trust-tier classification.
//!
//! Tiers are tried in strict priority order: override token, bearer token,
//! anonymous. A failed verification is never an error for the caller; it only
//! means "not this tier" and is logged at debug level.
//!
//! The override and bearer tokens are checked against two independent secrets
//! so that a leaked user-signing secret cannot mint operator overrides.

use std::sync::Arc;

use authgate_core::request::{Headers, RequestContext};

use crate::config::{SecretsSection, TokenSection};

use super::verifier::{Claims, TokenVerifier};

pub const AUTHORIZATION_HEADER: &str = "authorization";
const BEARER_SCHEME: &str = "bearer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustTier {
    /// Trusted internal caller; no rate limiting.
    Override,
    Admin,
    Standard,
    Anonymous,
}

impl TrustTier {
    pub fn as_str(self) -> &'static str {
        match self {
            TrustTier::Override => "override",
            TrustTier::Admin => "admin",
            TrustTier::Standard => "standard",
            TrustTier::Anonymous => "anonymous",
        }
    }
}

/// Tier plus the claims that earned it (bearer tiers only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub tier: TrustTier,
    pub claims: Option<Claims>,
}

impl Classification {
    fn anonymous() -> Self {
        Self { tier: TrustTier::Anonymous, claims: None }
    }

    pub fn subject(&self) -> Option<&str> {
        self.claims.as_ref().map(|c| c.subject.as_str())
    }
}

/// Extract the token from an `Authorization` value, stripping the scheme.
///
/// A value without a scheme is taken as the raw token; any scheme other than
/// `Bearer` yields `None`.
pub fn bearer_token(headers: &Headers) -> Option<&str> {
    let raw = headers.get_non_empty(AUTHORIZATION_HEADER)?;
    match raw.split_once(char::is_whitespace) {
        Some((scheme, rest)) => {
            if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
                return None;
            }
            let token = rest.trim();
            (!token.is_empty()).then_some(token)
        }
        None if raw.eq_ignore_ascii_case(BEARER_SCHEME) => None,
        None => Some(raw),
    }
}

pub struct TierClassifier {
    verifier: Arc<dyn TokenVerifier>,
    override_secret: Vec<u8>,
    user_secret: Vec<u8>,
    override_header: String,
    admin_role: String,
}

impl TierClassifier {
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        secrets: &SecretsSection,
        tokens: &TokenSection,
    ) -> Self {
        Self {
            verifier,
            override_secret: secrets.override_secret.as_bytes().to_vec(),
            user_secret: secrets.user_secret.as_bytes().to_vec(),
            override_header: tokens.override_header.clone(),
            admin_role: tokens.admin_role.clone(),
        }
    }

    /// Full classification in priority order.
    pub fn classify(&self, req: &RequestContext) -> Classification {
        if self.is_override(req) {
            return Classification { tier: TrustTier::Override, claims: None };
        }
        self.classify_user(req)
    }

    /// True when the override header carries a token signed with the
    /// operator secret. Absent or garbled tokens simply return false.
    pub fn is_override(&self, req: &RequestContext) -> bool {
        let Some(token) = req.headers().get_non_empty(&self.override_header) else {
            return false;
        };
        match self.verifier.verify(token, &self.override_secret) {
            Ok(claims) => {
                tracing::debug!(subject = %claims.subject, "override token accepted");
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "override token rejected; not an override caller");
                false
            }
        }
    }

    /// Bearer-token tiers only (Admin / Standard / Anonymous).
    pub fn classify_user(&self, req: &RequestContext) -> Classification {
        let Some(token) = bearer_token(req.headers()) else {
            return Classification::anonymous();
        };
        match self.verifier.verify(token, &self.user_secret) {
            Ok(claims) => {
                let tier = if claims.has_role(&self.admin_role) {
                    TrustTier::Admin
                } else {
                    TrustTier::Standard
                };
                Classification { tier, claims: Some(claims) }
            }
            Err(e) => {
                tracing::debug!(error = %e, "bearer token rejected; treating as anonymous");
                Classification::anonymous()
            }
        }
    }
}
