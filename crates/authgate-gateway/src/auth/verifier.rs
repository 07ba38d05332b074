//! Signed token verification (HS256 JWT).

use std::collections::BTreeSet;

use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decoded payload of a verified token. Owned by a single decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub subject: String,
    pub roles: BTreeSet<String>,
}

impl Claims {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Why a token was not accepted. Every variant demotes the caller a tier.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("token expired")]
    Expired,
    #[error("bad signature")]
    BadSignature,
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("token rejected: {0}")]
    Rejected(String),
}

/// Verification primitive: token + secret in, claims or failure out.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str, secret: &[u8]) -> Result<Claims, VerifyError>;
}

/// JWT wire claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: u64,
}

/// HS256 verifier. `exp` is mandatory.
pub struct JwtVerifier {
    validation: Validation,
}

impl JwtVerifier {
    pub fn new() -> Self {
        Self { validation: Validation::new(Algorithm::HS256) }
    }
}

impl Default for JwtVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str, secret: &[u8]) -> Result<Claims, VerifyError> {
        let key = DecodingKey::from_secret(secret);
        let data = decode::<TokenClaims>(token, &key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => VerifyError::Expired,
                ErrorKind::InvalidSignature => VerifyError::BadSignature,
                ErrorKind::InvalidToken => VerifyError::Malformed(e.to_string()),
                _ => VerifyError::Rejected(e.to_string()),
            }
        })?;

        if data.claims.sub.is_empty() {
            return Err(VerifyError::Rejected("empty subject".into()));
        }

        Ok(Claims {
            subject: data.claims.sub,
            roles: data.claims.roles.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn now() -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
    }

    fn mint(secret: &str, sub: &str, roles: &[&str], exp: u64) -> String {
        let claims = TokenClaims {
            sub: sub.into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            exp,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn accepts_valid_token() {
        let t = mint("s3cret", "user-1", &["admin", "ops"], now() + 600);
        let c = JwtVerifier::new().verify(&t, b"s3cret").unwrap();
        assert_eq!(c.subject, "user-1");
        assert!(c.has_role("admin"));
        assert!(c.has_role("ops"));
    }

    #[test]
    fn wrong_secret_is_bad_signature() {
        let t = mint("s3cret", "user-1", &[], now() + 600);
        let err = JwtVerifier::new().verify(&t, b"other").unwrap_err();
        assert_eq!(err, VerifyError::BadSignature);
    }

    #[test]
    fn expired_token() {
        let t = mint("s3cret", "user-1", &[], now() - 3600);
        let err = JwtVerifier::new().verify(&t, b"s3cret").unwrap_err();
        assert_eq!(err, VerifyError::Expired);
    }

    #[test]
    fn garbage_is_malformed() {
        let err = JwtVerifier::new().verify("not-a-jwt", b"s3cret").unwrap_err();
        assert!(matches!(err, VerifyError::Malformed(_)), "{err:?}");
    }
}
