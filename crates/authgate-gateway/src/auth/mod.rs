//! Token verification and trust-tier classification.

pub mod tier;
pub mod verifier;

pub use tier::{bearer_token, Classification, TierClassifier, TrustTier};
pub use verifier::{Claims, JwtVerifier, TokenVerifier, VerifyError};
