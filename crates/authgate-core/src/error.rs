//! Shared error type across authgate crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed event.
    BadRequest,
    /// Invalid or incomplete configuration.
    Config,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::Config => "CONFIG",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, AuthGateError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum AuthGateError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl AuthGateError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            AuthGateError::BadRequest(_) => ClientCode::BadRequest,
            AuthGateError::Config(_) => ClientCode::Config,
            AuthGateError::Internal(_) => ClientCode::Internal,
        }
    }
}
