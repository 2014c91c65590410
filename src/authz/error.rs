//! Error taxonomy for authentication and session building.
//!
//! Every variant fails closed: callers never receive a partial principal or a
//! partial session state alongside an error.

use axum::http::StatusCode;

/// Credential store failures. Both variants are treated as "storage unavailable".
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
    #[error("credential store call timed out")]
    Timeout,
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Authentication failures surfaced to callers.
///
/// `InvalidCredentials` never distinguishes an unknown identifier from a wrong
/// secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("too many attempts, try again later")]
    RateLimitExceeded,
    #[error("service unavailable")]
    StorageUnavailable,
}

impl AuthFailure {
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<StoreError> for AuthFailure {
    fn from(_: StoreError) -> Self {
        Self::StorageUnavailable
    }
}

/// Session build failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("service unavailable")]
    StorageUnavailable,
    #[error("principal no longer exists")]
    PrincipalNotFound,
}

impl SessionError {
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::PrincipalNotFound => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(_: StoreError) -> Self {
        Self::StorageUnavailable
    }
}
