//! Request guards.
//!
//! Flow Overview: read the session token, rehydrate the signed state, refresh
//! it against the credential store, then evaluate. A missing, forged, expired
//! or orphaned session is 401; a valid session without the level is 403. The
//! rejection never says which modules or levels exist. Each principal also has
//! a request budget across guarded routes; exceeding it is 429.

use axum::http::{HeaderMap, StatusCode};
use tracing::info;
use uuid::Uuid;

use super::{session::extract_session_token, state::AuthState};
use crate::authz::{
    Module, PermissionLevel, Role, SessionError, SessionRequest, SessionState, check_permission,
    has_any_role,
};

fn request_rate_key(principal_id: Uuid) -> String {
    format!("api:{principal_id}")
}

/// Resolve and refresh the caller's session.
///
/// Returns `Ok(None)` when there is no usable session.
pub(crate) async fn current_session(
    headers: &HeaderMap,
    auth_state: &AuthState,
) -> Result<Option<SessionState>, StatusCode> {
    let Some(token) = extract_session_token(headers) else {
        return Ok(None);
    };
    let Some(previous) = auth_state.codec().decode(&token) else {
        return Ok(None);
    };

    let throttle = auth_state.config().request_throttle();
    if !auth_state.limiter().allow(
        &request_rate_key(previous.principal_id()),
        throttle.max_attempts(),
        throttle.window(),
    ) {
        info!(principal_id = %previous.principal_id(), "request rate limited");
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    match auth_state
        .sessions()
        .build(SessionRequest::Refresh(&previous))
        .await
    {
        Ok(state) => Ok(Some(state)),
        Err(SessionError::PrincipalNotFound) => Ok(None),
        Err(err) => Err(err.status()),
    }
}

/// Resolve the session or reject with 401.
pub(crate) async fn require_session(
    headers: &HeaderMap,
    auth_state: &AuthState,
) -> Result<SessionState, StatusCode> {
    current_session(headers, auth_state)
        .await?
        .ok_or(StatusCode::UNAUTHORIZED)
}

/// Resolve the session and require `level` on `module` (401 / 403).
pub(crate) async fn require_permission(
    headers: &HeaderMap,
    auth_state: &AuthState,
    module: Module,
    level: PermissionLevel,
) -> Result<SessionState, StatusCode> {
    let state = require_session(headers, auth_state).await?;
    if check_permission(Some(&state), module, level) {
        Ok(state)
    } else {
        Err(StatusCode::FORBIDDEN)
    }
}

/// Resolve the session and require at least one of `allowed` (401 / 403).
/// System admins always pass.
pub(crate) async fn require_role(
    headers: &HeaderMap,
    auth_state: &AuthState,
    allowed: &[Role],
) -> Result<SessionState, StatusCode> {
    let state = require_session(headers, auth_state).await?;
    if has_any_role(Some(&state), allowed) {
        Ok(state)
    } else {
        Err(StatusCode::FORBIDDEN)
    }
}
