//! Password login.
//!
//! Flow Overview:
//! 1) Authenticate the identifier/secret pair (rate limited, generic failures).
//! 2) Build the session state for the authenticated principal.
//! 3) Sign it and return it both as a cookie and in the body.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::error;

use super::{
    session::session_cookie,
    state::AuthState,
    types::{LoginRequest, LoginResponse, SessionResponse},
};
use crate::authz::SessionRequest;

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success, session cookie set", body = LoginResponse),
        (status = 400, description = "Missing payload", body = String),
        (status = 401, description = "Invalid email or password", body = String),
        (status = 429, description = "Too many attempts", body = String),
        (status = 503, description = "Credential store unavailable", body = String)
    ),
    tag = "auth"
)]
pub async fn login(
    Extension(auth_state): Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let principal = match auth_state
        .authenticator()
        .authenticate(&request.email, &request.password)
        .await
    {
        Ok(principal) => principal,
        Err(failure) => return (failure.status(), failure.to_string()).into_response(),
    };

    let state = match auth_state
        .sessions()
        .build(SessionRequest::SignIn(&principal))
        .await
    {
        Ok(state) => state,
        Err(err) => return (err.status(), err.to_string()).into_response(),
    };

    let token = match auth_state.codec().encode(&state) {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to sign session token: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut headers = HeaderMap::new();
    match session_cookie(auth_state.config(), &token) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    let body = LoginResponse {
        access_token: token,
        expires_in: auth_state.codec().ttl().as_secs(),
        session: SessionResponse::from(&state),
    };
    (StatusCode::OK, headers, Json(body)).into_response()
}
