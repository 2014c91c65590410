//! Permission introspection and module access checks.

use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

use super::auth::{
    AuthState,
    guard::{require_permission, require_role, require_session},
    types::{ModuleAccess, PermissionsResponse},
};
use crate::authz::{Module, PermissionLevel, Role, accessible_modules, role::normalize_role};

#[utoipa::path(
    get,
    path = "/v1/me/permissions",
    responses(
        (status = 200, description = "Effective module levels for the session", body = PermissionsResponse),
        (status = 401, description = "No session"),
        (status = 429, description = "Too many requests"),
        (status = 503, description = "Credential store unavailable", body = String)
    ),
    tag = "permissions"
)]
pub async fn my_permissions(
    headers: HeaderMap,
    Extension(auth_state): Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let state = match require_session(&headers, &auth_state).await {
        Ok(state) => state,
        Err(status) => return status.into_response(),
    };

    let modules = accessible_modules(Some(&state))
        .into_iter()
        .map(|(module, level)| ModuleAccess { module, level })
        .collect();

    Json(PermissionsResponse {
        role: state.primary_role(),
        roles: state.roles().to_vec(),
        is_system_admin: state.is_system_admin(),
        modules,
    })
    .into_response()
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AccessQuery {
    /// Required level, defaults to `VIEW_ACCESS`.
    pub level: Option<String>,
}

#[utoipa::path(
    get,
    path = "/v1/modules/{module}/access",
    params(
        ("module" = String, Path, description = "Module name, e.g. `accounting`"),
        AccessQuery
    ),
    responses(
        (status = 204, description = "Session has the required level"),
        (status = 401, description = "No session"),
        (status = 403, description = "Insufficient level"),
        (status = 429, description = "Too many requests"),
        (status = 503, description = "Credential store unavailable")
    ),
    tag = "permissions"
)]
pub async fn module_access(
    headers: HeaderMap,
    Path(module): Path<String>,
    Query(query): Query<AccessQuery>,
    Extension(auth_state): Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    // Unknown names are denied like any other insufficient level.
    let requested = parse_request(&module, query.level.as_deref());

    let (module, level) = match requested {
        Some(pair) => pair,
        None => {
            return match require_session(&headers, &auth_state).await {
                Ok(_) => StatusCode::FORBIDDEN,
                Err(status) => status,
            };
        }
    };

    match require_permission(&headers, &auth_state, module, level).await {
        Ok(_) => StatusCode::NO_CONTENT,
        Err(status) => status,
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct RoleQuery {
    /// Comma separated allow-list, e.g. `HR,QMR`.
    pub any: String,
}

#[utoipa::path(
    get,
    path = "/v1/me/roles/check",
    params(RoleQuery),
    responses(
        (status = 204, description = "Session holds one of the roles"),
        (status = 401, description = "No session"),
        (status = 403, description = "None of the roles held"),
        (status = 429, description = "Too many requests"),
        (status = 503, description = "Credential store unavailable")
    ),
    tag = "permissions"
)]
pub async fn role_access(
    headers: HeaderMap,
    Query(query): Query<RoleQuery>,
    Extension(auth_state): Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let allowed = parse_roles(&query.any);
    match require_role(&headers, &auth_state, &allowed).await {
        Ok(_) => StatusCode::NO_CONTENT,
        Err(status) => status,
    }
}

// Unknown names are dropped; an empty list only admits system admins.
fn parse_roles(raw: &str) -> Vec<Role> {
    raw.split(',')
        .filter_map(normalize_role)
        .filter_map(|name| name.parse::<Role>().ok())
        .collect()
}

fn parse_request(module: &str, level: Option<&str>) -> Option<(Module, PermissionLevel)> {
    let module = module.parse::<Module>().ok()?;
    let level = match level {
        Some(raw) => raw.parse::<PermissionLevel>().ok()?,
        None => PermissionLevel::ViewAccess,
    };
    Some((module, level))
}
