//! Request/response types for auth and permission endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::authz::{Module, PermissionLevel, Role, SessionState};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub principal_id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub roles: Vec<Role>,
    pub is_system_admin: bool,
    pub home_route: String,
}

impl From<&SessionState> for SessionResponse {
    fn from(state: &SessionState) -> Self {
        let role = state.primary_role();
        Self {
            principal_id: state.principal_id().to_string(),
            email: state.email().to_string(),
            name: state.name().to_string(),
            role,
            roles: state.roles().to_vec(),
            is_system_admin: state.is_system_admin(),
            home_route: role.home_route().to_string(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    /// Signed session token, also set as the session cookie.
    pub access_token: String,
    pub expires_in: u64,
    pub session: SessionResponse,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ModuleAccess {
    pub module: Module,
    pub level: PermissionLevel,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PermissionsResponse {
    pub role: Role,
    pub roles: Vec<Role>,
    pub is_system_admin: bool,
    /// Modules with more than `NO_ACCESS`.
    pub modules: Vec<ModuleAccess>,
}
