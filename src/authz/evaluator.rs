//! Permission evaluation.
//!
//! Pure functions over an immutable [`SessionState`]. The effective level of a
//! session on a module is the highest level any of its roles grants, where a
//! role's level is its override if one is loaded and its matrix default
//! otherwise. A missing session never passes.

use uuid::Uuid;

use super::{
    permission::{DataSensitivity, Module, PermissionLevel, matrix_default, sensitivity_clearance},
    role::{Role, RoleCategory},
    session::SessionState,
};

/// Level granted to a single role, honoring a loaded override.
#[must_use]
pub fn effective_level_for_role(state: &SessionState, role: Role, module: Module) -> PermissionLevel {
    state
        .overrides()
        .get(role, module)
        .unwrap_or_else(|| matrix_default(role, module))
}

/// Highest level any role of the session grants on `module`.
/// System admins always get `FullAccess`.
#[must_use]
pub fn effective_level(state: Option<&SessionState>, module: Module) -> PermissionLevel {
    let Some(state) = state else {
        return PermissionLevel::NoAccess;
    };
    if state.is_system_admin() {
        return PermissionLevel::FullAccess;
    }
    state
        .roles()
        .iter()
        .map(|role| effective_level_for_role(state, *role, module))
        .max()
        .unwrap_or(PermissionLevel::NoAccess)
}

/// Whether the session reaches `required` on `module`.
#[must_use]
pub fn check_permission(
    state: Option<&SessionState>,
    module: Module,
    required: PermissionLevel,
) -> bool {
    let Some(state) = state else {
        return false;
    };
    effective_level(Some(state), module) >= required
}

/// Whether the session holds any of `allowed`. System admins always pass.
#[must_use]
pub fn has_any_role(state: Option<&SessionState>, allowed: &[Role]) -> bool {
    let Some(state) = state else {
        return false;
    };
    state.is_system_admin() || state.roles().iter().any(|role| allowed.contains(role))
}

/// Modules where the session has more than `NoAccess`, in declaration order.
#[must_use]
pub fn accessible_modules(state: Option<&SessionState>) -> Vec<(Module, PermissionLevel)> {
    Module::ALL
        .into_iter()
        .map(|module| (module, effective_level(state, module)))
        .filter(|(_, level)| *level > PermissionLevel::NoAccess)
        .collect()
}

/// Module check plus sensitivity clearance from at least one role.
#[must_use]
pub fn can_access_data(
    state: Option<&SessionState>,
    module: Module,
    sensitivity: DataSensitivity,
    required: PermissionLevel,
) -> bool {
    let Some(state) = state else {
        return false;
    };
    if state.is_system_admin() {
        return true;
    }
    check_permission(Some(state), module, required)
        && state
            .roles()
            .iter()
            .any(|role| sensitivity_clearance(*role, sensitivity))
}

/// Crew-only sessions may read their own records and nothing else.
#[must_use]
pub fn can_access_principal_data(state: Option<&SessionState>, requested: Uuid) -> bool {
    let Some(state) = state else {
        return false;
    };
    if state.is_system_admin() {
        return true;
    }
    let crew_only = state
        .roles()
        .iter()
        .all(|role| role.category() == RoleCategory::Crew);
    !crew_only || state.principal_id() == requested
}
