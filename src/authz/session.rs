//! Session state building.
//!
//! Flow Overview:
//! 1) Resolve the role set (sign-in: the authenticated principal; refresh: the
//!    principal re-read by id, falling back to the session's roles only when
//!    the stored role is missing).
//! 2) Reuse cached overrides when they are non-empty and were loaded for
//!    exactly that role set, otherwise reload them.
//! 3) Take the admin flag from the same principal read.
//!
//! A role change therefore always invalidates the cached overrides, so a
//! demoted principal never keeps overrides loaded for its old roles.

use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::{
    authenticate::AuthenticatedPrincipal,
    error::SessionError,
    overrides::{OverrideSet, load_overrides},
    role::{DEFAULT_ROLE, Role, RoleSource, normalize_role, resolve_roles},
    store::{CredentialStore, with_deadline},
};

const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(3);

/// Derived authorization context for one signed session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    principal_id: Uuid,
    email: String,
    name: String,
    roles: Vec<Role>,
    overrides: OverrideSet,
    is_system_admin: bool,
}

impl SessionState {
    /// Rehydrate a state carried by a session token.
    ///
    /// Role names from the token are untrusted and go through the resolver again.
    #[must_use]
    pub fn rehydrate(
        principal_id: Uuid,
        email: String,
        name: String,
        token_roles: &[String],
        overrides: OverrideSet,
        is_system_admin: bool,
    ) -> Self {
        let roles = resolve_roles(&[RoleSource::Token(token_roles)]).into_roles();
        Self {
            principal_id,
            email,
            name,
            roles,
            overrides,
            is_system_admin,
        }
    }

    #[must_use]
    pub fn principal_id(&self) -> Uuid {
        self.principal_id
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn primary_role(&self) -> Role {
        self.roles.first().copied().unwrap_or(DEFAULT_ROLE)
    }

    #[must_use]
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    #[must_use]
    pub fn overrides(&self) -> &OverrideSet {
        &self.overrides
    }

    #[must_use]
    pub fn is_system_admin(&self) -> bool {
        self.is_system_admin
    }
}

#[derive(Clone, Copy, Debug)]
pub enum SessionRequest<'a> {
    SignIn(&'a AuthenticatedPrincipal),
    Refresh(&'a SessionState),
}

pub struct SessionBuilder {
    store: Arc<dyn CredentialStore>,
    store_timeout: Duration,
}

impl SessionBuilder {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Build or refresh a session state.
    ///
    /// # Errors
    /// - `StorageUnavailable` if a required store call fails or times out.
    /// - `PrincipalNotFound` if the principal disappeared before a refresh.
    #[instrument(skip_all)]
    pub async fn build(&self, request: SessionRequest<'_>) -> Result<SessionState, SessionError> {
        match request {
            SessionRequest::SignIn(principal) => self.sign_in(principal).await,
            SessionRequest::Refresh(previous) => self.refresh(previous).await,
        }
    }

    async fn sign_in(&self, principal: &AuthenticatedPrincipal) -> Result<SessionState, SessionError> {
        let roles = if principal.roles.is_empty() {
            resolve_roles(&[]).into_roles()
        } else {
            principal.roles.clone()
        };
        let overrides = self.load(&roles).await?;
        info!(
            principal_id = %principal.id,
            role = %roles.first().copied().unwrap_or(DEFAULT_ROLE),
            overrides = overrides.entries().len(),
            "session created"
        );
        Ok(SessionState {
            principal_id: principal.id,
            email: principal.email.clone(),
            name: principal.name.clone(),
            roles,
            overrides,
            is_system_admin: principal.is_system_admin,
        })
    }

    async fn refresh(&self, previous: &SessionState) -> Result<SessionState, SessionError> {
        let record = with_deadline(
            self.store_timeout,
            self.store.find_principal_by_id(previous.principal_id),
        )
        .await
        .map_err(|err| {
            error!("Failed to lookup principal for refresh: {err}");
            SessionError::StorageUnavailable
        })?
        .ok_or_else(|| {
            info!(principal_id = %previous.principal_id, "principal no longer exists");
            SessionError::PrincipalNotFound
        })?;

        let has_stored_role = record
            .roles
            .iter()
            .filter_map(|raw| normalize_role(raw))
            .any(|name| name.parse::<Role>().is_ok());
        let roles = if has_stored_role {
            resolve_roles(&[RoleSource::Store(&record.roles)]).into_roles()
        } else {
            // No usable stored role: the cached session roles come before the default.
            warn!(
                anomaly = "role_resolution",
                principal_id = %record.id,
                session_roles = ?previous.roles,
                "stored role missing on refresh, falling back to session roles"
            );
            let cached: Vec<String> = previous.roles.iter().map(ToString::to_string).collect();
            resolve_roles(&[RoleSource::Store(&record.roles), RoleSource::Token(&cached)])
                .into_roles()
        };
        let roles_changed = roles != previous.roles;
        // An empty cache is never trusted: overrides inserted after sign-in must apply.
        let cache_missing =
            previous.overrides.is_empty() || !previous.overrides.is_loaded_for(&roles);
        let overrides = if roles_changed || cache_missing {
            if roles_changed {
                info!(
                    principal_id = %record.id,
                    from = ?previous.roles,
                    to = ?roles,
                    "role set changed, reloading overrides"
                );
            }
            self.load(&roles).await?
        } else {
            debug!(principal_id = %record.id, "reusing cached overrides");
            previous.overrides.clone()
        };

        Ok(SessionState {
            principal_id: record.id,
            email: record.email,
            name: record.name,
            roles,
            overrides,
            is_system_admin: record.is_system_admin,
        })
    }

    async fn load(&self, roles: &[Role]) -> Result<OverrideSet, SessionError> {
        with_deadline(self.store_timeout, load_overrides(self.store.as_ref(), roles))
            .await
            .map_err(|err| {
                error!("Failed to load permission overrides: {err}");
                SessionError::StorageUnavailable
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::{
        permission::{Module, PermissionLevel},
        store::{MemoryStore, PrincipalRecord},
    };
    use anyhow::Result;

    fn seed(store: &MemoryStore, roles: &[&str]) -> AuthenticatedPrincipal {
        let id = Uuid::new_v4();
        store.insert_principal(PrincipalRecord {
            id,
            email: "office@example.com".to_string(),
            name: "Office".to_string(),
            password_hash: None,
            roles: roles.iter().map(ToString::to_string).collect(),
            is_system_admin: false,
        });
        AuthenticatedPrincipal {
            id,
            email: "office@example.com".to_string(),
            name: "Office".to_string(),
            roles: resolve_roles(&[RoleSource::Principal(
                &roles.iter().map(ToString::to_string).collect::<Vec<_>>(),
            )])
            .into_roles(),
            is_system_admin: false,
        }
    }

    #[tokio::test]
    async fn sign_in_loads_overrides_for_the_role_set() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        store.upsert_override(Role::Accounting, Module::Documents, PermissionLevel::EditAccess);
        let principal = seed(&store, &["ACCOUNTING"]);

        let state = SessionBuilder::new(store)
            .build(SessionRequest::SignIn(&principal))
            .await?;
        assert_eq!(state.primary_role(), Role::Accounting);
        assert!(state.overrides().is_loaded_for(&[Role::Accounting]));
        assert_eq!(
            state.overrides().get(Role::Accounting, Module::Documents),
            Some(PermissionLevel::EditAccess)
        );
        Ok(())
    }

    #[tokio::test]
    async fn refresh_reuses_loaded_overrides_when_roles_are_unchanged() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        store.upsert_override(Role::Hr, Module::Documents, PermissionLevel::FullAccess);
        let principal = seed(&store, &["HR"]);
        let builder = SessionBuilder::new(store.clone());
        let state = builder.build(SessionRequest::SignIn(&principal)).await?;
        assert!(!state.overrides().is_empty());

        // A populated cache for the same role set is kept as is.
        store.upsert_override(Role::Hr, Module::Accounting, PermissionLevel::ViewAccess);
        let refreshed = builder.build(SessionRequest::Refresh(&state)).await?;
        assert_eq!(refreshed.overrides(), state.overrides());
        assert_eq!(refreshed.overrides().get(Role::Hr, Module::Accounting), None);
        Ok(())
    }

    #[tokio::test]
    async fn refresh_reloads_an_empty_override_cache() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let principal = seed(&store, &["ACCOUNTING"]);
        let builder = SessionBuilder::new(store.clone());
        let state = builder.build(SessionRequest::SignIn(&principal)).await?;
        assert!(state.overrides().is_empty());

        store.upsert_override(Role::Accounting, Module::Documents, PermissionLevel::EditAccess);
        let refreshed = builder.build(SessionRequest::Refresh(&state)).await?;
        assert_eq!(
            refreshed.overrides().get(Role::Accounting, Module::Documents),
            Some(PermissionLevel::EditAccess)
        );
        Ok(())
    }

    #[tokio::test]
    async fn role_change_reloads_overrides() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        store.upsert_override(Role::Hr, Module::Accounting, PermissionLevel::FullAccess);
        let principal = seed(&store, &["HR"]);
        let builder = SessionBuilder::new(store.clone());
        let state = builder.build(SessionRequest::SignIn(&principal)).await?;
        assert!(state.overrides().get(Role::Hr, Module::Accounting).is_some());

        store.set_roles(principal.id, &["STAFF"]);
        let refreshed = builder.build(SessionRequest::Refresh(&state)).await?;
        assert_eq!(refreshed.roles(), &[Role::Staff]);
        assert!(refreshed.overrides().is_loaded_for(&[Role::Staff]));
        assert_eq!(refreshed.overrides().get(Role::Hr, Module::Accounting), None);
        Ok(())
    }

    #[tokio::test]
    async fn stale_override_cache_is_reloaded() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        store.upsert_override(Role::Hr, Module::Accounting, PermissionLevel::ViewAccess);
        let principal = seed(&store, &["HR"]);
        let state = SessionState::rehydrate(
            principal.id,
            principal.email.clone(),
            principal.name.clone(),
            &["HR".to_string()],
            OverrideSet::default(),
            false,
        );

        let refreshed = SessionBuilder::new(store)
            .build(SessionRequest::Refresh(&state))
            .await?;
        assert_eq!(
            refreshed.overrides().get(Role::Hr, Module::Accounting),
            Some(PermissionLevel::ViewAccess)
        );
        Ok(())
    }

    #[tokio::test]
    async fn missing_stored_role_keeps_session_roles() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let principal = seed(&store, &["OPERATIONAL"]);
        let builder = SessionBuilder::new(store.clone());
        let state = builder.build(SessionRequest::SignIn(&principal)).await?;

        store.set_roles(principal.id, &[]);
        let refreshed = builder.build(SessionRequest::Refresh(&state)).await?;
        assert_eq!(refreshed.roles(), &[Role::Operational]);

        // A valid stored role always wins over the session's cached one.
        store.set_roles(principal.id, &["STAFF"]);
        let demoted = builder.build(SessionRequest::Refresh(&refreshed)).await?;
        assert_eq!(demoted.roles(), &[Role::Staff]);
        Ok(())
    }

    #[tokio::test]
    async fn refresh_rereads_the_admin_flag() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let principal = seed(&store, &["STAFF"]);
        let builder = SessionBuilder::new(store.clone());
        let state = builder.build(SessionRequest::SignIn(&principal)).await?;
        assert!(!state.is_system_admin());

        store.set_system_admin(principal.id, true);
        let refreshed = builder.build(SessionRequest::Refresh(&state)).await?;
        assert!(refreshed.is_system_admin());
        Ok(())
    }

    #[tokio::test]
    async fn refresh_fails_closed_when_store_is_down() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let principal = seed(&store, &["DIRECTOR"]);
        let builder = SessionBuilder::new(store.clone());
        let state = builder.build(SessionRequest::SignIn(&principal)).await?;

        store.set_available(false);
        assert_eq!(
            builder.build(SessionRequest::Refresh(&state)).await,
            Err(SessionError::StorageUnavailable)
        );
        assert_eq!(
            builder.build(SessionRequest::SignIn(&principal)).await,
            Err(SessionError::StorageUnavailable)
        );
        Ok(())
    }

    #[tokio::test]
    async fn refresh_of_deleted_principal_is_rejected() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let state = SessionState::rehydrate(
            Uuid::new_v4(),
            "gone@example.com".to_string(),
            "Gone".to_string(),
            &["DIRECTOR".to_string()],
            OverrideSet::default(),
            true,
        );
        assert_eq!(
            SessionBuilder::new(store)
                .build(SessionRequest::Refresh(&state))
                .await,
            Err(SessionError::PrincipalNotFound)
        );
        Ok(())
    }

    #[test]
    fn rehydrate_revalidates_token_roles() {
        let state = SessionState::rehydrate(
            Uuid::new_v4(),
            String::new(),
            String::new(),
            &["director".to_string(), "KING".to_string()],
            OverrideSet::default(),
            false,
        );
        assert_eq!(state.roles(), &[Role::Director]);

        let state = SessionState::rehydrate(
            Uuid::new_v4(),
            String::new(),
            String::new(),
            &["KING".to_string()],
            OverrideSet::default(),
            false,
        );
        assert_eq!(state.roles(), &[DEFAULT_ROLE]);
    }
}
