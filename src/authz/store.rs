//! Credential store interface and the in-process implementation.
//!
//! The PostgreSQL implementation lives in [`super::postgres`]. [`MemoryStore`]
//! backs tests and local development; it can be switched "offline" to exercise
//! the storage-unavailable paths.

use async_trait::async_trait;
use std::{
    collections::HashMap,
    future::Future,
    sync::{
        RwLock,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use uuid::Uuid;

use super::{
    error::StoreError,
    overrides::OverrideRow,
    permission::{Module, PermissionLevel},
    role::Role,
};

/// A principal as stored. Role strings are raw and unvalidated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrincipalRecord {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub roles: Vec<String>,
    pub is_system_admin: bool,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a principal by login identifier (normalized email).
    async fn find_principal_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<PrincipalRecord>, StoreError>;

    async fn find_principal_by_id(&self, id: Uuid) -> Result<Option<PrincipalRecord>, StoreError>;

    /// Rows for the given roles only. Callers pass validated roles.
    async fn find_overrides_by_roles(&self, roles: &[Role]) -> Result<Vec<OverrideRow>, StoreError>;

    /// Connectivity probe used by `/health`.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Run a store call under a deadline; elapsing it is reported as [`StoreError::Timeout`].
///
/// # Errors
/// Returns the call's own error, or `StoreError::Timeout` when the deadline passes.
pub async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(deadline, call)
        .await
        .map_err(|_| StoreError::Timeout)?
}

#[derive(Debug, Default)]
struct MemoryState {
    principals: HashMap<Uuid, PrincipalRecord>,
    overrides: Vec<OverrideRow>,
}

/// In-process credential store.
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Toggle simulated connectivity. While unavailable every call fails.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn insert_principal(&self, record: PrincipalRecord) {
        if let Ok(mut state) = self.state.write() {
            state.principals.insert(record.id, record);
        }
    }

    /// Replace the stored roles of a principal, as an admin role change would.
    pub fn set_roles(&self, id: Uuid, roles: &[&str]) {
        if let Ok(mut state) = self.state.write() {
            if let Some(record) = state.principals.get_mut(&id) {
                record.roles = roles.iter().map(ToString::to_string).collect();
            }
        }
    }

    pub fn set_system_admin(&self, id: Uuid, is_system_admin: bool) {
        if let Ok(mut state) = self.state.write() {
            if let Some(record) = state.principals.get_mut(&id) {
                record.is_system_admin = is_system_admin;
            }
        }
    }

    /// Insert or replace the override for (role, module).
    pub fn upsert_override(&self, role: Role, module: Module, level: PermissionLevel) {
        self.upsert_override_row(OverrideRow {
            role: role.as_str().to_string(),
            module: module.as_str().to_string(),
            level: level.as_str().to_string(),
        });
    }

    /// Insert a raw row, replacing any row with the same role and module text.
    pub fn upsert_override_row(&self, row: OverrideRow) {
        if let Ok(mut state) = self.state.write() {
            state
                .overrides
                .retain(|existing| !(existing.role == row.role && existing.module == row.module));
            state.overrides.push(row);
        }
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store offline".to_string()))
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, MemoryState>, StoreError> {
        self.check_available()?;
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_principal_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<PrincipalRecord>, StoreError> {
        let state = self.read()?;
        Ok(state
            .principals
            .values()
            .find(|record| record.email.eq_ignore_ascii_case(identifier))
            .cloned())
    }

    async fn find_principal_by_id(&self, id: Uuid) -> Result<Option<PrincipalRecord>, StoreError> {
        let state = self.read()?;
        Ok(state.principals.get(&id).cloned())
    }

    async fn find_overrides_by_roles(&self, roles: &[Role]) -> Result<Vec<OverrideRow>, StoreError> {
        let state = self.read()?;
        Ok(state
            .overrides
            .iter()
            .filter(|row| roles.iter().any(|role| role.as_str() == row.role))
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    fn record(email: &str, roles: &[&str]) -> PrincipalRecord {
        PrincipalRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: "Test".to_string(),
            password_hash: None,
            roles: roles.iter().map(ToString::to_string).collect(),
            is_system_admin: false,
        }
    }

    #[tokio::test]
    async fn lookups_by_identifier_and_id() -> Result<()> {
        let store = MemoryStore::new();
        let principal = record("crew@example.com", &["CREW_PORTAL"]);
        let id = principal.id;
        store.insert_principal(principal);

        let by_email = store
            .find_principal_by_identifier("CREW@example.com")
            .await?
            .context("missing principal")?;
        assert_eq!(by_email.id, id);
        assert!(store.find_principal_by_id(id).await?.is_some());
        assert!(store.find_principal_by_id(Uuid::new_v4()).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn offline_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_available(false);
        assert!(store.find_principal_by_identifier("a@b.c").await.is_err());
        assert!(store.find_principal_by_id(Uuid::new_v4()).await.is_err());
        assert!(store.find_overrides_by_roles(&[Role::Hr]).await.is_err());
        assert!(store.ping().await.is_err());
        store.set_available(true);
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn upsert_keeps_one_row_per_pair() -> Result<()> {
        let store = MemoryStore::new();
        store.upsert_override(Role::Hr, Module::Accounting, PermissionLevel::ViewAccess);
        store.upsert_override(Role::Hr, Module::Accounting, PermissionLevel::EditAccess);
        let rows = store.find_overrides_by_roles(&[Role::Hr]).await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].level, "EDIT_ACCESS");
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_turns_slow_calls_into_timeouts() {
        let result: Result<(), StoreError> = with_deadline(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(StoreError::Timeout)));
    }
}
