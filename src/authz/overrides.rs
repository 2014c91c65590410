//! Per-role permission overrides.
//!
//! Overrides are read-heavy, write-rare rows that supersede the static matrix
//! for a single (role, module) pair. A loaded [`OverrideSet`] remembers the
//! role set it was loaded for; that role set is the cache key used by the
//! session builder to decide whether a reload is needed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use utoipa::ToSchema;

use super::{
    error::StoreError,
    permission::{Module, PermissionLevel},
    role::Role,
    store::CredentialStore,
};

/// A persisted (role, module) -> level record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PermissionOverride {
    pub role: Role,
    pub module: Module,
    pub level: PermissionLevel,
}

/// Raw override row as stored. Strings are validated in [`OverrideSet::from_rows`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverrideRow {
    pub role: String,
    pub module: String,
    pub level: String,
}

/// Overrides loaded for a specific role set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideSet {
    loaded_for: Vec<Role>,
    entries: Vec<PermissionOverride>,
}

impl OverrideSet {
    /// Build a set from validated overrides, keeping one level per (role, module).
    /// Later entries win; overrides for roles outside `loaded_for` are ignored.
    #[must_use]
    pub fn new(loaded_for: &[Role], overrides: impl IntoIterator<Item = PermissionOverride>) -> Self {
        let mut by_pair: BTreeMap<(Role, Module), PermissionLevel> = BTreeMap::new();
        for entry in overrides {
            if loaded_for.contains(&entry.role) {
                by_pair.insert((entry.role, entry.module), entry.level);
            }
        }
        Self {
            loaded_for: loaded_for.to_vec(),
            entries: by_pair
                .into_iter()
                .map(|((role, module), level)| PermissionOverride {
                    role,
                    module,
                    level,
                })
                .collect(),
        }
    }

    /// Validate raw rows, skipping any that name an unknown role, module or level.
    #[must_use]
    pub fn from_rows(loaded_for: &[Role], rows: Vec<OverrideRow>) -> Self {
        let parsed = rows.into_iter().filter_map(|row| {
            let role = row.role.trim().to_uppercase().parse::<Role>();
            let module = row.module.parse::<Module>();
            let level = row.level.parse::<PermissionLevel>();
            match (role, module, level) {
                (Ok(role), Ok(module), Ok(level)) => Some(PermissionOverride {
                    role,
                    module,
                    level,
                }),
                _ => {
                    warn!(
                        role = %row.role,
                        module = %row.module,
                        level = %row.level,
                        "skipping invalid permission override row"
                    );
                    None
                }
            }
        });
        Self::new(loaded_for, parsed)
    }

    /// Role set these overrides were loaded for.
    #[must_use]
    pub fn loaded_for(&self) -> &[Role] {
        &self.loaded_for
    }

    /// True when this set can be reused for `roles` without reloading.
    #[must_use]
    pub fn is_loaded_for(&self, roles: &[Role]) -> bool {
        self.loaded_for == roles
    }

    #[must_use]
    pub fn get(&self, role: Role, module: Module) -> Option<PermissionLevel> {
        self.entries
            .iter()
            .find(|entry| entry.role == role && entry.module == module)
            .map(|entry| entry.level)
    }

    #[must_use]
    pub fn entries(&self) -> &[PermissionOverride] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Load every override whose role is in `roles`.
///
/// # Errors
/// Returns [`StoreError`] if the credential store cannot be reached.
pub async fn load_overrides(
    store: &dyn CredentialStore,
    roles: &[Role],
) -> Result<OverrideSet, StoreError> {
    if roles.is_empty() {
        return Ok(OverrideSet::new(roles, Vec::new()));
    }
    let rows = store.find_overrides_by_roles(roles).await?;
    let set = OverrideSet::from_rows(roles, rows);
    debug!(
        roles = ?roles,
        overrides = set.entries().len(),
        "loaded permission overrides"
    );
    Ok(set)
}
