//! Roles and role resolution.
//!
//! Flow Overview: role strings arrive from loosely typed places (the users
//! table, a session token, a freshly authenticated principal). They are
//! normalized and parsed into [`Role`] here, at the boundary, and nowhere else.
//! Resolution walks an explicit, ordered list of sources and always yields at
//! least one role.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::warn;
use utoipa::ToSchema;

/// Least-privileged role applied when no source yields a valid role.
pub const DEFAULT_ROLE: Role = Role::CrewPortal;

/// Closed set of application roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Director,
    Cdmo,
    Operational,
    Accounting,
    Hr,
    HrAdmin,
    Qmr,
    SectionHead,
    Staff,
    Crew,
    CrewPortal,
}

/// Whether a role belongs to office staff or to seafarers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleCategory {
    Office,
    Crew,
}

impl Role {
    pub const ALL: [Self; 11] = [
        Self::Director,
        Self::Cdmo,
        Self::Operational,
        Self::Accounting,
        Self::Hr,
        Self::HrAdmin,
        Self::Qmr,
        Self::SectionHead,
        Self::Staff,
        Self::Crew,
        Self::CrewPortal,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Director => "DIRECTOR",
            Self::Cdmo => "CDMO",
            Self::Operational => "OPERATIONAL",
            Self::Accounting => "ACCOUNTING",
            Self::Hr => "HR",
            Self::HrAdmin => "HR_ADMIN",
            Self::Qmr => "QMR",
            Self::SectionHead => "SECTION_HEAD",
            Self::Staff => "STAFF",
            Self::Crew => "CREW",
            Self::CrewPortal => "CREW_PORTAL",
        }
    }

    #[must_use]
    pub const fn category(self) -> RoleCategory {
        match self {
            Self::Crew | Self::CrewPortal => RoleCategory::Crew,
            _ => RoleCategory::Office,
        }
    }

    /// Landing route for a principal whose primary role is `self`.
    #[must_use]
    pub const fn home_route(self) -> &'static str {
        match self.category() {
            RoleCategory::Crew => "/m/crew",
            RoleCategory::Office => "/dashboard",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    /// Parses an already normalized (trimmed, uppercased) role name.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == value)
            .ok_or_else(|| UnknownRole(value.to_string()))
    }
}

/// Candidate role strings, listed by the caller in priority order.
#[derive(Clone, Copy, Debug)]
pub enum RoleSource<'a> {
    /// Roles attached to a freshly authenticated principal.
    Principal(&'a [String]),
    /// Roles cached in an existing session token.
    Token(&'a [String]),
    /// Role read by principal id from the credential store.
    Store(&'a [String]),
}

impl<'a> RoleSource<'a> {
    fn values(self) -> &'a [String] {
        match self {
            Self::Principal(values) | Self::Token(values) | Self::Store(values) => values,
        }
    }
}

/// Non-empty, deduplicated role list. The first entry is the primary role.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedRoles {
    roles: Vec<Role>,
    fell_back: bool,
}

impl ResolvedRoles {
    #[must_use]
    pub fn primary(&self) -> Role {
        // Construction guarantees at least one entry.
        self.roles.first().copied().unwrap_or(DEFAULT_ROLE)
    }

    #[must_use]
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    #[must_use]
    pub fn into_roles(self) -> Vec<Role> {
        self.roles
    }

    /// True when no source produced a valid role and the default was applied.
    #[must_use]
    pub fn fell_back(&self) -> bool {
        self.fell_back
    }
}

/// Trim and uppercase a raw role string; empty input yields `None`.
#[must_use]
pub fn normalize_role(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}

/// Resolve a non-empty role set from ordered sources.
///
/// Values from every source are collected in order, normalized, deduplicated
/// (first occurrence wins) and parsed into [`Role`]. Unknown names are dropped
/// before they can reach any query. If nothing survives, [`DEFAULT_ROLE`] is
/// applied and a role resolution anomaly is logged.
#[must_use]
pub fn resolve_roles(sources: &[RoleSource<'_>]) -> ResolvedRoles {
    let mut roles: Vec<Role> = Vec::new();
    let mut unknown: Vec<String> = Vec::new();

    for value in sources.iter().flat_map(|source| source.values()) {
        let Some(normalized) = normalize_role(value) else {
            continue;
        };
        match normalized.parse::<Role>() {
            Ok(role) => {
                if !roles.contains(&role) {
                    roles.push(role);
                }
            }
            Err(UnknownRole(name)) => {
                if !unknown.contains(&name) {
                    unknown.push(name);
                }
            }
        }
    }

    if !unknown.is_empty() {
        warn!(unknown_roles = ?unknown, "dropping role names outside the known role set");
    }

    if roles.is_empty() {
        warn!(
            anomaly = "role_resolution",
            unknown_roles = ?unknown,
            default_role = %DEFAULT_ROLE,
            "no valid role resolved, applying default role"
        );
        return ResolvedRoles {
            roles: vec![DEFAULT_ROLE],
            fell_back: true,
        };
    }

    ResolvedRoles {
        roles,
        fell_back: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn role_names_round_trip_through_from_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert!("ADMIRAL".parse::<Role>().is_err());
    }

    #[test]
    fn resolve_dedupes_case_variants() {
        let raw = strings(&["director", "DIRECTOR", "Director"]);
        let resolved = resolve_roles(&[RoleSource::Principal(&raw)]);
        assert_eq!(resolved.roles(), &[Role::Director]);
        assert!(!resolved.fell_back());
    }

    #[test]
    fn resolve_without_sources_yields_default() {
        let resolved = resolve_roles(&[]);
        assert_eq!(resolved.roles(), &[Role::CrewPortal]);
        assert_eq!(resolved.primary(), Role::CrewPortal);
        assert!(resolved.fell_back());
    }

    #[test]
    fn resolve_preserves_first_seen_order_across_sources() {
        let principal = strings(&[" hr ", ""]);
        let token = strings(&["accounting", "HR"]);
        let store = strings(&["Director"]);
        let resolved = resolve_roles(&[
            RoleSource::Principal(&principal),
            RoleSource::Token(&token),
            RoleSource::Store(&store),
        ]);
        assert_eq!(
            resolved.roles(),
            &[Role::Hr, Role::Accounting, Role::Director]
        );
        assert_eq!(resolved.primary(), Role::Hr);
    }

    #[test]
    fn resolve_is_idempotent() {
        let raw = strings(&["qmr", "staff", "QMR"]);
        let first = resolve_roles(&[RoleSource::Token(&raw)]);
        let again: Vec<String> = first.roles().iter().map(ToString::to_string).collect();
        let second = resolve_roles(&[RoleSource::Token(&again)]);
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_only_source_falls_through_to_default() {
        let raw = strings(&["CAPTAIN"]);
        let resolved = resolve_roles(&[RoleSource::Store(&raw)]);
        assert_eq!(resolved.roles(), &[Role::CrewPortal]);
        assert!(resolved.fell_back());
    }

    #[test]
    fn unknown_names_are_dropped_next_to_valid_ones() {
        let raw = strings(&["CAPTAIN", "cdmo"]);
        let resolved = resolve_roles(&[RoleSource::Principal(&raw)]);
        assert_eq!(resolved.roles(), &[Role::Cdmo]);
        assert!(!resolved.fell_back());
    }

    #[test]
    fn categories_and_home_routes() {
        assert_eq!(Role::Crew.category(), RoleCategory::Crew);
        assert_eq!(Role::CrewPortal.home_route(), "/m/crew");
        assert_eq!(Role::Accounting.category(), RoleCategory::Office);
        assert_eq!(Role::Qmr.home_route(), "/dashboard");
    }

    #[test]
    fn role_serializes_as_screaming_snake_case() -> anyhow::Result<()> {
        let value = serde_json::to_value(Role::SectionHead)?;
        assert_eq!(value, serde_json::json!("SECTION_HEAD"));
        let decoded: Role = serde_json::from_value(serde_json::json!("CREW_PORTAL"))?;
        assert_eq!(decoded, Role::CrewPortal);
        Ok(())
    }
}
