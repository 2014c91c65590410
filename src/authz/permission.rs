//! Permission levels, modules and the static permission matrix.
//!
//! The matrix ships with the binary and is never persisted. Any (role, module)
//! pair it does not list is `NO_ACCESS`. Overrides stored in the database can
//! raise or lower these defaults per role.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;

use super::role::Role;

/// Ordinal access tier. Variant order defines the comparison order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionLevel {
    NoAccess = 0,
    ViewAccess = 1,
    EditAccess = 2,
    FullAccess = 3,
}

impl PermissionLevel {
    pub const ALL: [Self; 4] = [
        Self::NoAccess,
        Self::ViewAccess,
        Self::EditAccess,
        Self::FullAccess,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoAccess => "NO_ACCESS",
            Self::ViewAccess => "VIEW_ACCESS",
            Self::EditAccess => "EDIT_ACCESS",
            Self::FullAccess => "FULL_ACCESS",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission level: {0}")]
pub struct UnknownLevel(pub String);

impl FromStr for PermissionLevel {
    type Err = UnknownLevel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == normalized)
            .ok_or_else(|| UnknownLevel(value.to_string()))
    }
}

/// Functional areas of the application gated by permissions.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "camelCase")]
pub enum Module {
    Dashboard,
    Crew,
    Principals,
    Contracts,
    Applications,
    Assignments,
    Vessels,
    Documents,
    Medical,
    Visas,
    AgencyFees,
    Accounting,
    WageScales,
    AgencyAgreements,
    Disciplinary,
    Quality,
    NationalHolidays,
    Compliance,
    Crewing,
    Insurance,
    Dispatches,
    Pkl,
    Hr,
    Admin,
}

impl Module {
    pub const ALL: [Self; 24] = [
        Self::Dashboard,
        Self::Crew,
        Self::Principals,
        Self::Contracts,
        Self::Applications,
        Self::Assignments,
        Self::Vessels,
        Self::Documents,
        Self::Medical,
        Self::Visas,
        Self::AgencyFees,
        Self::Accounting,
        Self::WageScales,
        Self::AgencyAgreements,
        Self::Disciplinary,
        Self::Quality,
        Self::NationalHolidays,
        Self::Compliance,
        Self::Crewing,
        Self::Insurance,
        Self::Dispatches,
        Self::Pkl,
        Self::Hr,
        Self::Admin,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Crew => "crew",
            Self::Principals => "principals",
            Self::Contracts => "contracts",
            Self::Applications => "applications",
            Self::Assignments => "assignments",
            Self::Vessels => "vessels",
            Self::Documents => "documents",
            Self::Medical => "medical",
            Self::Visas => "visas",
            Self::AgencyFees => "agencyFees",
            Self::Accounting => "accounting",
            Self::WageScales => "wageScales",
            Self::AgencyAgreements => "agencyAgreements",
            Self::Disciplinary => "disciplinary",
            Self::Quality => "quality",
            Self::NationalHolidays => "nationalHolidays",
            Self::Compliance => "compliance",
            Self::Crewing => "crewing",
            Self::Insurance => "insurance",
            Self::Dispatches => "dispatches",
            Self::Pkl => "pkl",
            Self::Hr => "hr",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown module: {0}")]
pub struct UnknownModule(pub String);

impl FromStr for Module {
    type Err = UnknownModule;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|module| module.as_str() == trimmed)
            .ok_or_else(|| UnknownModule(value.to_string()))
    }
}

/// Default level for `role` on `module`.
#[must_use]
pub const fn matrix_default(role: Role, module: Module) -> PermissionLevel {
    use Module as M;
    use PermissionLevel::{EditAccess as Edit, FullAccess as Full, NoAccess as No, ViewAccess as View};

    match role {
        Role::Director => Full,
        Role::Cdmo => match module {
            M::Vessels
            | M::WageScales
            | M::Quality
            | M::NationalHolidays
            | M::Hr => View,
            M::Medical | M::Disciplinary | M::Insurance => Edit,
            M::Accounting | M::Admin => No,
            _ => Full,
        },
        Role::Operational => match module {
            M::Dashboard | M::Vessels | M::Dispatches => Full,
            M::Documents | M::Visas | M::Quality | M::Crewing | M::Pkl => Edit,
            M::Crew
            | M::Principals
            | M::Contracts
            | M::Applications
            | M::Assignments
            | M::AgencyAgreements
            | M::Disciplinary
            | M::NationalHolidays
            | M::Compliance
            | M::Insurance => View,
            _ => No,
        },
        Role::Accounting => match module {
            M::Dashboard | M::Contracts | M::AgencyFees | M::Accounting | M::WageScales => Full,
            M::AgencyAgreements => Edit,
            M::Crew
            | M::Principals
            | M::Vessels
            | M::Documents
            | M::NationalHolidays
            | M::Crewing
            | M::Insurance
            | M::Dispatches
            | M::Pkl => View,
            _ => No,
        },
        Role::Hr => match module {
            M::Dashboard
            | M::Medical
            | M::Disciplinary
            | M::Quality
            | M::NationalHolidays
            | M::Hr => Full,
            M::Crew
            | M::Applications
            | M::Assignments
            | M::Documents
            | M::Visas
            | M::Compliance
            | M::Crewing
            | M::Insurance
            | M::Pkl => Edit,
            M::Principals
            | M::Contracts
            | M::Vessels
            | M::WageScales
            | M::AgencyAgreements
            | M::Dispatches => View,
            _ => No,
        },
        Role::CrewPortal => match module {
            M::Dashboard
            | M::Crew
            | M::Vessels
            | M::Documents
            | M::Medical
            | M::Visas
            | M::NationalHolidays
            | M::Compliance
            | M::Crewing
            | M::Insurance
            | M::Pkl => View,
            _ => No,
        },
        Role::HrAdmin | Role::Qmr | Role::SectionHead | Role::Staff | Role::Crew => No,
    }
}

/// Data sensitivity classes attached to records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataSensitivity {
    /// Highly sensitive: medical, full sea service, salary breakdown.
    Red,
    /// Sensitive: personal data, disciplinary cases.
    Amber,
    /// Internal.
    Green,
}

/// Whether `role` is cleared for data of the given sensitivity.
///
/// Crew portal clearance only covers the principal's own records; callers
/// pair it with the self-access rule.
#[must_use]
pub const fn sensitivity_clearance(role: Role, sensitivity: DataSensitivity) -> bool {
    match (role, sensitivity) {
        (_, DataSensitivity::Green) => true,
        (Role::Director | Role::Cdmo | Role::Hr | Role::CrewPortal, _) => true,
        (Role::Operational | Role::Accounting, DataSensitivity::Amber) => true,
        _ => false,
    }
}
