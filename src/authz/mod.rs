//! Role & permission resolution engine.
//!
//! Data flow: [`authenticate::Authenticator`] validates credentials and resolves
//! roles, [`session::SessionBuilder`] composes roles, overrides and the admin
//! flag into a [`session::SessionState`], and [`evaluator`] answers access
//! questions against that state. Every stage fails closed.

pub mod authenticate;
pub mod error;
pub mod evaluator;
pub mod overrides;
pub mod password;
pub mod permission;
pub mod postgres;
pub mod rate_limit;
pub mod role;
pub mod session;
pub mod store;

pub use authenticate::{AuthenticatedPrincipal, Authenticator, LoginThrottle};
pub use error::{AuthFailure, SessionError, StoreError};
pub use evaluator::{
    accessible_modules, can_access_data, can_access_principal_data, check_permission,
    effective_level, has_any_role,
};
pub use overrides::{OverrideSet, PermissionOverride};
pub use permission::{DataSensitivity, Module, PermissionLevel};
pub use rate_limit::{InMemoryRateLimiter, NoopRateLimiter, RateLimiter};
pub use role::{Role, RoleSource, resolve_roles};
pub use session::{SessionBuilder, SessionRequest, SessionState};
pub use store::{CredentialStore, MemoryStore, PrincipalRecord};
