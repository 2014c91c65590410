//! Credential authentication.
//!
//! Flow Overview:
//! 1) Reject empty input with the generic failure.
//! 2) Throttle by `login:<normalized identifier>` before touching the store.
//! 3) Look up the principal and verify the secret with Argon2.
//! 4) Resolve the principal's roles and return the authenticated principal.
//!
//! Security boundaries: unknown identifiers, missing hashes and wrong secrets
//! all produce the same `InvalidCredentials`, and all pay one Argon2
//! verification. Rate limiting is reported distinctly but is decided before
//! the store is consulted, so it cannot reveal whether an account exists.

use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use super::{
    error::AuthFailure,
    password::{verify_dummy, verify_password},
    rate_limit::RateLimiter,
    role::{Role, RoleSource, resolve_roles},
    store::{CredentialStore, with_deadline},
};

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(3);

/// Principal returned by a successful authentication, with normalized roles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedPrincipal {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    /// Non-empty; the first entry is the primary role.
    pub roles: Vec<Role>,
    pub is_system_admin: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct LoginThrottle {
    max_attempts: u32,
    window: Duration,
}

impl Default for LoginThrottle {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            window: DEFAULT_WINDOW,
        }
    }
}

impl LoginThrottle {
    #[must_use]
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }
}

/// Normalize a login identifier for lookup and rate limiting.
#[must_use]
pub fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

#[must_use]
pub fn login_rate_key(identifier: &str) -> String {
    format!("login:{}", normalize_identifier(identifier))
}

pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
    limiter: Arc<dyn RateLimiter>,
    throttle: LoginThrottle,
    store_timeout: Duration,
}

impl Authenticator {
    pub fn new(store: Arc<dyn CredentialStore>, limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            store,
            limiter,
            throttle: LoginThrottle::default(),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_throttle(mut self, throttle: LoginThrottle) -> Self {
        self.throttle = throttle;
        self
    }

    #[must_use]
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Validate an identifier/secret pair.
    ///
    /// # Errors
    /// - `InvalidCredentials` for empty input, unknown identifiers, missing hashes or wrong secrets.
    /// - `RateLimitExceeded` when the identifier exceeded its attempt budget.
    /// - `StorageUnavailable` when the store fails or times out.
    #[instrument(skip_all)]
    pub async fn authenticate(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<AuthenticatedPrincipal, AuthFailure> {
        let identifier = normalize_identifier(identifier);
        if identifier.is_empty() || secret.is_empty() {
            return Err(AuthFailure::InvalidCredentials);
        }

        let rate_key = login_rate_key(&identifier);
        if !self.limiter.allow(
            &rate_key,
            self.throttle.max_attempts(),
            self.throttle.window(),
        ) {
            info!("login attempt rate limited");
            return Err(AuthFailure::RateLimitExceeded);
        }

        let record = with_deadline(
            self.store_timeout,
            self.store.find_principal_by_identifier(&identifier),
        )
        .await
        .map_err(|err| {
            error!("Failed to lookup principal: {err}");
            AuthFailure::StorageUnavailable
        })?;

        let Some(record) = record else {
            verify_dummy(secret);
            debug!("login failed");
            return Err(AuthFailure::InvalidCredentials);
        };

        let Some(digest) = record.password_hash.as_deref() else {
            verify_dummy(secret);
            debug!("login failed");
            return Err(AuthFailure::InvalidCredentials);
        };

        if !verify_password(secret, digest) {
            debug!("login failed");
            return Err(AuthFailure::InvalidCredentials);
        }

        let resolved = resolve_roles(&[RoleSource::Principal(&record.roles)]);
        info!(principal_id = %record.id, role = %resolved.primary(), "login succeeded");

        Ok(AuthenticatedPrincipal {
            id: record.id,
            email: record.email,
            name: record.name,
            roles: resolved.into_roles(),
            is_system_admin: record.is_system_admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::{
        password::hash_password,
        rate_limit::{InMemoryRateLimiter, NoopRateLimiter},
        store::{MemoryStore, PrincipalRecord},
    };
    use anyhow::Result;

    fn principal(email: &str, secret: Option<&str>, roles: &[&str]) -> Result<PrincipalRecord> {
        Ok(PrincipalRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: "Test User".to_string(),
            password_hash: secret.map(hash_password).transpose()?,
            roles: roles.iter().map(ToString::to_string).collect(),
            is_system_admin: false,
        })
    }

    fn authenticator(store: Arc<MemoryStore>) -> Authenticator {
        Authenticator::new(store, Arc::new(NoopRateLimiter))
    }

    #[tokio::test]
    async fn valid_credentials_return_normalized_roles() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        store.insert_principal(principal("hr@example.com", Some("pw"), &[" hr "])?);

        let principal = authenticator(store)
            .authenticate("  HR@Example.com ", "pw")
            .await?;
        assert_eq!(principal.roles, vec![Role::Hr]);
        assert_eq!(principal.email, "hr@example.com");
        Ok(())
    }

    #[tokio::test]
    async fn empty_input_is_rejected_before_lookup() {
        let store = Arc::new(MemoryStore::new());
        store.set_available(false);
        let auth = authenticator(store);
        assert_eq!(
            auth.authenticate("", "pw").await,
            Err(AuthFailure::InvalidCredentials)
        );
        assert_eq!(
            auth.authenticate("a@example.com", "").await,
            Err(AuthFailure::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn unknown_and_wrong_password_are_indistinguishable() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        store.insert_principal(principal("real@example.com", Some("right"), &["STAFF"])?);
        let auth = authenticator(store);

        let ghost = auth.authenticate("ghost@example.com", "right").await;
        let wrong = auth.authenticate("real@example.com", "wrong").await;
        assert_eq!(ghost, Err(AuthFailure::InvalidCredentials));
        assert_eq!(ghost, wrong);
        if let (Err(a), Err(b)) = (ghost, wrong) {
            assert_eq!(a.to_string(), b.to_string());
        }
        Ok(())
    }

    #[tokio::test]
    async fn missing_hash_is_invalid_credentials() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        store.insert_principal(principal("nohash@example.com", None, &["STAFF"])?);
        assert_eq!(
            authenticator(store)
                .authenticate("nohash@example.com", "anything")
                .await,
            Err(AuthFailure::InvalidCredentials)
        );
        Ok(())
    }

    #[tokio::test]
    async fn storage_outage_fails_closed() {
        let store = Arc::new(MemoryStore::new());
        store.set_available(false);
        assert_eq!(
            authenticator(store)
                .authenticate("real@example.com", "pw")
                .await,
            Err(AuthFailure::StorageUnavailable)
        );
    }

    #[tokio::test]
    async fn repeated_attempts_are_rate_limited() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        store.insert_principal(principal("real@example.com", Some("right"), &["STAFF"])?);
        let limiter = Arc::new(InMemoryRateLimiter::new());
        let auth = Authenticator::new(store, limiter.clone())
            .with_throttle(LoginThrottle::new(2, Duration::from_secs(60)));

        assert!(auth.authenticate("ghost@example.com", "x").await.is_err());
        assert!(auth.authenticate("GHOST@example.com", "x").await.is_err());
        assert_eq!(
            auth.authenticate("ghost@example.com", "x").await,
            Err(AuthFailure::RateLimitExceeded)
        );
        assert_eq!(
            limiter.status("login:ghost@example.com", 2).map(|s| s.remaining),
            Some(0)
        );

        // Other identifiers keep their own budget.
        assert!(auth.authenticate("real@example.com", "right").await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn principal_without_valid_role_gets_default() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        store.insert_principal(principal("odd@example.com", Some("pw"), &["CAPTAIN"])?);
        let principal = authenticator(store)
            .authenticate("odd@example.com", "pw")
            .await?;
        assert_eq!(principal.roles, vec![Role::CrewPortal]);
        Ok(())
    }

    #[test]
    fn rate_key_is_namespaced_and_lowercased() {
        assert_eq!(login_rate_key(" Crew@Example.COM "), "login:crew@example.com");
    }
}
