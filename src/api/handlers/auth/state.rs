//! Auth state and configuration shared by the handlers.

use secrecy::SecretString;
use std::{sync::Arc, time::Duration};

use super::token::SessionTokenCodec;
use crate::authz::{
    Authenticator, CredentialStore, LoginThrottle, RateLimiter, SessionBuilder,
};

const DEFAULT_SESSION_TTL_SECONDS: u64 = 12 * 60 * 60;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_REQUEST_MAX: u32 = 60;
const DEFAULT_REQUEST_WINDOW_SECONDS: u64 = 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    session_ttl_seconds: u64,
    cookie_secure: bool,
    throttle: LoginThrottle,
    request_throttle: LoginThrottle,
    store_timeout_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            cookie_secure: false,
            throttle: LoginThrottle::default(),
            request_throttle: LoginThrottle::new(
                DEFAULT_REQUEST_MAX,
                Duration::from_secs(DEFAULT_REQUEST_WINDOW_SECONDS),
            ),
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn with_login_throttle(mut self, max_attempts: u32, window_seconds: u64) -> Self {
        self.throttle = LoginThrottle::new(max_attempts, Duration::from_secs(window_seconds));
        self
    }

    /// Per-principal budget for session-guarded requests.
    #[must_use]
    pub fn with_request_throttle(mut self, max_requests: u32, window_seconds: u64) -> Self {
        self.request_throttle =
            LoginThrottle::new(max_requests, Duration::from_secs(window_seconds));
        self
    }

    #[must_use]
    pub fn with_store_timeout_ms(mut self, millis: u64) -> Self {
        self.store_timeout_ms = millis;
        self
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> u64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }

    #[must_use]
    pub fn throttle(&self) -> LoginThrottle {
        self.throttle
    }

    #[must_use]
    pub fn request_throttle(&self) -> LoginThrottle {
        self.request_throttle
    }

    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

pub struct AuthState {
    config: AuthConfig,
    store: Arc<dyn CredentialStore>,
    limiter: Arc<dyn RateLimiter>,
    authenticator: Authenticator,
    sessions: SessionBuilder,
    codec: SessionTokenCodec,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn CredentialStore>,
        limiter: Arc<dyn RateLimiter>,
        session_secret: &SecretString,
    ) -> Self {
        let authenticator = Authenticator::new(store.clone(), limiter.clone())
            .with_throttle(config.throttle())
            .with_store_timeout(config.store_timeout());
        let sessions = SessionBuilder::new(store.clone()).with_store_timeout(config.store_timeout());
        let codec = SessionTokenCodec::new(
            session_secret,
            Duration::from_secs(config.session_ttl_seconds()),
        );
        Self {
            config,
            store,
            limiter,
            authenticator,
            sessions,
            codec,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn store(&self) -> &dyn CredentialStore {
        self.store.as_ref()
    }

    pub(crate) fn limiter(&self) -> &dyn RateLimiter {
        self.limiter.as_ref()
    }

    pub(crate) fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub(crate) fn sessions(&self) -> &SessionBuilder {
        &self.sessions
    }

    pub(crate) fn codec(&self) -> &SessionTokenCodec {
        &self.codec
    }
}
