//! Signed session transport.
//!
//! The session state travels between requests as an HS256 JWT. A token that
//! fails signature or expiry validation is treated as "no session". Role names
//! read back from a token are validated again before use.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::authz::{OverrideSet, SessionState};

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: Uuid,
    email: String,
    name: String,
    roles: Vec<String>,
    admin: bool,
    overrides: OverrideSet,
    iat: u64,
    exp: u64,
}

pub struct SessionTokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl SessionTokenCodec {
    #[must_use]
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let key = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
            ttl,
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign `state` into a token valid for the configured TTL.
    ///
    /// # Errors
    /// Returns an error if the claims cannot be serialized or signed.
    pub fn encode(&self, state: &SessionState) -> Result<String, jsonwebtoken::errors::Error> {
        self.encode_at(state, jsonwebtoken::get_current_timestamp())
    }

    fn encode_at(
        &self,
        state: &SessionState,
        issued_at: u64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = SessionClaims {
            sub: state.principal_id(),
            email: state.email().to_string(),
            name: state.name().to_string(),
            roles: state
                .roles()
                .iter()
                .map(|role| role.as_str().to_string())
                .collect(),
            admin: state.is_system_admin(),
            overrides: state.overrides().clone(),
            iat: issued_at,
            exp: issued_at.saturating_add(self.ttl.as_secs()),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// Verify and rehydrate a token; any failure yields `None`.
    #[must_use]
    pub fn decode(&self, token: &str) -> Option<SessionState> {
        match decode::<SessionClaims>(token, &self.decoding, &self.validation) {
            Ok(data) => {
                let claims = data.claims;
                Some(SessionState::rehydrate(
                    claims.sub,
                    claims.email,
                    claims.name,
                    &claims.roles,
                    claims.overrides,
                    claims.admin,
                ))
            }
            Err(err) => {
                debug!("Rejected session token: {err}");
                None
            }
        }
    }
}
