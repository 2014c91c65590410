use crate::api::{self, AuthConfig};
use anyhow::Result;
use secrecy::SecretString;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub session_secret: SecretString,
    pub session_ttl_seconds: u64,
    pub cookie_secure: bool,
    pub login_max_attempts: u32,
    pub login_window_seconds: u64,
    pub api_max_requests: u32,
    pub api_window_seconds: u64,
    pub store_timeout_ms: u64,
}

impl Args {
    fn auth_config(&self) -> AuthConfig {
        AuthConfig::new()
            .with_session_ttl_seconds(self.session_ttl_seconds)
            .with_cookie_secure(self.cookie_secure)
            .with_login_throttle(self.login_max_attempts, self.login_window_seconds)
            .with_request_throttle(self.api_max_requests, self.api_window_seconds)
            .with_store_timeout_ms(self.store_timeout_ms)
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = args.auth_config();
    debug!("Auth config: {:?}", auth_config);
    api::new(args.port, args.dsn, auth_config, args.session_secret).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn args_map_onto_auth_config() {
        let args = Args {
            port: 8080,
            dsn: "postgres://localhost/crewgate".to_string(),
            session_secret: SecretString::from("s3cret".to_string()),
            session_ttl_seconds: 900,
            cookie_secure: true,
            login_max_attempts: 7,
            login_window_seconds: 120,
            api_max_requests: 30,
            api_window_seconds: 10,
            store_timeout_ms: 500,
        };
        let config = args.auth_config();
        assert_eq!(config.session_ttl_seconds(), 900);
        assert!(config.cookie_secure());
        assert_eq!(config.throttle().max_attempts(), 7);
        assert_eq!(config.throttle().window(), Duration::from_secs(120));
        assert_eq!(config.request_throttle().max_attempts(), 30);
        assert_eq!(config.request_throttle().window(), Duration::from_secs(10));
        assert_eq!(config.store_timeout(), Duration::from_millis(500));
    }
}
