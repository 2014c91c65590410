//! Session, login throttling and store deadline arguments.

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_SESSION_SECRET: &str = "session-secret";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";
pub const ARG_LOGIN_MAX_ATTEMPTS: &str = "login-max-attempts";
pub const ARG_LOGIN_WINDOW_SECONDS: &str = "login-window-seconds";
pub const ARG_STORE_TIMEOUT_MS: &str = "store-timeout-ms";
pub const ARG_API_MAX_REQUESTS: &str = "api-max-requests";
pub const ARG_API_WINDOW_SECONDS: &str = "api-window-seconds";

#[derive(Debug)]
pub struct Options {
    pub session_secret: SecretString,
    pub session_ttl_seconds: u64,
    pub cookie_secure: bool,
    pub login_max_attempts: u32,
    pub login_window_seconds: u64,
    pub api_max_requests: u32,
    pub api_window_seconds: u64,
    pub store_timeout_ms: u64,
}

impl Options {
    /// # Errors
    /// Returns an error if the session secret is missing or empty.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let session_secret = matches
            .get_one::<String>(ARG_SESSION_SECRET)
            .filter(|secret| !secret.is_empty())
            .cloned()
            .context("missing required argument: --session-secret")?;

        Ok(Self {
            session_secret: SecretString::from(session_secret),
            session_ttl_seconds: matches
                .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(43_200),
            cookie_secure: matches.get_flag(ARG_COOKIE_SECURE),
            login_max_attempts: matches
                .get_one::<u32>(ARG_LOGIN_MAX_ATTEMPTS)
                .copied()
                .unwrap_or(5),
            login_window_seconds: matches
                .get_one::<u64>(ARG_LOGIN_WINDOW_SECONDS)
                .copied()
                .unwrap_or(60),
            api_max_requests: matches
                .get_one::<u32>(ARG_API_MAX_REQUESTS)
                .copied()
                .unwrap_or(60),
            api_window_seconds: matches
                .get_one::<u64>(ARG_API_WINDOW_SECONDS)
                .copied()
                .unwrap_or(60),
            store_timeout_ms: matches
                .get_one::<u64>(ARG_STORE_TIMEOUT_MS)
                .copied()
                .unwrap_or(3_000),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_session_args(command);
    with_throttle_args(command)
}

fn with_session_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_SECRET)
                .long(ARG_SESSION_SECRET)
                .help("Secret used to sign session tokens")
                .env("CREWGATE_SESSION_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session token and cookie TTL in seconds")
                .env("CREWGATE_SESSION_TTL_SECONDS")
                .default_value("43200")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Mark the session cookie Secure (HTTPS only)")
                .env("CREWGATE_COOKIE_SECURE")
                .action(ArgAction::SetTrue),
        )
}

fn with_throttle_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_LOGIN_MAX_ATTEMPTS)
                .long(ARG_LOGIN_MAX_ATTEMPTS)
                .help("Login attempts allowed per identifier within one window")
                .env("CREWGATE_LOGIN_MAX_ATTEMPTS")
                .default_value("5")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_LOGIN_WINDOW_SECONDS)
                .long(ARG_LOGIN_WINDOW_SECONDS)
                .help("Login rate limit window in seconds")
                .env("CREWGATE_LOGIN_WINDOW_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_API_MAX_REQUESTS)
                .long(ARG_API_MAX_REQUESTS)
                .help("Session-guarded requests allowed per principal within one window")
                .env("CREWGATE_API_MAX_REQUESTS")
                .default_value("60")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_API_WINDOW_SECONDS)
                .long(ARG_API_WINDOW_SECONDS)
                .help("Request rate limit window in seconds")
                .env("CREWGATE_API_WINDOW_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_STORE_TIMEOUT_MS)
                .long(ARG_STORE_TIMEOUT_MS)
                .help("Deadline for each credential store call in milliseconds")
                .env("CREWGATE_STORE_TIMEOUT_MS")
                .default_value("3000")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
