//! Map parsed CLI arguments to the action to run.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_DSN, ARG_PORT, session};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;

    let session_opts = session::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        session_secret: session_opts.session_secret,
        session_ttl_seconds: session_opts.session_ttl_seconds,
        cookie_secure: session_opts.cookie_secure,
        login_max_attempts: session_opts.login_max_attempts,
        login_window_seconds: session_opts.login_window_seconds,
        api_max_requests: session_opts.api_max_requests,
        api_window_seconds: session_opts.api_window_seconds,
        store_timeout_ms: session_opts.store_timeout_ms,
    }))
}
