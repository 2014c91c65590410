//! Auth handlers and supporting modules.
//!
//! Sessions are stateless: the derived session state is signed into a token
//! carried by the `crewgate_session` cookie (or a bearer header) and refreshed
//! against the credential store on every guarded request. Logout clears the
//! cookie; an already issued token stays valid until it expires.

pub(crate) mod guard;
pub(crate) mod login;
pub(crate) mod session;
mod state;
pub(crate) mod token;
pub(crate) mod types;

pub use state::{AuthConfig, AuthState};
pub use token::SessionTokenCodec;
