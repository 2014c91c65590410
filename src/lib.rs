//! # Crewgate (role & permission resolution)
//!
//! `crewgate` turns credentials into per-request authorization decisions for a
//! crew, HR and compliance management application.
//!
//! ## Permission model
//!
//! Every role has a static default level on every module (`NO_ACCESS` <
//! `VIEW_ACCESS` < `EDIT_ACCESS` < `FULL_ACCESS`). Per-role overrides stored in
//! `role_permission_overrides` supersede the default for a single module. A
//! session's effective level is the highest level granted by any of its roles;
//! system administrators get `FULL_ACCESS` everywhere.
//!
//! ## Sessions
//!
//! The derived session state is signed into a token and refreshed against the
//! credential store on each guarded request. Overrides are cached per role set
//! and reloaded whenever the role set changes or the cached set is empty.
//!
//! ## Failure policy
//!
//! Every path fails closed: an unreachable store, an unknown role or a
//! missing session never yields access. Login failures never reveal whether
//! an account exists.

pub mod api;
pub mod authz;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
