//! HTTP handlers: health, login/session/logout and permission guards.

pub mod auth;
pub mod health;
pub mod permissions;
