//! # Passwordless
//!
//! Passwordless authentication: a user proves identity by receiving a
//! single-use secret out of band (usually a link by email) that the server
//! exchanges for a cookie session.
//!
//! ## Token Lifecycle
//!
//! [`token::TokenService`] issues `identifier-secret` strings, stores only an
//! Argon2id hash of the secret, and validates presented strings against the
//! newest unexpired record for the identifier and scope. Single use is
//! deletion; there is no "used" flag.
//!
//! ## Sessions
//!
//! [`session::SessionCookieAuth`] issues a long-lived `auth` token into the
//! `auth_token` cookie and checks it on every request without consuming it.
//! [`session::require_session`] is the axum middleware that turns a missing or
//! rejected cookie into `401 Unauthorized`.
//!
//! ## Housekeeping
//!
//! [`sweeper::ExpirySweeper`] deletes expired records on a fixed interval. It
//! is hygiene, not security: expired tokens never validate.

pub mod api;
pub mod cli;
pub mod session;
pub mod sweeper;
pub mod token;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
