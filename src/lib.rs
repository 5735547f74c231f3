//! # Ensaluti (Login & Session Service)
//!
//! `ensaluti` is a small authentication service: an HTML login form backed by
//! a SQLite credential store, Argon2id password hashing, server-side sessions
//! with a bounded lifetime, and per-client rate limiting on the login
//! endpoint.
//!
//! ## Credential verification
//!
//! The core of the service is [`auth::CredentialVerifier`]: given a username
//! and a candidate password it looks up the credential record with a
//! parameter-bound query, checks the candidate against the stored PHC hash,
//! and on success establishes a session. Unknown usernames and wrong
//! passwords collapse into the same failure, and a dummy hash verification
//! keeps the two cases in the same timing class.
//!
//! ## Provisioning
//!
//! Credential records are created out-of-band with `ensaluti passwd <user>`,
//! which hashes a password read from stdin and upserts the record. The
//! verification path never writes to the credential table.

pub mod auth;
pub mod cli;
pub mod ensaluti;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
