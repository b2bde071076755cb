//! # authsvc (Session, Bearer and OAuth2 Gateway)
//!
//! `authsvc` is a small authentication/authorization gateway. It combines three
//! protocol roles behind one router:
//!
//! - **Session login:** a form login that issues an encrypted and signed
//!   cookie carrying the username.
//! - **Bearer verification:** opaque hex tokens minted by the OAuth server and
//!   resolved through a two-index token cache.
//! - **OAuth2 authorization code:** `authorize`, `approve` and `token`
//!   endpoints for registered clients.
//!
//! ## Request Gate
//!
//! Every request outside the public prefixes passes through an ordered chain
//! of request checkers (cookie first, then bearer). The first checker that
//! yields a username wins; otherwise the caller gets a `401` with a redirect to
//! the login page.
//!
//! ## Storage
//!
//! All state lives in typed TTL caches. Without a cache directory everything
//! is kept in memory; with one, a single embedded `sled` database holds one
//! tree per logical store.

pub mod api;
pub mod authentication;
pub mod authorization;
pub mod cli;
pub mod client;
pub mod state;
pub mod store;
pub mod user;
pub mod utils;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
