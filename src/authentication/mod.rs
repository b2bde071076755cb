//! Request authentication.
//!
//! Flow Overview: the [`middleware::require_auth`] gate lets public prefixes
//! through, then asks an ordered [`RequestCheckers`] chain for a username.
//! The session cookie checker runs first and the bearer token checker second.
//! A match attaches a [`Principal`] to the request; otherwise the caller is
//! sent to the login page with a `401`.

pub mod checker;
pub mod cookie;
pub mod login;
pub mod middleware;

pub use checker::CookieChecker;
pub use cookie::{CookieCodec, CookieError, COOKIE_NAME};

use axum::http::HeaderMap;
use std::sync::Arc;

/// Decides whether a request carries valid credentials.
pub trait RequestChecker: Send + Sync {
    /// The authenticated username, or `None`.
    fn is_authenticated(&self, headers: &HeaderMap) -> Option<String>;
}

/// Ordered chain of checkers; the first username wins.
#[derive(Clone, Default)]
pub struct RequestCheckers {
    checkers: Vec<Arc<dyn RequestChecker>>,
}

impl RequestCheckers {
    /// Absent checkers are dropped so callers can pass optional mechanisms.
    #[must_use]
    pub fn new(checkers: Vec<Option<Arc<dyn RequestChecker>>>) -> Self {
        Self {
            checkers: checkers.into_iter().flatten().collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.checkers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }
}

impl RequestChecker for RequestCheckers {
    fn is_authenticated(&self, headers: &HeaderMap) -> Option<String> {
        self.checkers
            .iter()
            .find_map(|checker| {
                checker
                    .is_authenticated(headers)
                    .filter(|username| !username.is_empty())
            })
    }
}

/// Authenticated caller, attached to request extensions by the middleware.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
}
