//! Password verification strategies.
//!
//! Each checker requires a non-empty username and password, an active user
//! and a non-empty stored password before comparing anything.

use super::{User, UserRegistry};
use subtle::ConstantTimeEq;
use tracing::debug;

pub trait PasswordChecker: Send + Sync {
    fn is_authenticated(&self, username: &str, password: &str) -> bool;
}

/// Ordered chain: the first checker that accepts wins.
#[derive(Default)]
pub struct PasswordCheckers {
    checkers: Vec<Box<dyn PasswordChecker>>,
}

impl PasswordCheckers {
    #[must_use]
    pub fn new(checkers: Vec<Box<dyn PasswordChecker>>) -> Self {
        Self { checkers }
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

impl PasswordChecker for PasswordCheckers {
    fn is_authenticated(&self, username: &str, password: &str) -> bool {
        self.checkers
            .iter()
            .any(|checker| checker.is_authenticated(username, password))
    }
}

fn candidate(registry: &UserRegistry, username: &str, password: &str) -> Option<User> {
    if username.is_empty() || password.is_empty() {
        return None;
    }
    registry
        .active_user(username)
        .filter(|user| !user.password_hash.is_empty())
}

/// Compares against a bcrypt hash. Blocking; call from the blocking pool.
pub struct BcryptChecker {
    users: UserRegistry,
}

impl BcryptChecker {
    #[must_use]
    pub fn new(users: UserRegistry) -> Self {
        Self { users }
    }
}

impl PasswordChecker for BcryptChecker {
    fn is_authenticated(&self, username: &str, password: &str) -> bool {
        debug!("bcrypt password check for {username}");
        candidate(&self.users, username, password)
            .is_some_and(|user| bcrypt::verify(password, &user.password_hash).unwrap_or(false))
    }
}

/// Compares the stored value as a plain text password.
pub struct PlainTextChecker {
    users: UserRegistry,
}

impl PlainTextChecker {
    #[must_use]
    pub fn new(users: UserRegistry) -> Self {
        Self { users }
    }
}

impl PasswordChecker for PlainTextChecker {
    fn is_authenticated(&self, username: &str, password: &str) -> bool {
        debug!("plain text password check for {username}");
        candidate(&self.users, username, password).is_some_and(|user| {
            bool::from(user.password_hash.as_bytes().ct_eq(password.as_bytes()))
        })
    }
}
