//! Known users and the password strategies that verify them.

pub mod password;

pub use password::{BcryptChecker, PasswordChecker, PasswordCheckers, PlainTextChecker};

use crate::{
    client::RegistryError,
    store::{Cache, CacheError},
};
use serde::{Deserialize, Serialize};
use std::{
    io::{Read, Write},
    sync::Arc,
};
use tracing::error;
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserState {
    Active,
    #[default]
    Inactive,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: u64,
    pub username: String,
    /// bcrypt hash, or a plain text password for the plain text checker.
    #[serde(default, alias = "password")]
    pub password_hash: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: UserState,
}

impl User {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == UserState::Active
    }

    #[must_use]
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            login: self.username.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }
}

/// Public view of a user, without password or state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: u64,
    pub username: String,
    pub login: String,
    pub email: String,
    pub name: String,
}

#[derive(Clone)]
pub struct UserRegistry {
    cache: Arc<dyn Cache<User>>,
}

impl UserRegistry {
    #[must_use]
    pub fn new(cache: Arc<dyn Cache<User>>) -> Self {
        Self { cache }
    }

    /// # Errors
    /// Returns an error on storage faults; unknown users are `None`.
    pub fn find(&self, username: &str) -> Result<Option<User>, CacheError> {
        match self.cache.get(username) {
            Ok(user) => Ok(Some(user)),
            Err(err) if err.is_miss() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// The user, only when it exists and is active. Storage faults are logged
    /// and treated as "not authenticated".
    #[must_use]
    pub fn active_user(&self, username: &str) -> Option<User> {
        if username.is_empty() {
            return None;
        }
        match self.find(username) {
            Ok(user) => user.filter(User::is_active),
            Err(err) => {
                error!("Failed to lookup user {username}: {err}");
                None
            }
        }
    }

    /// # Errors
    /// Returns an error if the user cannot be stored.
    pub fn put(&self, user: User) -> Result<(), CacheError> {
        let username = user.username.clone();
        self.cache.put(&username, user)
    }

    /// # Errors
    /// `NotFound` when the user does not exist.
    pub fn delete(&self, username: &str) -> Result<(), CacheError> {
        self.cache.delete(username)
    }

    /// Load users from a JSON array or a single JSON object.
    ///
    /// # Errors
    /// Returns an error on read, decode or storage failures.
    pub fn load_from_json<R: Read>(&self, mut reader: R) -> Result<usize, RegistryError> {
        let mut input = String::new();
        reader.read_to_string(&mut input)?;
        let users = match serde_json::from_str::<Vec<User>>(&input) {
            Ok(users) => users,
            Err(_) => vec![serde_json::from_str::<User>(&input)?],
        };
        let count = users.len();
        for user in users {
            self.put(user)?;
        }
        Ok(count)
    }

    /// # Errors
    /// Returns an error on storage or write failures.
    pub fn save_to_json<W: Write>(&self, writer: W) -> Result<(), RegistryError> {
        let mut users = Vec::new();
        for username in self.cache.keys()? {
            if let Some(user) = self.find(&username)? {
                users.push(user);
            }
        }
        serde_json::to_writer_pretty(writer, &users)?;
        Ok(())
    }
}
