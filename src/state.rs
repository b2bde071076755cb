//! Gateway configuration and the shared state handed to every handler.

use crate::{
    authentication::{CookieChecker, CookieCodec, RequestChecker, RequestCheckers},
    authorization::{OAuthHandler, OAuthOptions, PendingAuthorization, TokenCache},
    client::{Client, ClientRegistry},
    store::{open_db, Cache, CacheError, MemoryCache, TreeCache},
    user::{BcryptChecker, PasswordChecker, PasswordCheckers, PlainTextChecker, User, UserRegistry},
};
use std::{path::Path, sync::Arc};

pub use crate::authorization::{DEFAULT_GRANT_TTL_SECONDS, DEFAULT_TOKEN_TTL_SECONDS};

pub const DEFAULT_REALM: &str = "authsvc";
pub const DEFAULT_AUTH_ROOT: &str = "/auth/";
pub const DEFAULT_OAUTH_ROOT: &str = "/oauth/";
pub const DEFAULT_LOGIN_PATH: &str = "/auth/login/";
pub const DEFAULT_LOGIN_LIFETIME_SECONDS: i64 = 2 * 60 * 60;
pub const DB_FILE_NAME: &str = "authsvc.db";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    realm: String,
    auth_root: String,
    oauth_root: String,
    login_path: String,
    insecure: bool,
    token_ttl_seconds: i64,
    grant_ttl_seconds: i64,
    login_lifetime_seconds: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            realm: DEFAULT_REALM.to_string(),
            auth_root: DEFAULT_AUTH_ROOT.to_string(),
            oauth_root: DEFAULT_OAUTH_ROOT.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            insecure: false,
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            grant_ttl_seconds: DEFAULT_GRANT_TTL_SECONDS,
            login_lifetime_seconds: DEFAULT_LOGIN_LIFETIME_SECONDS,
        }
    }

    #[must_use]
    pub fn with_realm(mut self, realm: String) -> Self {
        self.realm = realm;
        self
    }

    #[must_use]
    pub fn with_login_path(mut self, login_path: String) -> Self {
        self.login_path = login_path;
        self
    }

    #[must_use]
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_grant_ttl_seconds(mut self, seconds: i64) -> Self {
        self.grant_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_login_lifetime_seconds(mut self, seconds: i64) -> Self {
        self.login_lifetime_seconds = seconds;
        self
    }

    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }

    #[must_use]
    pub fn auth_root(&self) -> &str {
        &self.auth_root
    }

    #[must_use]
    pub fn oauth_root(&self) -> &str {
        &self.oauth_root
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    #[must_use]
    pub fn logout_path(&self) -> String {
        format!("{}logout/", self.auth_root)
    }

    #[must_use]
    pub fn oauth_path(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.oauth_root)
    }

    #[must_use]
    pub fn insecure(&self) -> bool {
        self.insecure
    }

    /// Cookies carry `Secure` unless running insecure.
    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        !self.insecure
    }

    #[must_use]
    pub fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }

    #[must_use]
    pub fn grant_ttl_seconds(&self) -> i64 {
        self.grant_ttl_seconds
    }

    #[must_use]
    pub fn login_lifetime_seconds(&self) -> i64 {
        self.login_lifetime_seconds
    }

    #[must_use]
    pub fn oauth_options(&self) -> OAuthOptions {
        OAuthOptions::default()
            .with_token_ttl_seconds(self.token_ttl_seconds)
            .with_grant_ttl_seconds(self.grant_ttl_seconds)
    }

    /// Roots served without authentication. The login page stays reachable
    /// even when it lives outside the auth root.
    #[must_use]
    pub fn public_roots(&self) -> Vec<String> {
        vec![
            self.auth_root.clone(),
            self.login_path.clone(),
            self.oauth_path("token"),
            "/health".to_string(),
        ]
    }

    /// A root ending in `/` covers everything below it; any other root
    /// matches itself and its sub-paths, never a longer segment.
    #[must_use]
    pub fn is_public(&self, path: &str) -> bool {
        self.public_roots().iter().any(|root| {
            if root.ends_with('/') {
                path.starts_with(root.as_str())
            } else {
                path.strip_prefix(root.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            }
        })
    }
}

/// One typed cache per logical store.
#[derive(Clone)]
pub struct Stores {
    pub pending: Arc<dyn Cache<PendingAuthorization>>,
    pub owner_tokens: Arc<dyn Cache<Vec<String>>>,
    pub token_owners: Arc<dyn Cache<String>>,
    pub clients: Arc<dyn Cache<Client>>,
    pub users: Arc<dyn Cache<User>>,
}

impl Stores {
    #[must_use]
    pub fn memory() -> Self {
        Self {
            pending: Arc::new(MemoryCache::<PendingAuthorization>::new()),
            owner_tokens: Arc::new(MemoryCache::<Vec<String>>::new()),
            token_owners: Arc::new(MemoryCache::<String>::new()),
            clients: Arc::new(MemoryCache::<Client>::new()),
            users: Arc::new(MemoryCache::<User>::new()),
        }
    }

    /// Open the durable stores inside `dir`, one tree each.
    ///
    /// # Errors
    /// Returns an error if the database or a tree cannot be opened.
    pub fn open(dir: &Path) -> Result<Self, CacheError> {
        Self::from_db(&open_db(&dir.join(DB_FILE_NAME))?)
    }

    /// Durable stores over an already open database.
    ///
    /// # Errors
    /// Returns an error if a tree cannot be opened.
    pub fn from_db(db: &sled::Db) -> Result<Self, CacheError> {
        Ok(Self {
            pending: Arc::new(TreeCache::<PendingAuthorization>::open(db, "transient")?),
            owner_tokens: Arc::new(TreeCache::<Vec<String>>::open(db, "client_tokens")?),
            token_owners: Arc::new(TreeCache::<String>::open(db, "token_clients")?),
            clients: Arc::new(TreeCache::<Client>::open(db, "clients")?),
            users: Arc::new(TreeCache::<User>::open(db, "users")?),
        })
    }
}

pub struct AppState {
    config: AuthConfig,
    cookies: CookieCodec,
    users: UserRegistry,
    clients: ClientRegistry,
    oauth: Arc<OAuthHandler>,
    checkers: RequestCheckers,
    passwords: Arc<PasswordCheckers>,
}

impl AppState {
    #[must_use]
    pub fn new(config: AuthConfig, cookies: CookieCodec, stores: Stores) -> Self {
        let users = UserRegistry::new(stores.users);
        let clients = ClientRegistry::new(stores.clients);
        let tokens = TokenCache::new(stores.owner_tokens, stores.token_owners);
        let oauth = Arc::new(OAuthHandler::new(
            config.oauth_options(),
            stores.pending,
            tokens,
            clients.clone(),
            users.clone(),
        ));

        let cookie: Arc<dyn RequestChecker> =
            Arc::new(CookieChecker::new(cookies.clone(), users.clone()));
        let bearer: Arc<dyn RequestChecker> = oauth.clone();
        let checkers = RequestCheckers::new(vec![Some(cookie), Some(bearer)]);

        let password_checkers: Vec<Box<dyn PasswordChecker>> = vec![
            Box::new(BcryptChecker::new(users.clone())),
            Box::new(PlainTextChecker::new(users.clone())),
        ];

        Self {
            config,
            cookies,
            users,
            clients,
            oauth,
            checkers,
            passwords: Arc::new(PasswordCheckers::new(password_checkers)),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn cookies(&self) -> &CookieCodec {
        &self.cookies
    }

    #[must_use]
    pub fn users(&self) -> &UserRegistry {
        &self.users
    }

    #[must_use]
    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    #[must_use]
    pub fn oauth(&self) -> &OAuthHandler {
        &self.oauth
    }

    #[must_use]
    pub fn checkers(&self) -> &RequestCheckers {
        &self.checkers
    }

    /// Shared handle so password checks can move to the blocking pool.
    #[must_use]
    pub fn passwords(&self) -> Arc<PasswordCheckers> {
        Arc::clone(&self.passwords)
    }
}
