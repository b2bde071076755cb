use crate::state::{DEFAULT_LOGIN_PATH, DEFAULT_REALM};
use anyhow::{anyhow, Result};
use clap::{builder::BoolishValueParser, value_parser, Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_HASH_KEY: &str = "hash-key";
pub const ARG_BLOCK_KEY: &str = "block-key";
pub const ARG_INSECURE: &str = "insecure";
pub const ARG_LOGIN_PATH: &str = "login-path";
pub const ARG_REALM: &str = "realm";
pub const ARG_TOKEN_TTL_SECONDS: &str = "token-ttl-seconds";
pub const ARG_GRANT_TTL_SECONDS: &str = "grant-ttl-seconds";
pub const ARG_LOGIN_LIFETIME_SECONDS: &str = "login-lifetime-seconds";

#[derive(Debug)]
pub struct Options {
    pub hash_key: Option<SecretString>,
    pub block_key: Option<SecretString>,
    pub insecure: bool,
    pub login_path: String,
    pub realm: String,
    pub token_ttl_seconds: i64,
    pub grant_ttl_seconds: i64,
    pub login_lifetime_seconds: i64,
}

impl Options {
    /// Parse authentication arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a value is missing or out of range.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let secret = |id: &str| {
            matches
                .get_one::<String>(id)
                .filter(|v| !v.trim().is_empty())
                .map(|v| SecretString::from(v.trim().to_string()))
        };
        let string = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .ok_or_else(|| anyhow!("missing required argument: --{id}"))
        };
        let seconds = |id: &str| -> Result<i64> {
            let value = matches
                .get_one::<i64>(id)
                .copied()
                .ok_or_else(|| anyhow!("missing required argument: --{id}"))?;
            if value <= 0 {
                return Err(anyhow!("--{id} must be positive"));
            }
            Ok(value)
        };

        let login_path = string(ARG_LOGIN_PATH)?;
        if !login_path.starts_with('/') {
            return Err(anyhow!("--{ARG_LOGIN_PATH} must start with '/'"));
        }

        Ok(Self {
            hash_key: secret(ARG_HASH_KEY),
            block_key: secret(ARG_BLOCK_KEY),
            insecure: matches.get_flag(ARG_INSECURE),
            login_path,
            realm: string(ARG_REALM)?,
            token_ttl_seconds: seconds(ARG_TOKEN_TTL_SECONDS)?,
            grant_ttl_seconds: seconds(ARG_GRANT_TTL_SECONDS)?,
            login_lifetime_seconds: seconds(ARG_LOGIN_LIFETIME_SECONDS)?,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_cookie_args(command);
    with_oauth_args(command)
}

fn with_cookie_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_HASH_KEY)
                .long(ARG_HASH_KEY)
                .help("Base64 HMAC key for the login cookie (random per process when unset)")
                .env("AUTHSVC_HASH_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_BLOCK_KEY)
                .long(ARG_BLOCK_KEY)
                .help("Base64 AES-256 key for the login cookie (random per process when unset)")
                .env("AUTHSVC_BLOCK_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_INSECURE)
                .long(ARG_INSECURE)
                .help("Issue cookies without the Secure attribute")
                .env("AUTHSVC_INSECURE")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        )
        .arg(
            Arg::new(ARG_LOGIN_PATH)
                .long(ARG_LOGIN_PATH)
                .help("Path of the login page")
                .env("AUTHSVC_LOGIN_PATH")
                .default_value(DEFAULT_LOGIN_PATH),
        )
        .arg(
            Arg::new(ARG_LOGIN_LIFETIME_SECONDS)
                .long(ARG_LOGIN_LIFETIME_SECONDS)
                .help("Login cookie lifetime in seconds")
                .env("AUTHSVC_LOGIN_LIFETIME_SECONDS")
                .default_value("7200")
                .value_parser(value_parser!(i64)),
        )
}

fn with_oauth_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_REALM)
                .long(ARG_REALM)
                .help("Realm announced in WWW-Authenticate challenges")
                .env("AUTHSVC_REALM")
                .default_value(DEFAULT_REALM),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL_SECONDS)
                .long(ARG_TOKEN_TTL_SECONDS)
                .help("Lifetime of pending authorizations and codes in seconds")
                .env("AUTHSVC_TOKEN_TTL_SECONDS")
                .default_value("900")
                .value_parser(value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_GRANT_TTL_SECONDS)
                .long(ARG_GRANT_TTL_SECONDS)
                .help("Lifetime of issued bearer tokens in seconds")
                .env("AUTHSVC_GRANT_TTL_SECONDS")
                .default_value("1209600")
                .value_parser(value_parser!(i64)),
        )
}
