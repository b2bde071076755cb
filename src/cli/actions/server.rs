use crate::{
    api,
    authentication::CookieCodec,
    cli::telemetry,
    state::{AppState, AuthConfig, Stores},
};
use anyhow::{anyhow, Context, Result};
use base64ct::{Base64, Encoding};
use secrecy::{ExposeSecret, SecretString};
use std::{
    fs::File,
    io::BufReader,
    net::IpAddr,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub bind: IpAddr,
    pub cache_dir: Option<PathBuf>,
    pub clients: Option<PathBuf>,
    pub users: Option<PathBuf>,
    pub hash_key: Option<SecretString>,
    pub block_key: Option<SecretString>,
    pub insecure: bool,
    pub login_path: String,
    pub realm: String,
    pub token_ttl_seconds: i64,
    pub grant_ttl_seconds: i64,
    pub login_lifetime_seconds: i64,
}

impl Args {
    #[must_use]
    pub fn config(&self) -> AuthConfig {
        AuthConfig::new()
            .with_realm(self.realm.clone())
            .with_login_path(self.login_path.clone())
            .with_insecure(self.insecure)
            .with_token_ttl_seconds(self.token_ttl_seconds)
            .with_grant_ttl_seconds(self.grant_ttl_seconds)
            .with_login_lifetime_seconds(self.login_lifetime_seconds)
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the stores, keys or seed files are unusable, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let state = Arc::new(build_state(&args)?);
    let result = api::serve(args.bind, args.port, state).await;

    telemetry::shutdown_tracer();
    result
}

/// Assemble the application state from the server arguments.
///
/// # Errors
/// Returns an error if the stores, keys or seed files are unusable.
pub fn build_state(args: &Args) -> Result<AppState> {
    let config = args.config();

    let stores = match &args.cache_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create cache dir {}", dir.display()))?;
            Stores::open(dir).context("Failed to open durable cache")?
        }
        None => Stores::memory(),
    };

    let cookies = cookie_codec(args, config.login_lifetime_seconds())?;
    let state = AppState::new(config, cookies, stores);

    if let Some(path) = &args.clients {
        let count = state
            .clients()
            .load_from_json(open(path)?)
            .with_context(|| format!("Failed to load clients from {}", path.display()))?;
        info!("Loaded {count} clients from {}", path.display());
    }
    if let Some(path) = &args.users {
        let count = state
            .users()
            .load_from_json(open(path)?)
            .with_context(|| format!("Failed to load users from {}", path.display()))?;
        info!("Loaded {count} users from {}", path.display());
    }

    Ok(state)
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn cookie_codec(args: &Args, max_age_seconds: i64) -> Result<CookieCodec> {
    match (&args.hash_key, &args.block_key) {
        (Some(hash_key), Some(block_key)) => {
            let hash_key = decode_key(hash_key).context("invalid --hash-key")?;
            let block_key = decode_key(block_key).context("invalid --block-key")?;
            Ok(CookieCodec::new(&hash_key, &block_key, max_age_seconds)?)
        }
        (None, None) => {
            warn!("No cookie keys configured, generating random keys; sessions end on restart");
            Ok(CookieCodec::generate(max_age_seconds)?)
        }
        _ => Err(anyhow!(
            "--hash-key and --block-key must be given together"
        )),
    }
}

fn decode_key(key: &SecretString) -> Result<Vec<u8>> {
    Base64::decode_vec(key.expose_secret().trim()).map_err(|err| anyhow!("not base64: {err}"))
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("{}:{}", args.bind, args.port)),
        (
            "cache_dir",
            args.cache_dir
                .as_ref()
                .map_or_else(|| "memory".to_string(), |dir| dir.display().to_string()),
        ),
        (
            "clients",
            args.clients
                .as_ref()
                .map_or_else(|| "none".to_string(), |path| path.display().to_string()),
        ),
        (
            "users",
            args.users
                .as_ref()
                .map_or_else(|| "none".to_string(), |path| path.display().to_string()),
        ),
        ("cookie_keys_set", args.hash_key.is_some().to_string()),
        ("insecure", args.insecure.to_string()),
        ("login_path", args.login_path.clone()),
        ("realm", args.realm.clone()),
        ("token_ttl_seconds", args.token_ttl_seconds.to_string()),
        ("grant_ttl_seconds", args.grant_ttl_seconds.to_string()),
        (
            "login_lifetime_seconds",
            args.login_lifetime_seconds.to_string(),
        ),
    ];
    log_entries("Startup configuration", &entries);
}

fn log_entries(title: &str, entries: &[(&str, String)]) {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\n{title}:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}
