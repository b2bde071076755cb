//! Map parsed arguments to the action the binary runs.

use crate::cli::{
    actions::{bcrypt, server, Action},
    commands::{auth, storage, ARG_BIND, ARG_COST, ARG_PASSWORDS, ARG_PORT, CMD_BCRYPT, CMD_KEYS, CMD_OPENAPI},
};
use anyhow::{anyhow, Context, Result};
use std::net::IpAddr;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((CMD_BCRYPT, sub)) => Ok(Action::Bcrypt(bcrypt::Args {
            passwords: sub
                .get_many::<String>(ARG_PASSWORDS)
                .context("missing required argument: <passwords>")?
                .cloned()
                .collect(),
            cost: sub.get_one::<u32>(ARG_COST).copied().unwrap_or(bcrypt::DEFAULT_COST),
        })),
        Some((CMD_KEYS, _)) => Ok(Action::Keys),
        Some((CMD_OPENAPI, _)) => Ok(Action::OpenApi),
        Some((other, _)) => Err(anyhow!("unknown command: {other}")),
        None => server_action(matches),
    }
}

fn server_action(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(42001);
    let bind = matches
        .get_one::<IpAddr>(ARG_BIND)
        .copied()
        .context("missing required argument: --bind")?;

    let storage = storage::Options::parse(matches);
    let auth = auth::Options::parse(matches)?;

    Ok(Action::Server(server::Args {
        port,
        bind,
        cache_dir: storage.cache_dir,
        clients: storage.clients,
        users: storage.users,
        hash_key: auth.hash_key,
        block_key: auth.block_key,
        insecure: auth.insecure,
        login_path: auth.login_path,
        realm: auth.realm,
        token_ttl_seconds: auth.token_ttl_seconds,
        grant_ttl_seconds: auth.grant_ttl_seconds,
        login_lifetime_seconds: auth.login_lifetime_seconds,
    }))
}
