use clap::{value_parser, Arg, ArgMatches, Command};
use std::path::PathBuf;

pub const ARG_CACHE_DIR: &str = "cache-dir";
pub const ARG_CLIENTS: &str = "clients";
pub const ARG_USERS: &str = "users";

#[derive(Debug, Default)]
pub struct Options {
    pub cache_dir: Option<PathBuf>,
    pub clients: Option<PathBuf>,
    pub users: Option<PathBuf>,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        let path = |id: &str| matches.get_one::<PathBuf>(id).cloned();
        Self {
            cache_dir: path(ARG_CACHE_DIR),
            clients: path(ARG_CLIENTS),
            users: path(ARG_USERS),
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_CACHE_DIR)
                .long(ARG_CACHE_DIR)
                .help("Directory for the durable cache; state is kept in memory when unset")
                .env("AUTHSVC_CACHE_DIR")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(ARG_CLIENTS)
                .long(ARG_CLIENTS)
                .help("JSON file with registered OAuth clients, loaded at startup")
                .env("AUTHSVC_CLIENTS")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(ARG_USERS)
                .long(ARG_USERS)
                .help("JSON file with users, loaded at startup")
                .env("AUTHSVC_USERS")
                .value_parser(value_parser!(PathBuf)),
        )
}
