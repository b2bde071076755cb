pub mod auth;
pub mod logging;
pub mod storage;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    value_parser, Arg, ColorChoice, Command,
};
use std::net::IpAddr;

pub const CMD_BCRYPT: &str = "bcrypt";
pub const CMD_KEYS: &str = "keys";
pub const CMD_OPENAPI: &str = "openapi";

pub const ARG_PORT: &str = "port";
pub const ARG_BIND: &str = "bind";
pub const ARG_PASSWORDS: &str = "passwords";
pub const ARG_COST: &str = "cost";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("authsvc")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("42001")
                .env("AUTHSVC_PORT")
                .value_parser(value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_BIND)
                .long(ARG_BIND)
                .help("Address to bind")
                .default_value("127.0.0.1")
                .env("AUTHSVC_BIND")
                .value_parser(value_parser!(IpAddr)),
        )
        .subcommand(
            Command::new(CMD_BCRYPT)
                .about("Print bcrypt hashes for use in a users file")
                .arg(
                    Arg::new(ARG_PASSWORDS)
                        .help("Passwords to hash")
                        .required(true)
                        .num_args(1..),
                )
                .arg(
                    Arg::new(ARG_COST)
                        .long(ARG_COST)
                        .help("bcrypt cost factor")
                        .default_value("12")
                        .value_parser(value_parser!(u32).range(4..=31)),
                ),
        )
        .subcommand(
            Command::new(CMD_KEYS).about("Print a freshly generated cookie hash key and block key"),
        )
        .subcommand(Command::new(CMD_OPENAPI).about("Print the OpenAPI document as JSON"));

    let command = storage::with_args(command);
    let command = auth::with_args(command);
    logging::with_args(command)
}
