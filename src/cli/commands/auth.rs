//! Second-factor (TOTP) arguments.

use clap::{Arg, Command};
use std::path::PathBuf;

pub const ARG_TOTP_SECRETS: &str = "totp-secrets";
pub const ARG_TOTP_ISSUER: &str = "totp-issuer";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TOTP_SECRETS)
                .long(ARG_TOTP_SECRETS)
                .help("Path to the JSON file mapping usernames to base32 TOTP secrets")
                .env("VARCO_TOTP_SECRETS")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(ARG_TOTP_ISSUER)
                .long(ARG_TOTP_ISSUER)
                .help("Issuer shown in authenticator apps for enrollment URIs")
                .env("VARCO_TOTP_ISSUER")
                .default_value("Varco Portal"),
        )
}
