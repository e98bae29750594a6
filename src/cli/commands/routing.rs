//! Role-routing and identity-token arguments.

use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;

pub const ARG_ROUTES: &str = "routes";
pub const ARG_TRUST_PROXY_HEADERS: &str = "trust-proxy-headers";
pub const ARG_TOKEN_PUBLIC_KEY: &str = "token-public-key";
pub const ARG_TOKEN_ISSUER: &str = "token-issuer";
pub const ARG_TOKEN_AUDIENCE: &str = "token-audience";
pub const ARG_INSECURE_TOKEN_DECODE: &str = "insecure-token-decode";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ROUTES)
                .long(ARG_ROUTES)
                .help("Path to a JSON routing table (department, group, role, dashboard, backend); built-in table used when omitted")
                .env("VARCO_ROUTES")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(ARG_TRUST_PROXY_HEADERS)
                .long(ARG_TRUST_PROXY_HEADERS)
                .help("Accept X-Auth-Request-* identity headers. Only enable behind a trusted authenticating proxy; this process cannot verify the network topology")
                .env("VARCO_TRUST_PROXY_HEADERS")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_TOKEN_PUBLIC_KEY)
                .long(ARG_TOKEN_PUBLIC_KEY)
                .help("RSA public key (PEM/DER) or JWKS JSON document used to verify identity tokens")
                .env("VARCO_TOKEN_PUBLIC_KEY")
                .value_parser(clap::value_parser!(PathBuf))
                .conflicts_with(ARG_INSECURE_TOKEN_DECODE),
        )
        .arg(
            Arg::new(ARG_TOKEN_ISSUER)
                .long(ARG_TOKEN_ISSUER)
                .help("Expected iss claim of identity tokens")
                .env("VARCO_TOKEN_ISSUER"),
        )
        .arg(
            Arg::new(ARG_TOKEN_AUDIENCE)
                .long(ARG_TOKEN_AUDIENCE)
                .help("Expected aud claim of identity tokens")
                .env("VARCO_TOKEN_AUDIENCE"),
        )
        .arg(
            Arg::new(ARG_INSECURE_TOKEN_DECODE)
                .long(ARG_INSECURE_TOKEN_DECODE)
                .help("DEVELOPMENT ONLY: accept identity tokens without signature verification")
                .env("VARCO_INSECURE_TOKEN_DECODE")
                .action(ArgAction::SetTrue),
        )
}
