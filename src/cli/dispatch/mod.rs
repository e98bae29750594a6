use crate::cli::{
    actions::Action,
    commands::{auth, directory, routing},
};
use anyhow::{anyhow, Result};
use std::path::PathBuf;

/// Build the Action from parsed matches.
///
/// # Errors
///
/// Returns an error if a required argument is missing (should be prevented by clap).
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        ldap_url: matches
            .get_one::<String>(directory::ARG_LDAP_URL)
            .cloned()
            .ok_or_else(|| anyhow!("missing required argument: --{}", directory::ARG_LDAP_URL))?,
        ldap_user_base: matches
            .get_one::<String>(directory::ARG_LDAP_USER_BASE)
            .cloned()
            .ok_or_else(|| {
                anyhow!(
                    "missing required argument: --{}",
                    directory::ARG_LDAP_USER_BASE
                )
            })?,
        mail_domain: matches
            .get_one::<String>(directory::ARG_MAIL_DOMAIN)
            .cloned()
            .unwrap_or_else(|| "portal.internal".to_string()),
        totp_secrets: matches
            .get_one::<PathBuf>(auth::ARG_TOTP_SECRETS)
            .cloned(),
        totp_issuer: matches
            .get_one::<String>(auth::ARG_TOTP_ISSUER)
            .cloned()
            .unwrap_or_else(|| "Varco Portal".to_string()),
        routes: matches.get_one::<PathBuf>(routing::ARG_ROUTES).cloned(),
        trust_proxy_headers: matches.get_flag(routing::ARG_TRUST_PROXY_HEADERS),
        token_public_key: matches
            .get_one::<PathBuf>(routing::ARG_TOKEN_PUBLIC_KEY)
            .cloned(),
        token_issuer: matches.get_one::<String>(routing::ARG_TOKEN_ISSUER).cloned(),
        token_audience: matches
            .get_one::<String>(routing::ARG_TOKEN_AUDIENCE)
            .cloned(),
        insecure_token_decode: matches.get_flag(routing::ARG_INSECURE_TOKEN_DECODE),
    })
}
