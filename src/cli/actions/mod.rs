pub mod server;

use std::path::PathBuf;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        ldap_url: String,
        ldap_user_base: String,
        mail_domain: String,
        totp_secrets: Option<PathBuf>,
        totp_issuer: String,
        routes: Option<PathBuf>,
        trust_proxy_headers: bool,
        token_public_key: Option<PathBuf>,
        token_issuer: Option<String>,
        token_audience: Option<String>,
        insecure_token_decode: bool,
    },
}
