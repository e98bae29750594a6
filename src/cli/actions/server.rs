use crate::api::{self, Gateway};
use crate::auth::{FileSecretStore, SecretStore};
use crate::cli::actions::Action;
use crate::config::GatewayConfig;
use crate::directory::LdapDirectory;
use crate::routing::{token::Jwks, RoutingTable, TokenVerifier};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Handle the server action: load configuration, assemble the gateway, serve.
///
/// # Errors
/// Returns an error if configuration files are invalid or the server fails
/// to start.
pub async fn handle(action: Action) -> Result<()> {
    let Action::Server {
        port,
        ldap_url,
        ldap_user_base,
        mail_domain,
        totp_secrets,
        totp_issuer,
        routes,
        trust_proxy_headers,
        token_public_key,
        token_issuer,
        token_audience,
        insecure_token_decode,
    } = action;

    let table = match routes {
        Some(path) => RoutingTable::from_file(&path)?,
        None => RoutingTable::builtin(),
    };
    info!(departments = table.departments().len(), "routing table loaded");

    let secrets: Option<Arc<dyn SecretStore>> = match totp_secrets {
        Some(path) => Some(Arc::new(FileSecretStore::load(&path)?)),
        None => {
            warn!("no TOTP secrets file configured; second-factor completion will fail");
            None
        }
    };

    let tokens = token_verifier(
        token_public_key.as_deref(),
        token_issuer,
        token_audience,
        insecure_token_decode,
    )?;

    let config = GatewayConfig::new()
        .with_mail_domain(mail_domain)
        .with_totp_issuer(totp_issuer);

    let directory = Arc::new(LdapDirectory::new(ldap_url, ldap_user_base));

    let gateway = Gateway::new(
        directory,
        secrets,
        table,
        tokens,
        trust_proxy_headers,
        config,
    )?;

    api::new(port, gateway).await
}

fn token_verifier(
    public_key: Option<&Path>,
    issuer: Option<String>,
    audience: Option<String>,
    insecure: bool,
) -> Result<Option<TokenVerifier>> {
    if insecure {
        return Ok(Some(TokenVerifier::InsecureDecode));
    }
    let Some(path) = public_key else {
        return Ok(None);
    };

    let raw = std::fs::read(path)
        .with_context(|| format!("failed to read token public key: {}", path.display()))?;
    // Either a JWKS JSON document or a bare PEM/DER public key.
    let jwks = if raw.trim_ascii_start().starts_with(b"{") {
        Jwks::from_json(std::str::from_utf8(&raw).context("JWKS file is not UTF-8")?)
            .context("invalid JWKS document")?
    } else {
        Jwks::from_rsa_public_key_pem_or_der(&raw, "default")
            .map_err(|err| anyhow::anyhow!("invalid token public key: {err}"))?
    };

    let issuer = issuer.context("--token-issuer is required with --token-public-key")?;
    let audience = audience.context("--token-audience is required with --token-public-key")?;

    Ok(Some(TokenVerifier::Verified {
        jwks,
        issuer,
        audience,
    }))
}
