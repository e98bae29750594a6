//! Gateway-wide settings with deployment-tunable defaults.

const DEFAULT_SESSION_TTL_SECONDS: u64 = 8 * 60 * 60;
const DEFAULT_PENDING_TTL_SECONDS: u64 = 5 * 60;
const DEFAULT_FORWARD_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_MAIL_DOMAIN: &str = "portal.internal";
const DEFAULT_TOTP_ISSUER: &str = "Varco Portal";

/// Settings shared across the authentication flow and the router.
///
/// Sessions use an absolute expiry independent of activity; the pending
/// window bounds how long "credentials verified, second factor outstanding"
/// may exist.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    mail_domain: String,
    totp_issuer: String,
    session_ttl_seconds: u64,
    pending_ttl_seconds: u64,
    forward_timeout_seconds: u64,
    cookie_secure: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            mail_domain: DEFAULT_MAIL_DOMAIN.to_string(),
            totp_issuer: DEFAULT_TOTP_ISSUER.to_string(),
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            pending_ttl_seconds: DEFAULT_PENDING_TTL_SECONDS,
            forward_timeout_seconds: DEFAULT_FORWARD_TIMEOUT_SECONDS,
            cookie_secure: false,
        }
    }

    #[must_use]
    pub fn with_mail_domain(mut self, domain: String) -> Self {
        self.mail_domain = domain;
        self
    }

    #[must_use]
    pub fn with_totp_issuer(mut self, issuer: String) -> Self {
        self.totp_issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_pending_ttl_seconds(mut self, seconds: u64) -> Self {
        self.pending_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_forward_timeout_seconds(mut self, seconds: u64) -> Self {
        self.forward_timeout_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn mail_domain(&self) -> &str {
        &self.mail_domain
    }

    #[must_use]
    pub fn totp_issuer(&self) -> &str {
        &self.totp_issuer
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> u64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn pending_ttl_seconds(&self) -> u64 {
        self.pending_ttl_seconds
    }

    #[must_use]
    pub fn forward_timeout_seconds(&self) -> u64 {
        self.forward_timeout_seconds
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_overrides() {
        let config = GatewayConfig::new();
        assert_eq!(config.mail_domain(), "portal.internal");
        assert_eq!(config.session_ttl_seconds(), 8 * 60 * 60);
        assert_eq!(config.pending_ttl_seconds(), 5 * 60);
        assert_eq!(config.forward_timeout_seconds(), 30);
        assert!(!config.cookie_secure());

        let config = config
            .with_mail_domain("example.test".to_string())
            .with_session_ttl_seconds(60)
            .with_pending_ttl_seconds(10)
            .with_forward_timeout_seconds(5)
            .with_cookie_secure(true);
        assert_eq!(config.mail_domain(), "example.test");
        assert_eq!(config.session_ttl_seconds(), 60);
        assert_eq!(config.pending_ttl_seconds(), 10);
        assert_eq!(config.forward_timeout_seconds(), 5);
        assert!(config.cookie_secure());
    }
}
