//! Second-factor collaborators: secret lookup and TOTP validation.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use totp_rs::{Algorithm, Secret, TOTP};

/// 30-second time step, 6 digits, one window of drift either direction.
/// Narrower would false-reject on clock skew; wider would weaken replay
/// resistance. One window is the chosen balance.
const TOTP_STEP_SECONDS: u64 = 30;
const TOTP_DIGITS: usize = 6;
const TOTP_SKEW: u8 = 1;

/// Strip whitespace and the `-` separator authenticator apps display.
#[must_use]
pub fn normalize_code(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// Exactly 6 decimal digits after normalization.
#[must_use]
pub fn valid_code_format(code: &str) -> bool {
    code.len() == TOTP_DIGITS && code.chars().all(|c| c.is_ascii_digit())
}

#[derive(Debug, Error)]
pub enum TotpFault {
    /// Stored secret is not valid base32 or too short for TOTP.
    #[error("stored secret unusable: {0}")]
    BadSecret(String),
    /// System clock unavailable; verification cannot run.
    #[error("system clock error: {0}")]
    Clock(String),
}

/// Lookup seam for enrolled second-factor secrets.
///
/// `lookup` errors mean the subsystem itself is broken (configuration), not
/// that a subject is unenrolled — that is the `Ok(None)` case.
pub trait SecretStore: Send + Sync {
    /// Base32 secret for a subject, or `None` when not enrolled.
    ///
    /// # Errors
    /// Returns an error when the store itself cannot be read.
    fn lookup(&self, username: &str) -> Result<Option<String>>;

    /// All enrolled subjects, for provisioning-URI listings.
    ///
    /// # Errors
    /// Returns an error when the store itself cannot be read.
    fn entries(&self) -> Result<Vec<(String, String)>>;
}

/// JSON file mapping usernames to base32 secrets, loaded once at startup.
pub struct FileSecretStore {
    secrets: HashMap<String, String>,
}

impl FileSecretStore {
    /// # Errors
    /// Returns an error if the file is missing, unreadable, or not a JSON
    /// object of string values.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read TOTP secrets file: {}", path.display()))?;
        let value: Value = serde_json::from_str(&raw)
            .with_context(|| format!("invalid JSON in TOTP secrets file: {}", path.display()))?;
        let object = value
            .as_object()
            .context("TOTP secrets file must be a JSON object of username: secret")?;

        let mut secrets = HashMap::new();
        for (username, secret) in object {
            let secret = secret
                .as_str()
                .with_context(|| format!("secret for {username} must be a string"))?;
            secrets.insert(username.clone(), secret.to_string());
        }
        Ok(Self { secrets })
    }

    #[must_use]
    pub fn from_map(secrets: HashMap<String, String>) -> Self {
        Self { secrets }
    }
}

impl SecretStore for FileSecretStore {
    fn lookup(&self, username: &str) -> Result<Option<String>> {
        Ok(self.secrets.get(username).cloned())
    }

    fn entries(&self) -> Result<Vec<(String, String)>> {
        let mut entries: Vec<(String, String)> = self
            .secrets
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort();
        Ok(entries)
    }
}

/// Pure-local TOTP validation; never blocks on I/O.
#[derive(Clone, Debug)]
pub struct TotpVerifier {
    issuer: String,
}

impl TotpVerifier {
    #[must_use]
    pub fn new(issuer: String) -> Self {
        Self { issuer }
    }

    fn totp(&self, secret_base32: &str, account: &str) -> Result<TOTP, TotpFault> {
        let secret = Secret::Encoded(secret_base32.to_string())
            .to_bytes()
            .map_err(|err| TotpFault::BadSecret(format!("{err:?}")))?;
        TOTP::new(
            Algorithm::SHA1,
            TOTP_DIGITS,
            TOTP_SKEW,
            TOTP_STEP_SECONDS,
            secret,
            Some(self.issuer.clone()),
            account.to_string(),
        )
        .map_err(|err| TotpFault::BadSecret(format!("{err:?}")))
    }

    /// Check a normalized, format-valid code against a subject's secret.
    ///
    /// # Errors
    /// Returns a fault when the secret is unusable or the clock is broken;
    /// a wrong code is `Ok(false)`.
    pub fn verify(&self, secret_base32: &str, account: &str, code: &str) -> Result<bool, TotpFault> {
        let totp = self.totp(secret_base32, account)?;
        totp.check_current(code)
            .map_err(|err| TotpFault::Clock(err.to_string()))
    }

    /// `otpauth://` URI for enrolling an authenticator app.
    ///
    /// # Errors
    /// Returns a fault when the secret is unusable.
    pub fn provisioning_uri(
        &self,
        secret_base32: &str,
        account: &str,
    ) -> Result<String, TotpFault> {
        let totp = self.totp(secret_base32, account)?;
        Ok(totp.get_url())
    }

    /// Current code for a secret. Test helper for exercising the flow
    /// without an authenticator app.
    ///
    /// # Errors
    /// Returns a fault when the secret is unusable or the clock is broken.
    pub fn current_code(&self, secret_base32: &str, account: &str) -> Result<String, TotpFault> {
        let totp = self.totp(secret_base32, account)?;
        totp.generate_current()
            .map_err(|err| TotpFault::Clock(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 20 bytes of base32, comfortably above the 128-bit TOTP minimum.
    const SECRET: &str = "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP";

    #[test]
    fn normalization_treats_separator_variants_identically() {
        assert_eq!(normalize_code("123456"), "123456");
        assert_eq!(normalize_code("123 456"), "123456");
        assert_eq!(normalize_code("123-456"), "123456");
        assert_eq!(normalize_code(" 12-34 56 "), "123456");
    }

    #[test]
    fn format_requires_exactly_six_digits() {
        assert!(valid_code_format("123456"));
        assert!(!valid_code_format("12345"));
        assert!(!valid_code_format("1234567"));
        assert!(!valid_code_format("12345a"));
        assert!(!valid_code_format(""));
    }

    #[test]
    fn verify_accepts_current_code() -> Result<(), TotpFault> {
        let verifier = TotpVerifier::new("Varco Portal".to_string());
        let code = verifier.current_code(SECRET, "alice")?;
        assert!(verifier.verify(SECRET, "alice", &code)?);
        Ok(())
    }

    #[test]
    fn drift_tolerance_is_one_window_each_way() -> Result<(), TotpFault> {
        let verifier = TotpVerifier::new("Varco Portal".to_string());
        let totp = verifier.totp(SECRET, "alice")?;

        let now = 1_700_000_000;
        let code = totp.generate(now);
        // Accepted across the current step and one step of drift either way.
        assert!(totp.check(&code, now));
        assert!(totp.check(&code, now - 30));
        assert!(totp.check(&code, now + 30));
        // Two steps out is beyond the tolerated drift.
        assert!(!totp.check(&code, now + 90));
        assert!(!totp.check(&code, now - 90));
        Ok(())
    }

    #[test]
    fn verify_rejects_unusable_secret() {
        let verifier = TotpVerifier::new("Varco Portal".to_string());
        let result = verifier.verify("not base32!!", "alice", "123456");
        assert!(matches!(result, Err(TotpFault::BadSecret(_))));
    }

    #[test]
    fn provisioning_uri_names_issuer_and_account() -> Result<(), TotpFault> {
        let verifier = TotpVerifier::new("Varco Portal".to_string());
        let uri = verifier.provisioning_uri(SECRET, "alice")?;
        assert!(uri.starts_with("otpauth://totp/"));
        assert!(uri.contains("alice"));
        assert!(uri.contains("Varco%20Portal"));
        Ok(())
    }

    #[test]
    fn file_store_lookup_and_entries() -> anyhow::Result<()> {
        let mut map = HashMap::new();
        map.insert("alice".to_string(), SECRET.to_string());
        let store = FileSecretStore::from_map(map);
        assert_eq!(store.lookup("alice")?, Some(SECRET.to_string()));
        assert_eq!(store.lookup("bob")?, None);
        assert_eq!(store.entries()?.len(), 1);
        Ok(())
    }
}
