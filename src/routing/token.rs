//! Identity-token verification for the provider-evidence path.
//!
//! Default mode verifies the RS256 signature against a JWKS plus issuer,
//! audience, and expiry. The decode-only mode exists for development
//! against providers without reachable key material and must be enabled
//! explicitly; it is announced loudly at startup.

use base64ct::{Base64UrlUnpadded, Encoding};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::traits::PublicKeyParts;
use rsa::{errors::Error as RsaError, BigUint, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityTokenHeader {
    pub alg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

/// `aud` may be a single client id or a list of them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    #[must_use]
    pub fn matches(&self, expected: &str) -> bool {
        match self {
            Self::One(aud) => aud == expected,
            Self::Many(auds) => auds.iter().any(|aud| aud == expected),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RealmAccess {
    pub roles: Vec<String>,
}

/// The claims the router consumes from a provider-issued identity token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityClaims {
    pub iss: String,
    pub aud: Audience,
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realm_access: Option<RealmAccess>,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("unknown key id: {0}")]
    UnknownKid(String),
    #[error("failed to parse RSA key")]
    KeyParse,
    #[error("rsa error")]
    Rsa(#[from] RsaError),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid issuer")]
    InvalidIssuer,
    #[error("invalid audience")]
    InvalidAudience,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Parse a JWKS from JSON.
    ///
    /// # Errors
    /// Returns an error if `s` is not valid JSON or doesn't match the JWKS shape.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Select the key for a token header: exact `kid` match, else the only
    /// key when the set holds exactly one (PEM-derived sets have no real kid).
    #[must_use]
    pub fn key_for(&self, kid: Option<&str>) -> Option<&Jwk> {
        if let Some(kid) = kid {
            if let Some(key) = self.keys.iter().find(|k| k.kid == kid) {
                return Some(key);
            }
        }
        if self.keys.len() == 1 {
            return self.keys.first();
        }
        None
    }

    /// Build a JWKS from an RSA public key (PEM or DER).
    ///
    /// # Errors
    /// Returns an error if the key cannot be parsed.
    pub fn from_rsa_public_key_pem_or_der(
        pem_or_der: &[u8],
        kid: impl Into<String>,
    ) -> Result<Self, TokenError> {
        let public_key = decode_public_key(pem_or_der)?;
        let jwk = Jwk::from_rsa_public_key(&public_key, kid);
        Ok(Self { keys: vec![jwk] })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwk {
    pub kty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    pub kid: String,
    pub n: String,
    pub e: String,
}

impl Jwk {
    #[must_use]
    pub fn from_rsa_public_key(public_key: &RsaPublicKey, kid: impl Into<String>) -> Self {
        let n = Base64UrlUnpadded::encode_string(&public_key.n().to_bytes_be());
        let e = Base64UrlUnpadded::encode_string(&public_key.e().to_bytes_be());
        Self {
            kty: "RSA".to_string(),
            alg: Some("RS256".to_string()),
            key_use: Some("sig".to_string()),
            kid: kid.into(),
            n,
            e,
        }
    }

    /// Convert this JWK to an `RsaPublicKey`.
    ///
    /// # Errors
    /// Returns an error if the base64url values cannot be decoded or the RSA
    /// key is invalid.
    pub fn to_rsa_public_key(&self) -> Result<RsaPublicKey, TokenError> {
        let n_bytes = Base64UrlUnpadded::decode_vec(&self.n).map_err(|_| TokenError::Base64)?;
        let e_bytes = Base64UrlUnpadded::decode_vec(&self.e).map_err(|_| TokenError::Base64)?;
        let n = BigUint::from_bytes_be(&n_bytes);
        let e = BigUint::from_bytes_be(&e_bytes);
        RsaPublicKey::new(n, e).map_err(TokenError::Rsa)
    }
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| TokenError::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn decode_public_key(pem_or_der: &[u8]) -> Result<RsaPublicKey, TokenError> {
    if pem_or_der.starts_with(b"-----BEGIN") {
        let s = std::str::from_utf8(pem_or_der).map_err(|_| TokenError::KeyParse)?;
        if let Ok(k) = RsaPublicKey::from_public_key_pem(s) {
            return Ok(k);
        }
        if let Ok(k) = RsaPublicKey::from_pkcs1_pem(s) {
            return Ok(k);
        }
        return Err(TokenError::KeyParse);
    }

    if let Ok(k) = RsaPublicKey::from_public_key_der(pem_or_der) {
        return Ok(k);
    }
    if let Ok(k) = RsaPublicKey::from_pkcs1_der(pem_or_der) {
        return Ok(k);
    }
    Err(TokenError::KeyParse)
}

/// Parse an RSA private key (PEM or DER). Used for token minting in tests
/// and tooling; the gateway itself only verifies.
///
/// # Errors
/// Returns an error if the key cannot be parsed.
pub fn decode_private_key(pem_or_der: &[u8]) -> Result<RsaPrivateKey, TokenError> {
    if pem_or_der.starts_with(b"-----BEGIN") {
        let s = std::str::from_utf8(pem_or_der).map_err(|_| TokenError::KeyParse)?;
        if let Ok(k) = RsaPrivateKey::from_pkcs8_pem(s) {
            return Ok(k);
        }
        if let Ok(k) = RsaPrivateKey::from_pkcs1_pem(s) {
            return Ok(k);
        }
        return Err(TokenError::KeyParse);
    }

    if let Ok(k) = RsaPrivateKey::from_pkcs8_der(pem_or_der) {
        return Ok(k);
    }
    if let Ok(k) = RsaPrivateKey::from_pkcs1_der(pem_or_der) {
        return Ok(k);
    }
    Err(TokenError::KeyParse)
}

/// Create an RS256-signed identity token.
///
/// # Errors
/// Returns an error if claims/header JSON cannot be encoded or signing fails.
pub fn sign_rs256(
    private_key: &RsaPrivateKey,
    kid: impl Into<String>,
    claims: &IdentityClaims,
) -> Result<String, TokenError> {
    let header = IdentityTokenHeader {
        alg: "RS256".to_string(),
        typ: Some("JWT".to_string()),
        kid: Some(kid.into()),
    };
    let header_b64 = b64e_json(&header)?;
    let claims_b64 = b64e_json(claims)?;
    let signing_input = format!("{header_b64}.{claims_b64}");

    let signing_key = SigningKey::<Sha256>::new(private_key.clone());
    let signature: Signature = signing_key.sign(signing_input.as_bytes());
    let signature_b64 = Base64UrlUnpadded::encode_string(&signature.to_vec());

    Ok(format!("{signing_input}.{signature_b64}"))
}

fn split_token(token: &str) -> Result<(&str, &str, &str), TokenError> {
    let mut parts = token.split('.');
    let header = parts.next().ok_or(TokenError::TokenFormat)?;
    let claims = parts.next().ok_or(TokenError::TokenFormat)?;
    let signature = parts.next().ok_or(TokenError::TokenFormat)?;
    if parts.next().is_some() {
        return Err(TokenError::TokenFormat);
    }
    Ok((header, claims, signature))
}

/// Verify an RS256 identity token and return its decoded claims.
///
/// # Errors
///
/// Returns an error if:
/// - the token is malformed or contains invalid base64/json,
/// - no key in the JWKS fits the header,
/// - the signature is invalid,
/// - the claims fail validation (`iss`, `aud`, `exp`).
pub fn verify_rs256(
    token: &str,
    jwks: &Jwks,
    expected_issuer: &str,
    expected_audience: &str,
    now_unix_seconds: i64,
) -> Result<IdentityClaims, TokenError> {
    let (header_b64, claims_b64, sig_b64) = split_token(token)?;

    let header: IdentityTokenHeader = b64d_json(header_b64)?;
    if header.alg != "RS256" {
        return Err(TokenError::UnsupportedAlg(header.alg));
    }

    let jwk = jwks
        .key_for(header.kid.as_deref())
        .ok_or_else(|| TokenError::UnknownKid(header.kid.unwrap_or_default()))?;

    let public_key = jwk.to_rsa_public_key()?;
    let verifying_key = VerifyingKey::<Sha256>::new(public_key);
    let signing_input = format!("{header_b64}.{claims_b64}");
    let signature_bytes = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| TokenError::Base64)?;
    let signature =
        Signature::try_from(signature_bytes.as_slice()).map_err(|_| TokenError::InvalidSignature)?;
    verifying_key
        .verify(signing_input.as_bytes(), &signature)
        .map_err(|_| TokenError::InvalidSignature)?;

    let claims: IdentityClaims = b64d_json(claims_b64)?;
    if claims.iss != expected_issuer {
        return Err(TokenError::InvalidIssuer);
    }
    if !claims.aud.matches(expected_audience) {
        return Err(TokenError::InvalidAudience);
    }
    if claims.exp <= now_unix_seconds {
        return Err(TokenError::Expired);
    }

    Ok(claims)
}

/// Decode claims without verification. Development only.
///
/// # Errors
/// Returns an error if the token is malformed.
pub fn decode_insecure(token: &str) -> Result<IdentityClaims, TokenError> {
    let (_header, claims_b64, _sig) = split_token(token)?;
    b64d_json(claims_b64)
}

/// Configured token handling for the provider-evidence path.
pub enum TokenVerifier {
    Verified {
        jwks: Jwks,
        issuer: String,
        audience: String,
    },
    /// Decode without verification; never use outside development.
    InsecureDecode,
}

impl TokenVerifier {
    /// Decode a presented token according to the configured mode.
    ///
    /// # Errors
    /// Propagates [`TokenError`] from parsing or verification.
    pub fn decode(&self, token: &str) -> Result<IdentityClaims, TokenError> {
        match self {
            Self::Verified {
                jwks,
                issuer,
                audience,
            } => {
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
                    .unwrap_or(0);
                verify_rs256(token, jwks, issuer, audience, now)
            }
            Self::InsecureDecode => decode_insecure(token),
        }
    }

    #[must_use]
    pub fn is_insecure(&self) -> bool {
        matches!(self, Self::InsecureDecode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn test_key() -> RsaPrivateKey {
        use rand::rngs::OsRng;
        RsaPrivateKey::new(&mut OsRng, 2048).expect("rsa keygen")
    }

    fn test_claims() -> IdentityClaims {
        IdentityClaims {
            iss: "https://sso.portal.internal/realms/portal".to_string(),
            aud: Audience::One("employee-portal".to_string()),
            exp: NOW + 300,
            iat: Some(NOW),
            preferred_username: Some("alice".to_string()),
            email: Some("alice@portal.internal".to_string()),
            realm_access: Some(RealmAccess {
                roles: vec!["hr".to_string(), "sales".to_string()],
            }),
        }
    }

    fn jwks_for(key: &RsaPrivateKey, kid: &str) -> Jwks {
        Jwks {
            keys: vec![Jwk::from_rsa_public_key(&RsaPublicKey::from(key), kid)],
        }
    }

    #[test]
    fn sign_and_verify_round_trip() -> Result<(), TokenError> {
        let key = test_key();
        let jwks = jwks_for(&key, "k1");
        let token = sign_rs256(&key, "k1", &test_claims())?;

        let verified = verify_rs256(
            &token,
            &jwks,
            "https://sso.portal.internal/realms/portal",
            "employee-portal",
            NOW,
        )?;
        assert_eq!(verified.preferred_username.as_deref(), Some("alice"));
        assert_eq!(
            verified.realm_access.map(|a| a.roles),
            Some(vec!["hr".to_string(), "sales".to_string()])
        );
        Ok(())
    }

    #[test]
    fn rejects_expired_wrong_issuer_wrong_audience() -> Result<(), TokenError> {
        let key = test_key();
        let jwks = jwks_for(&key, "k1");
        let token = sign_rs256(&key, "k1", &test_claims())?;
        let issuer = "https://sso.portal.internal/realms/portal";

        let result = verify_rs256(&token, &jwks, issuer, "wrong-aud", NOW);
        assert!(matches!(result, Err(TokenError::InvalidAudience)));

        let result = verify_rs256(&token, &jwks, "https://elsewhere", "employee-portal", NOW);
        assert!(matches!(result, Err(TokenError::InvalidIssuer)));

        let result = verify_rs256(&token, &jwks, issuer, "employee-portal", NOW + 9999);
        assert!(matches!(result, Err(TokenError::Expired)));
        Ok(())
    }

    #[test]
    fn rejects_tampered_signature() -> Result<(), TokenError> {
        let key = test_key();
        let other = test_key();
        let jwks = jwks_for(&key, "k1");
        // Signed by a different key entirely.
        let token = sign_rs256(&other, "k1", &test_claims())?;

        let result = verify_rs256(
            &token,
            &jwks,
            "https://sso.portal.internal/realms/portal",
            "employee-portal",
            NOW,
        );
        assert!(matches!(result, Err(TokenError::InvalidSignature)));
        Ok(())
    }

    #[test]
    fn single_key_jwks_tolerates_missing_kid() -> Result<(), TokenError> {
        let key = test_key();
        let jwks = jwks_for(&key, "pem-derived");
        let token = sign_rs256(&key, "some-other-kid", &test_claims())?;

        // kid doesn't match, but a one-key set is unambiguous.
        let verified = verify_rs256(
            &token,
            &jwks,
            "https://sso.portal.internal/realms/portal",
            "employee-portal",
            NOW,
        )?;
        assert_eq!(verified.email.as_deref(), Some("alice@portal.internal"));
        Ok(())
    }

    #[test]
    fn insecure_decode_skips_verification() -> Result<(), TokenError> {
        let key = test_key();
        let token = sign_rs256(&key, "k1", &test_claims())?;
        let claims = decode_insecure(&token)?;
        assert_eq!(claims.preferred_username.as_deref(), Some("alice"));

        assert!(matches!(
            decode_insecure("not-a-token"),
            Err(TokenError::TokenFormat)
        ));
        Ok(())
    }

    #[test]
    fn audience_matches_string_or_array() {
        let one = Audience::One("a".to_string());
        assert!(one.matches("a"));
        assert!(!one.matches("b"));
        let many = Audience::Many(vec!["a".to_string(), "b".to_string()]);
        assert!(many.matches("b"));
        assert!(!many.matches("c"));
    }

    #[test]
    fn token_format_requires_three_parts() {
        assert!(matches!(
            split_token("a.b"),
            Err(TokenError::TokenFormat)
        ));
        assert!(matches!(
            split_token("a.b.c.d"),
            Err(TokenError::TokenFormat)
        ));
        assert!(split_token("a.b.c").is_ok());
    }
}
