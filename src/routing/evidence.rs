//! Identity evidence: who is asking, and with which roles.
//!
//! Three shapes produce the same [`Subject`]: trusted upstream headers,
//! verified identity-token claims, and the gateway's own session. The
//! header path is only meaningful behind a network hop that strips these
//! headers from untrusted clients; that precondition is deployment
//! configuration, not something this module can check.

use axum::http::HeaderMap;
use std::collections::BTreeSet;

use crate::auth::session::AuthenticatedSession;
use crate::routing::error::RouteError;
use crate::routing::table::RoutingTable;
use crate::routing::token::IdentityClaims;

pub const HEADER_EMAIL: &str = "x-auth-request-email";
pub const HEADER_USER: &str = "x-auth-request-user";
pub const HEADER_GROUPS: &str = "x-auth-request-groups";

/// A validated identity plus its normalized role set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subject {
    pub username: String,
    pub email: String,
    pub roles: BTreeSet<String>,
}

/// Parse a role list from either a JSON array or a comma-separated string.
/// Entries are trimmed and lower-cased; empties are discarded. Malformed
/// JSON yields the empty set, which downstream maps to `NoRolesAssigned`.
#[must_use]
pub fn extract_roles(raw: &str) -> BTreeSet<String> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        let Ok(values) = serde_json::from_str::<Vec<String>>(raw) else {
            tracing::warn!("failed to parse roles as JSON array");
            return BTreeSet::new();
        };
        return normalize_roles(values.iter().map(String::as_str));
    }
    normalize_roles(raw.split(','))
}

fn normalize_roles<'a>(values: impl Iterator<Item = &'a str>) -> BTreeSet<String> {
    values
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn validate_identity(username: &str, email: &str) -> Result<(), RouteError> {
    if username.trim().is_empty() {
        return Err(RouteError::InvalidAuthEvidence(
            "missing username".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(RouteError::InvalidAuthEvidence(format!(
            "email not email-shaped: {email}"
        )));
    }
    Ok(())
}

/// Build a subject from trusted upstream headers.
///
/// # Errors
/// `InvalidAuthEvidence` when required headers are missing or malformed.
pub fn subject_from_headers(headers: &HeaderMap) -> Result<Subject, RouteError> {
    let email = headers
        .get(HEADER_EMAIL)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| RouteError::InvalidAuthEvidence(format!("missing {HEADER_EMAIL}")))?;
    let username = headers
        .get(HEADER_USER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| RouteError::InvalidAuthEvidence(format!("missing {HEADER_USER}")))?;
    validate_identity(username, email)?;

    let roles = headers
        .get(HEADER_GROUPS)
        .and_then(|value| value.to_str().ok())
        .map(extract_roles)
        .unwrap_or_default();

    Ok(Subject {
        username: username.to_string(),
        email: email.to_string(),
        roles,
    })
}

/// Build a subject from verified identity-token claims.
///
/// # Errors
/// `InvalidAuthEvidence` when the claims lack a username or a usable email.
pub fn subject_from_claims(claims: &IdentityClaims) -> Result<Subject, RouteError> {
    let username = claims
        .preferred_username
        .as_deref()
        .unwrap_or_default()
        .trim();
    let email = claims.email.as_deref().unwrap_or_default().trim();
    validate_identity(username, email)?;

    let roles = claims
        .realm_access
        .as_ref()
        .map(|access| normalize_roles(access.roles.iter().map(String::as_str)))
        .unwrap_or_default();

    Ok(Subject {
        username: username.to_string(),
        email: email.to_string(),
        roles,
    })
}

/// Build a subject from the gateway's own session: directory groups grant
/// the roles the routing table maps them to.
#[must_use]
pub fn subject_from_session(session: &AuthenticatedSession, table: &RoutingTable) -> Subject {
    Subject {
        username: session.identity.username.clone(),
        email: session.identity.email.clone(),
        roles: table.roles_for_groups(&session.identity.groups),
    }
}
