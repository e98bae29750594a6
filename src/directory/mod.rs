//! Directory seam: credential verification and attribute lookup.
//!
//! The directory is the system of record for identity and group membership.
//! The gateway consumes it through one capability — "bind with these
//! credentials and return the subject's attributes" — so tests can substitute
//! an in-memory implementation.

mod ldap;

pub use ldap::LdapDirectory;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

/// Raw attributes returned by a directory lookup.
///
/// Display name and mail are optional on purpose; fallback policy
/// (username, `<username>@<mail-domain>`) belongs to the caller, not the
/// directory.
#[derive(Clone, Debug, Default)]
pub struct DirectoryEntry {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub groups: Vec<String>,
}

#[derive(Debug, Error)]
pub enum DirectoryFault {
    /// Bind rejected: wrong credentials, unknown user, or locked account.
    /// Callers must not surface which.
    #[error("directory bind rejected")]
    BadCredentials,
    /// Entry missing after a successful bind (deleted mid-flight or base DN mismatch).
    #[error("subject entry not found")]
    EntryNotFound,
    /// Transport or protocol failure talking to the directory.
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Directory: Send + Sync {
    /// Bind with the subject's credentials and return their attributes.
    async fn authenticate(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<DirectoryEntry, DirectoryFault>;
}

/// Extract the leaf group name from a group DN: the value of the first RDN.
///
/// `cn=hr,cn=groups,cn=accounts,dc=portal,dc=internal` → `hr`.
#[must_use]
pub fn group_from_dn(dn: &str) -> Option<String> {
    let first = dn.split(',').next()?;
    let mut parts = first.splitn(2, '=');
    let _attr = parts.next()?;
    let value = parts.next()?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
