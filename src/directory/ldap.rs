//! LDAP-backed [`Directory`] implementation.

use async_trait::async_trait;
use ldap3::{dn_escape, ldap_escape, LdapConnAsync, Scope, SearchEntry};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info_span, warn, Instrument};

use super::{group_from_dn, Directory, DirectoryEntry, DirectoryFault};

const USER_ATTRIBUTES: [&str; 3] = ["cn", "mail", "memberOf"];

/// Directory client binding as the subject itself (no service account).
#[derive(Clone, Debug)]
pub struct LdapDirectory {
    url: String,
    user_base: String,
}

impl LdapDirectory {
    #[must_use]
    pub fn new(url: String, user_base: String) -> Self {
        Self { url, user_base }
    }

    fn user_dn(&self, username: &str) -> String {
        format!("uid={},{}", dn_escape(username), self.user_base)
    }
}

#[async_trait]
impl Directory for LdapDirectory {
    async fn authenticate(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<DirectoryEntry, DirectoryFault> {
        // An empty password would be an anonymous bind, never a credential proof.
        if password.expose_secret().is_empty() {
            return Err(DirectoryFault::BadCredentials);
        }

        let (conn, mut ldap) = LdapConnAsync::new(&self.url)
            .await
            .map_err(|err| DirectoryFault::Unavailable(err.to_string()))?;
        ldap3::drive!(conn);

        let user_dn = self.user_dn(username);

        let bind_span = info_span!("ldap.bind", ldap.url = %self.url);
        let bind = ldap
            .simple_bind(&user_dn, password.expose_secret())
            .instrument(bind_span)
            .await
            .map_err(|err| DirectoryFault::Unavailable(err.to_string()))?;
        if bind.success().is_err() {
            // Wrong password, unknown user, and locked account all land here.
            let _ = ldap.unbind().await;
            return Err(DirectoryFault::BadCredentials);
        }
        debug!(username, "directory bind successful");

        let filter = format!("(uid={})", ldap_escape(username));
        let search_span = info_span!("ldap.search", ldap.base = %self.user_base);
        let search = ldap
            .search(
                &self.user_base,
                Scope::Subtree,
                &filter,
                USER_ATTRIBUTES.to_vec(),
            )
            .instrument(search_span)
            .await
            .map_err(|err| DirectoryFault::Unavailable(err.to_string()))?;
        let (entries, _result) = search
            .success()
            .map_err(|err| DirectoryFault::Unavailable(err.to_string()))?;

        let _ = ldap.unbind().await;

        let Some(entry) = entries.into_iter().next() else {
            warn!(username, "bind succeeded but entry missing under user base");
            return Err(DirectoryFault::EntryNotFound);
        };
        let entry = SearchEntry::construct(entry);

        let display_name = entry
            .attrs
            .get("cn")
            .and_then(|values| values.first())
            .cloned();
        let email = entry
            .attrs
            .get("mail")
            .and_then(|values| values.first())
            .cloned();
        let groups = entry
            .attrs
            .get("memberOf")
            .map(|dns| dns.iter().filter_map(|dn| group_from_dn(dn)).collect())
            .unwrap_or_default();

        Ok(DirectoryEntry {
            display_name,
            email,
            groups,
        })
    }
}
