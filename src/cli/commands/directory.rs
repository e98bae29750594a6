//! Directory (LDAP) arguments.

use clap::{Arg, Command};

pub const ARG_LDAP_URL: &str = "ldap-url";
pub const ARG_LDAP_USER_BASE: &str = "ldap-user-base";
pub const ARG_MAIL_DOMAIN: &str = "mail-domain";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_LDAP_URL)
                .long(ARG_LDAP_URL)
                .help("Directory URL, example: ldap://ipa.portal.internal:389")
                .env("VARCO_LDAP_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_LDAP_USER_BASE)
                .long(ARG_LDAP_USER_BASE)
                .help("Base DN for user entries, example: cn=users,cn=accounts,dc=portal,dc=internal")
                .env("VARCO_LDAP_USER_BASE")
                .required(true),
        )
        .arg(
            Arg::new(ARG_MAIL_DOMAIN)
                .long(ARG_MAIL_DOMAIN)
                .help("Fallback mail domain when the directory entry has no mail attribute")
                .env("VARCO_MAIL_DOMAIN")
                .default_value("portal.internal"),
        )
}
