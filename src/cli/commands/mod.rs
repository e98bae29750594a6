pub mod auth;
pub mod directory;
pub mod logging;
pub mod routing;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

use self::routing::{ARG_TOKEN_AUDIENCE, ARG_TOKEN_ISSUER, ARG_TOKEN_PUBLIC_KEY};

/// Check cross-argument requirements for identity-token verification.
///
/// # Errors
/// Returns an error string if `token-public-key` is set without the claims it
/// must be checked against.
pub fn validate(matches: &clap::ArgMatches) -> Result<(), String> {
    if matches.contains_id(ARG_TOKEN_PUBLIC_KEY) {
        if !matches.contains_id(ARG_TOKEN_ISSUER) {
            return Err(format!(
                "Missing required argument: --{ARG_TOKEN_ISSUER} (required with --{ARG_TOKEN_PUBLIC_KEY})"
            ));
        }
        if !matches.contains_id(ARG_TOKEN_AUDIENCE) {
            return Err(format!(
                "Missing required argument: --{ARG_TOKEN_AUDIENCE} (required with --{ARG_TOKEN_PUBLIC_KEY})"
            ));
        }
    }
    Ok(())
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("varco")
        .about("Employee Portal Gateway")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("VARCO_PORT")
                .value_parser(clap::value_parser!(u16)),
        );

    let command = directory::with_args(command);
    let command = auth::with_args(command);
    let command = routing::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Vec<&'static str> {
        vec![
            "varco",
            "--ldap-url",
            "ldap://localhost:389",
            "--ldap-user-base",
            "cn=users,cn=accounts,dc=portal,dc=internal",
        ]
    }

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "varco");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("Employee Portal Gateway".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_check_port_and_directory() {
        let command = new();
        let mut args = base_args();
        args.extend(["--port", "8443", "--mail-domain", "example.test"]);
        let matches = command.get_matches_from(args);

        assert_eq!(matches.get_one::<u16>("port").copied(), Some(8443));
        assert_eq!(
            matches.get_one::<String>(directory::ARG_LDAP_URL).cloned(),
            Some("ldap://localhost:389".to_string())
        );
        assert_eq!(
            matches
                .get_one::<String>(directory::ARG_MAIL_DOMAIN)
                .cloned(),
            Some("example.test".to_string())
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("VARCO_PORT", Some("443")),
                ("VARCO_LDAP_URL", Some("ldap://ipa:389")),
                (
                    "VARCO_LDAP_USER_BASE",
                    Some("cn=users,dc=portal,dc=internal"),
                ),
                ("VARCO_LOG_LEVEL", Some("info")),
            ],
            || {
                let command = new();
                let matches = command.get_matches_from(vec!["varco"]);
                assert_eq!(matches.get_one::<u16>("port").copied(), Some(443));
                assert_eq!(
                    matches.get_one::<String>(directory::ARG_LDAP_URL).cloned(),
                    Some("ldap://ipa:389".to_string())
                );
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        // loop cover all possible value_parse
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars(
                [
                    ("VARCO_LOG_LEVEL", Some(level)),
                    ("VARCO_LDAP_URL", Some("ldap://ipa:389")),
                    (
                        "VARCO_LDAP_USER_BASE",
                        Some("cn=users,dc=portal,dc=internal"),
                    ),
                ],
                || {
                    let command = new();
                    let matches = command.get_matches_from(vec!["varco"]);
                    assert_eq!(
                        matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                        u8::try_from(index).ok()
                    );
                },
            );
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, _) in levels.iter().enumerate() {
            temp_env::with_vars([("VARCO_LOG_LEVEL", None::<String>)], || {
                let mut args: Vec<String> =
                    base_args().into_iter().map(ToString::to_string).collect();

                // Add the appropriate number of "-v" flags based on the index
                if index > 0 {
                    let v = format!("-{}", "v".repeat(index));
                    args.push(v);
                }

                let command = new();
                let matches = command.get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }

    #[test]
    fn test_token_key_requires_claims() {
        temp_env::with_vars(
            [
                ("VARCO_TOKEN_ISSUER", None::<&str>),
                ("VARCO_TOKEN_AUDIENCE", None::<&str>),
            ],
            || {
                let command = new();
                let mut args = base_args();
                args.extend(["--token-public-key", "/tmp/provider.pem"]);
                let matches = command.get_matches_from(args);
                assert!(validate(&matches).is_err(), "Should fail missing issuer");

                let command = new();
                let mut args = base_args();
                args.extend([
                    "--token-public-key",
                    "/tmp/provider.pem",
                    "--token-issuer",
                    "https://sso.portal.internal/realms/portal",
                    "--token-audience",
                    "employee-portal",
                ]);
                let matches = command.get_matches_from(args);
                assert!(validate(&matches).is_ok());
            },
        );
    }

    #[test]
    fn test_insecure_decode_conflicts_with_key() {
        let command = new();
        let mut args = base_args();
        args.extend([
            "--token-public-key",
            "/tmp/provider.pem",
            "--insecure-token-decode",
        ]);
        let result = command.try_get_matches_from(args);
        assert_eq!(
            result.map_err(|e| e.kind()),
            Err(clap::error::ErrorKind::ArgumentConflict)
        );
    }
}
