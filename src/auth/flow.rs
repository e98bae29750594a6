//! The two-checkpoint authentication flow.
//!
//! `Anonymous → PendingSecondFactor → Authenticated`; `Denied` re-enters
//! `Anonymous`. There is no path to `Authenticated` that skips the first
//! checkpoint: only [`AuthFlow::authenticate_primary`] produces a pending
//! record, and only a pending record can be promoted.

use secrecy::SecretString;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

use crate::auth::error::AuthError;
use crate::auth::session::{
    AuthenticatedSession, Identity, PendingAuthentication, SessionStore,
};
use crate::auth::totp::{self, SecretStore, TotpVerifier};
use crate::config::GatewayConfig;
use crate::directory::{Directory, DirectoryFault};
use crate::observe::{AuthEvent, AuthObserver};
use crate::routing::table::RoutingTable;

pub struct AuthFlow {
    directory: Arc<dyn Directory>,
    secrets: Option<Arc<dyn SecretStore>>,
    verifier: TotpVerifier,
    table: Arc<RoutingTable>,
    store: Arc<SessionStore>,
    observer: Arc<dyn AuthObserver>,
    config: GatewayConfig,
}

impl AuthFlow {
    #[must_use]
    pub fn new(
        directory: Arc<dyn Directory>,
        secrets: Option<Arc<dyn SecretStore>>,
        verifier: TotpVerifier,
        table: Arc<RoutingTable>,
        store: Arc<SessionStore>,
        observer: Arc<dyn AuthObserver>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            directory,
            secrets,
            verifier,
            table,
            store,
            observer,
            config,
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// First checkpoint: directory bind plus department authorization.
    ///
    /// Grants nothing; on success the caller holds a pending record that
    /// still needs the second factor.
    ///
    /// # Errors
    ///
    /// `InvalidDepartment` before any directory call for unknown departments;
    /// `InvalidCredentials` for any bind failure (no enumeration);
    /// `Unauthorized` when the required group is missing; `Directory` when
    /// the directory itself is unreachable.
    pub async fn authenticate_primary(
        &self,
        username: &str,
        password: &SecretString,
        department: &str,
    ) -> Result<PendingAuthentication, AuthError> {
        let username = username.trim();
        if username.is_empty() {
            self.observer.record(&AuthEvent::InvalidCredentials {
                username,
                department,
            });
            return Err(AuthError::InvalidCredentials);
        }

        let Some(route) = self.table.department(department) else {
            self.observer.record(&AuthEvent::InvalidDepartment {
                username,
                department,
            });
            return Err(AuthError::InvalidDepartment);
        };

        let entry = match self.directory.authenticate(username, password).await {
            Ok(entry) => entry,
            Err(DirectoryFault::BadCredentials | DirectoryFault::EntryNotFound) => {
                self.observer.record(&AuthEvent::InvalidCredentials {
                    username,
                    department,
                });
                return Err(AuthError::InvalidCredentials);
            }
            Err(DirectoryFault::Unavailable(detail)) => {
                error!(username, %detail, "directory unavailable");
                self.observer.record(&AuthEvent::DirectoryUnavailable {
                    username,
                    detail: &detail,
                });
                return Err(AuthError::Directory(detail));
            }
        };

        if !entry.groups.iter().any(|group| group == &route.group) {
            self.observer.record(&AuthEvent::UnauthorizedDepartment {
                username,
                department,
                groups: &entry.groups,
            });
            return Err(AuthError::Unauthorized);
        }

        self.observer.record(&AuthEvent::PrimaryAuthSucceeded {
            username,
            department,
        });

        // Fallback policy for optional directory attributes.
        let full_name = entry.display_name.unwrap_or_else(|| username.to_string());
        let email = entry
            .email
            .unwrap_or_else(|| format!("{username}@{}", self.config.mail_domain()));

        Ok(PendingAuthentication {
            username: username.to_string(),
            full_name,
            email,
            department: department.to_string(),
            groups: entry.groups,
            created_at: Instant::now(),
        })
    }

    /// Run the first checkpoint and park the result in the pending store.
    /// Returns the pending cookie token.
    ///
    /// # Errors
    /// Propagates [`Self::authenticate_primary`] failures; store failures
    /// surface as `Configuration`.
    pub async fn begin(
        &self,
        username: &str,
        password: &SecretString,
        department: &str,
    ) -> Result<String, AuthError> {
        let pending = self
            .authenticate_primary(username, password, department)
            .await?;
        self.store
            .insert_pending(pending)
            .await
            .map_err(|err| AuthError::Configuration(err.to_string()))
    }

    /// Second checkpoint: validate the TOTP code and promote the pending
    /// record into a session.
    ///
    /// Returns the session cookie token and the session. The pending record
    /// is consumed only on success; any failure leaves it in place for a
    /// retry with a fresh code.
    ///
    /// # Errors
    ///
    /// `SessionExpired` when the pending record is absent, expired, or lost
    /// to a concurrent promotion; `InvalidCodeFormat`, `NotEnrolled`,
    /// `Configuration`, and `InvalidCode` per their meanings.
    pub async fn complete_second_factor(
        &self,
        pending_token: &str,
        code: &str,
    ) -> Result<(String, AuthenticatedSession), AuthError> {
        let Some(pending) = self.store.peek_pending(pending_token).await else {
            self.observer.record(&AuthEvent::SecondFactorExpired);
            return Err(AuthError::SessionExpired);
        };
        let username = pending.username.clone();

        let code = totp::normalize_code(code);
        if !totp::valid_code_format(&code) {
            self.observer.record(&AuthEvent::InvalidCodeFormat {
                username: &username,
            });
            return Err(AuthError::InvalidCodeFormat);
        }

        let Some(secrets) = self.secrets.as_ref() else {
            self.observer.record(&AuthEvent::SecondFactorMisconfigured {
                detail: "no secret store configured",
            });
            return Err(AuthError::Configuration(
                "no secret store configured".to_string(),
            ));
        };

        let secret = match secrets.lookup(&username) {
            Ok(Some(secret)) => secret,
            Ok(None) => {
                self.observer.record(&AuthEvent::NotEnrolled {
                    username: &username,
                });
                return Err(AuthError::NotEnrolled);
            }
            Err(err) => {
                error!(username = %username, "secret store lookup failed: {err}");
                self.observer.record(&AuthEvent::SecondFactorMisconfigured {
                    detail: "secret store lookup failed",
                });
                return Err(AuthError::Configuration(err.to_string()));
            }
        };

        match self.verifier.verify(&secret, &username, &code) {
            Ok(true) => {}
            Ok(false) => {
                self.observer.record(&AuthEvent::InvalidCode {
                    username: &username,
                });
                return Err(AuthError::InvalidCode);
            }
            Err(err) => {
                error!(username = %username, "totp verification fault: {err}");
                self.observer.record(&AuthEvent::SecondFactorMisconfigured {
                    detail: "totp verification fault",
                });
                return Err(AuthError::Configuration(err.to_string()));
            }
        }

        // Atomic consume: a concurrent submission of the same valid code
        // loses the take and restarts at primary auth.
        let Some(pending) = self.store.take_pending(pending_token).await else {
            self.observer.record(&AuthEvent::SecondFactorExpired);
            return Err(AuthError::SessionExpired);
        };

        let identity = Identity {
            username: pending.username,
            full_name: pending.full_name,
            email: pending.email,
            groups: pending.groups,
        };
        let session = AuthenticatedSession::new(identity, pending.department);

        let token = self
            .store
            .insert_session(session.clone())
            .await
            .map_err(|err| AuthError::Configuration(err.to_string()))?;

        self.observer.record(&AuthEvent::LoginSucceeded {
            username: &session.identity.username,
            department: &session.department,
        });
        debug!(
            username = %session.identity.username,
            department = %session.department,
            "session issued"
        );

        Ok((token, session))
    }

    /// Terminate a session and discard any pending record. Idempotent.
    pub async fn logout(&self, session_token: Option<&str>, pending_token: Option<&str>) {
        if let Some(token) = session_token {
            if let Some(session) = self.store.session(token).await {
                self.observer.record(&AuthEvent::LoggedOut {
                    username: &session.identity.username,
                });
            }
            self.store.remove_session(token).await;
        }
        if let Some(token) = pending_token {
            self.store.remove_pending(token).await;
        }
    }
}
