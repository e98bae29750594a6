//! Audit/metrics collaborator.
//!
//! The authentication flow and the router emit one event per decision point;
//! implementations decide what to do with them. The default keeps atomic
//! counters for the `/metrics` snapshot, tests substitute a recorder, and a
//! no-op exists for callers that want neither.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};
use utoipa::ToSchema;

/// One decision-point outcome, with the subject detail audit needs.
#[derive(Clone, Copy, Debug)]
pub enum AuthEvent<'a> {
    PrimaryAuthSucceeded {
        username: &'a str,
        department: &'a str,
    },
    InvalidCredentials {
        username: &'a str,
        department: &'a str,
    },
    InvalidDepartment {
        username: &'a str,
        department: &'a str,
    },
    /// An authenticated identity requested a department outside its
    /// memberships. Higher audit severity than a failed bind.
    UnauthorizedDepartment {
        username: &'a str,
        department: &'a str,
        groups: &'a [String],
    },
    DirectoryUnavailable {
        username: &'a str,
        detail: &'a str,
    },
    SecondFactorExpired,
    InvalidCodeFormat {
        username: &'a str,
    },
    NotEnrolled {
        username: &'a str,
    },
    SecondFactorMisconfigured {
        detail: &'a str,
    },
    InvalidCode {
        username: &'a str,
    },
    LoginSucceeded {
        username: &'a str,
        department: &'a str,
    },
    LoggedOut {
        username: &'a str,
    },
    RequestForwarded {
        username: &'a str,
        role: &'a str,
    },
    RequestRejected {
        reason: &'a str,
    },
    BackendFailed {
        target: &'a str,
        reason: &'a str,
    },
}

impl AuthEvent<'_> {
    /// Stable label for counters and test assertions.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::PrimaryAuthSucceeded { .. } => "primary_auth_succeeded",
            Self::InvalidCredentials { .. } => "invalid_credentials",
            Self::InvalidDepartment { .. } => "invalid_department",
            Self::UnauthorizedDepartment { .. } => "unauthorized_department",
            Self::DirectoryUnavailable { .. } => "directory_unavailable",
            Self::SecondFactorExpired => "second_factor_expired",
            Self::InvalidCodeFormat { .. } => "invalid_code_format",
            Self::NotEnrolled { .. } => "not_enrolled",
            Self::SecondFactorMisconfigured { .. } => "second_factor_misconfigured",
            Self::InvalidCode { .. } => "invalid_code",
            Self::LoginSucceeded { .. } => "login_succeeded",
            Self::LoggedOut { .. } => "logged_out",
            Self::RequestForwarded { .. } => "request_forwarded",
            Self::RequestRejected { .. } => "request_rejected",
            Self::BackendFailed { .. } => "backend_failed",
        }
    }
}

pub trait AuthObserver: Send + Sync {
    fn record(&self, event: &AuthEvent<'_>);
}

#[derive(Clone, Debug)]
pub struct NoopObserver;

impl AuthObserver for NoopObserver {
    fn record(&self, _event: &AuthEvent<'_>) {}
}

/// Counter snapshot served by `/metrics`.
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct CounterSnapshot {
    pub primary_auth_succeeded: u64,
    pub invalid_credentials: u64,
    pub invalid_department: u64,
    pub unauthorized_department: u64,
    pub directory_unavailable: u64,
    pub second_factor_expired: u64,
    pub invalid_code_format: u64,
    pub not_enrolled: u64,
    pub second_factor_misconfigured: u64,
    pub invalid_code: u64,
    pub login_succeeded: u64,
    pub logged_out: u64,
    pub request_forwarded: u64,
    pub request_rejected: u64,
    pub backend_failed: u64,
}

/// Default observer: audit lines through `tracing` plus atomic counters.
#[derive(Debug, Default)]
pub struct CounterObserver {
    primary_auth_succeeded: AtomicU64,
    invalid_credentials: AtomicU64,
    invalid_department: AtomicU64,
    unauthorized_department: AtomicU64,
    directory_unavailable: AtomicU64,
    second_factor_expired: AtomicU64,
    invalid_code_format: AtomicU64,
    not_enrolled: AtomicU64,
    second_factor_misconfigured: AtomicU64,
    invalid_code: AtomicU64,
    login_succeeded: AtomicU64,
    logged_out: AtomicU64,
    request_forwarded: AtomicU64,
    request_rejected: AtomicU64,
    backend_failed: AtomicU64,
}

impl CounterObserver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            primary_auth_succeeded: self.primary_auth_succeeded.load(Ordering::Relaxed),
            invalid_credentials: self.invalid_credentials.load(Ordering::Relaxed),
            invalid_department: self.invalid_department.load(Ordering::Relaxed),
            unauthorized_department: self.unauthorized_department.load(Ordering::Relaxed),
            directory_unavailable: self.directory_unavailable.load(Ordering::Relaxed),
            second_factor_expired: self.second_factor_expired.load(Ordering::Relaxed),
            invalid_code_format: self.invalid_code_format.load(Ordering::Relaxed),
            not_enrolled: self.not_enrolled.load(Ordering::Relaxed),
            second_factor_misconfigured: self.second_factor_misconfigured.load(Ordering::Relaxed),
            invalid_code: self.invalid_code.load(Ordering::Relaxed),
            login_succeeded: self.login_succeeded.load(Ordering::Relaxed),
            logged_out: self.logged_out.load(Ordering::Relaxed),
            request_forwarded: self.request_forwarded.load(Ordering::Relaxed),
            request_rejected: self.request_rejected.load(Ordering::Relaxed),
            backend_failed: self.backend_failed.load(Ordering::Relaxed),
        }
    }

    fn counter(&self, event: &AuthEvent<'_>) -> &AtomicU64 {
        match event {
            AuthEvent::PrimaryAuthSucceeded { .. } => &self.primary_auth_succeeded,
            AuthEvent::InvalidCredentials { .. } => &self.invalid_credentials,
            AuthEvent::InvalidDepartment { .. } => &self.invalid_department,
            AuthEvent::UnauthorizedDepartment { .. } => &self.unauthorized_department,
            AuthEvent::DirectoryUnavailable { .. } => &self.directory_unavailable,
            AuthEvent::SecondFactorExpired => &self.second_factor_expired,
            AuthEvent::InvalidCodeFormat { .. } => &self.invalid_code_format,
            AuthEvent::NotEnrolled { .. } => &self.not_enrolled,
            AuthEvent::SecondFactorMisconfigured { .. } => &self.second_factor_misconfigured,
            AuthEvent::InvalidCode { .. } => &self.invalid_code,
            AuthEvent::LoginSucceeded { .. } => &self.login_succeeded,
            AuthEvent::LoggedOut { .. } => &self.logged_out,
            AuthEvent::RequestForwarded { .. } => &self.request_forwarded,
            AuthEvent::RequestRejected { .. } => &self.request_rejected,
            AuthEvent::BackendFailed { .. } => &self.backend_failed,
        }
    }

    fn audit(event: &AuthEvent<'_>) {
        match event {
            AuthEvent::PrimaryAuthSucceeded {
                username,
                department,
            } => info!(event = event.name(), username, department),
            AuthEvent::InvalidCredentials {
                username,
                department,
            } => warn!(event = event.name(), username, department),
            AuthEvent::InvalidDepartment {
                username,
                department,
            } => warn!(event = event.name(), username, department),
            AuthEvent::UnauthorizedDepartment {
                username,
                department,
                groups,
            } => warn!(
                event = event.name(),
                username,
                department,
                groups = %groups.join(","),
            ),
            AuthEvent::DirectoryUnavailable { username, detail } => {
                warn!(event = event.name(), username, detail);
            }
            AuthEvent::SecondFactorExpired => warn!(event = event.name()),
            AuthEvent::InvalidCodeFormat { username }
            | AuthEvent::NotEnrolled { username }
            | AuthEvent::InvalidCode { username } => warn!(event = event.name(), username),
            AuthEvent::SecondFactorMisconfigured { detail } => {
                warn!(event = event.name(), detail);
            }
            AuthEvent::LoginSucceeded {
                username,
                department,
            } => info!(event = event.name(), username, department),
            AuthEvent::LoggedOut { username } => info!(event = event.name(), username),
            AuthEvent::RequestForwarded { username, role } => {
                info!(event = event.name(), username, role);
            }
            AuthEvent::RequestRejected { reason } => warn!(event = event.name(), reason),
            AuthEvent::BackendFailed { target, reason } => {
                warn!(event = event.name(), target, reason);
            }
        }
    }
}

impl AuthObserver for CounterObserver {
    fn record(&self, event: &AuthEvent<'_>) {
        Self::audit(event);
        self.counter(event).fetch_add(1, Ordering::Relaxed);
    }
}
