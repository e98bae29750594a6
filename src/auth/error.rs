//! Authentication error taxonomy.
//!
//! Every distinguishable failure is its own kind so monitoring can alert on
//! unauthorized-access attempts separately from ordinary typos. The
//! `Display` strings are the user-facing messages; anything more specific
//! stays in logs and audit events.

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Directory bind failed. Covers wrong password, unknown user, and
    /// locked accounts; the message must not reveal which.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Requested department is not in the routing table.
    #[error("invalid department selected")]
    InvalidDepartment,

    /// Bind succeeded but the required group is missing.
    #[error("access denied: you are not authorized for this department")]
    Unauthorized,

    /// Directory unreachable or protocol fault. Detail is logged, not shown.
    #[error("authentication service unavailable, try again later")]
    Directory(String),

    /// No pending record (never created, expired, or already consumed).
    #[error("session expired, please log in again")]
    SessionExpired,

    /// Submitted code is not 6 digits after normalization.
    #[error("code must be 6 digits")]
    InvalidCodeFormat,

    /// No second-factor secret enrolled for this subject.
    #[error("second factor not enrolled for this account, contact your administrator to enroll")]
    NotEnrolled,

    /// Second-factor subsystem missing or broken. Detail is logged.
    #[error("second-factor system not configured, contact your administrator")]
    Configuration(String),

    /// Code failed TOTP verification.
    #[error("invalid code, check your authenticator app and try again")]
    InvalidCode,
}

impl AuthError {
    /// HTTP status for the JSON error body.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::InvalidCode => StatusCode::UNAUTHORIZED,
            Self::InvalidDepartment | Self::InvalidCodeFormat | Self::NotEnrolled => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized => StatusCode::FORBIDDEN,
            Self::Directory(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::SessionExpired => StatusCode::UNAUTHORIZED,
            Self::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable label for audit events and counters.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::InvalidDepartment => "invalid_department",
            Self::Unauthorized => "unauthorized",
            Self::Directory(_) => "directory_error",
            Self::SessionExpired => "session_expired",
            Self::InvalidCodeFormat => "invalid_code_format",
            Self::NotEnrolled => "not_enrolled",
            Self::Configuration(_) => "configuration_error",
            Self::InvalidCode => "invalid_code",
        }
    }
}
