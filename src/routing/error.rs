//! Router error taxonomy with fixed HTTP status mapping.

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouteError {
    /// Identity evidence missing or malformed (401). Detail stays in logs.
    #[error("authentication required")]
    InvalidAuthEvidence(String),

    /// Authenticated but no roles at all (403).
    #[error("forbidden: no roles assigned")]
    NoRolesAssigned,

    /// Roles present, but none appear in the precedence list (403).
    /// Deliberately distinct from [`Self::NoRolesAssigned`].
    #[error("forbidden: no matching role")]
    UnrecognizedRole,

    /// A precedence entry without a configured backend; operator error (500).
    #[error("role misconfiguration")]
    RoutingMisconfiguration(String),

    /// Connection to the backend failed (503).
    #[error("dashboard unreachable")]
    BackendUnavailable(String),

    /// Backend exceeded the forwarding deadline (504).
    #[error("dashboard timed out")]
    BackendTimeout(String),

    /// Anything else on the forwarding path (500).
    #[error("internal proxy error")]
    ProxyInternalError(String),
}

impl RouteError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidAuthEvidence(_) => StatusCode::UNAUTHORIZED,
            Self::NoRolesAssigned | Self::UnrecognizedRole => StatusCode::FORBIDDEN,
            Self::RoutingMisconfiguration(_) | Self::ProxyInternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::BackendTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Stable label for audit events and counters.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAuthEvidence(_) => "invalid_auth_evidence",
            Self::NoRolesAssigned => "no_roles_assigned",
            Self::UnrecognizedRole => "unrecognized_role",
            Self::RoutingMisconfiguration(_) => "routing_misconfiguration",
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::BackendTimeout(_) => "backend_timeout",
            Self::ProxyInternalError(_) => "proxy_internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_contract() {
        assert_eq!(
            RouteError::InvalidAuthEvidence(String::new()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(RouteError::NoRolesAssigned.status(), StatusCode::FORBIDDEN);
        assert_eq!(RouteError::UnrecognizedRole.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            RouteError::RoutingMisconfiguration(String::new()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            RouteError::BackendUnavailable(String::new()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            RouteError::BackendTimeout(String::new()).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            RouteError::ProxyInternalError(String::new()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn empty_and_unrecognized_roles_are_distinct() {
        assert_ne!(
            RouteError::NoRolesAssigned.kind(),
            RouteError::UnrecognizedRole.kind()
        );
    }

    #[test]
    fn messages_do_not_leak_detail() {
        let err = RouteError::BackendUnavailable("10.0.0.7:8501 refused".to_string());
        assert!(!err.to_string().contains("10.0.0.7"));
    }
}
