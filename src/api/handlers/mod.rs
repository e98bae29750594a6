//! Handler modules plus the cookie and error plumbing they share.

pub mod enroll;
pub mod forward;
pub mod health;
pub mod login;
pub mod metrics;
pub mod second_factor;
pub mod session;

use axum::http::header::{InvalidHeaderValue, AUTHORIZATION, COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use utoipa::ToSchema;

pub(crate) const SESSION_COOKIE: &str = "varco_session";
pub(crate) const PENDING_COOKIE: &str = "varco_pending";

/// JSON error body; the department list rides along on login failures so the
/// (externally rendered) form can be redisplayed without another round trip.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departments: Option<Vec<String>>,
}

pub(crate) fn error_response(
    status: StatusCode,
    message: String,
    departments: Option<Vec<String>>,
) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message,
            departments,
        }),
    )
        .into_response()
}

/// Build an `HttpOnly` cookie with a bounded lifetime.
pub(crate) fn build_cookie(
    name: &str,
    value: &str,
    max_age_seconds: u64,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie =
        format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_cookie(name: &str, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Read one cookie's value from the request headers.
pub(crate) fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == name {
            return Some(val.to_string());
        }
    }
    None
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Extract a client IP from common proxy headers.
pub(crate) fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_value_walks_pairs() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("other=1; varco_session=s1; varco_pending=p1"),
        );
        assert_eq!(
            cookie_value(&headers, PENDING_COOKIE),
            Some("p1".to_string())
        );
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn build_and_clear_cookie_flags() -> Result<(), InvalidHeaderValue> {
        let cookie = build_cookie(SESSION_COOKIE, "token", 28_800, false)?;
        let value = cookie.to_str().expect("ascii");
        assert!(value.contains("Max-Age=28800"));
        assert!(value.contains("HttpOnly"));
        assert!(!value.contains("Secure"));

        let cookie = build_cookie(SESSION_COOKIE, "token", 60, true)?;
        assert!(cookie.to_str().expect("ascii").contains("Secure"));

        let cleared = clear_cookie(SESSION_COOKIE, false)?;
        assert!(cleared.to_str().expect("ascii").contains("Max-Age=0"));
        Ok(())
    }

    #[test]
    fn bearer_token_requires_value() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn client_ip_prefers_forwarded_chain_head() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("1.2.3.4, 5.6.7.8"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(extract_client_ip(&headers), Some("1.2.3.4".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(extract_client_ip(&headers), Some("9.9.9.9".to_string()));

        assert_eq!(extract_client_ip(&HeaderMap::new()), None);
    }
}
