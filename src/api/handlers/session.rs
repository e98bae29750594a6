//! Session introspection and logout.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use super::{bearer_token, clear_cookie, cookie_value, PENDING_COOKIE, SESSION_COOKIE};
use crate::api::Gateway;

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub department: String,
    pub groups: Vec<String>,
    pub issued_at_unix: u64,
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| cookie_value(headers, SESSION_COOKIE))
}

/// Introspect the current session. Missing cookies are "no session" rather
/// than an error, to avoid leaking auth state.
#[utoipa::path(
    get,
    path = "/employee/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(gateway: Extension<Arc<Gateway>>, headers: HeaderMap) -> Response {
    let Some(token) = session_token(&headers) else {
        return StatusCode::NO_CONTENT.into_response();
    };
    match gateway.store.session(&token).await {
        Some(session) => Json(SessionResponse {
            username: session.identity.username,
            full_name: session.identity.full_name,
            email: session.identity.email,
            department: session.department,
            groups: session.identity.groups,
            issued_at_unix: session.issued_at_unix,
        })
        .into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Terminate the session and any pending record, then send the client to the
/// public landing page. Idempotent: logging out twice is fine.
#[utoipa::path(
    get,
    path = "/logout",
    responses(
        (status = 303, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(gateway: Extension<Arc<Gateway>>, headers: HeaderMap) -> Response {
    let session = session_token(&headers);
    let pending = cookie_value(&headers, PENDING_COOKIE);
    gateway
        .flow
        .logout(session.as_deref(), pending.as_deref())
        .await;

    // Always clear both cookies, even if no record existed server-side.
    let secure = gateway.config.cookie_secure();
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_cookie(SESSION_COOKIE, secure) {
        response_headers.append(SET_COOKIE, cookie);
    }
    if let Ok(cookie) = clear_cookie(PENDING_COOKIE, secure) {
        response_headers.append(SET_COOKIE, cookie);
    }
    (response_headers, Redirect::to("/")).into_response()
}
