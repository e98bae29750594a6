//! Second-factor submission: the checkpoint that actually issues a session.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
    Form,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use super::{
    build_cookie, clear_cookie, cookie_value, error_response, ErrorBody, PENDING_COOKIE,
    SESSION_COOKIE,
};
use crate::api::Gateway;
use crate::auth::AuthError;

#[derive(Debug, Deserialize, ToSchema)]
pub struct TotpForm {
    pub code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PendingResponse {
    pub username: String,
    pub department: String,
}

/// Who is mid-login? Lets the (externally rendered) second-factor form greet
/// the subject. Without a live pending record the client is sent back to
/// primary login.
#[utoipa::path(
    get,
    path = "/employee/totp",
    responses(
        (status = 200, description = "A pending authentication exists", body = PendingResponse),
        (status = 303, description = "No pending record, restart at login")
    ),
    tag = "auth"
)]
pub async fn totp_form(gateway: Extension<Arc<Gateway>>, headers: HeaderMap) -> Response {
    let Some(token) = cookie_value(&headers, PENDING_COOKIE) else {
        return Redirect::to("/employee/login").into_response();
    };
    match gateway.store.peek_pending(&token).await {
        Some(pending) => Json(PendingResponse {
            username: pending.username,
            department: pending.department,
        })
        .into_response(),
        None => Redirect::to("/employee/login").into_response(),
    }
}

/// Submit the 6-digit code. Success promotes the pending record exactly once
/// and sets the session cookie; failures leave the record for a retry.
#[utoipa::path(
    post,
    path = "/employee/totp",
    request_body(
        content = TotpForm,
        content_type = "application/x-www-form-urlencoded"
    ),
    responses(
        (status = 303, description = "Session issued, redirected to the department dashboard"),
        (status = 400, description = "Malformed code or not enrolled", body = ErrorBody),
        (status = 401, description = "Wrong code; the pending record is preserved", body = ErrorBody),
        (status = 500, description = "Second-factor subsystem misconfigured", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn totp_verify(
    gateway: Extension<Arc<Gateway>>,
    headers: HeaderMap,
    Form(form): Form<TotpForm>,
) -> Response {
    let secure = gateway.config.cookie_secure();
    let Some(pending_token) = cookie_value(&headers, PENDING_COOKIE) else {
        return Redirect::to("/employee/login").into_response();
    };

    match gateway
        .flow
        .complete_second_factor(&pending_token, &form.code)
        .await
    {
        Ok((session_token, session)) => {
            let dashboard = gateway
                .table
                .department(&session.department)
                .map_or("/", |target| target.dashboard.as_str())
                .to_string();

            let mut response_headers = HeaderMap::new();
            let session_cookie = build_cookie(
                SESSION_COOKIE,
                &session_token,
                gateway.config.session_ttl_seconds(),
                secure,
            );
            let cleared_pending = clear_cookie(PENDING_COOKIE, secure);
            match (session_cookie, cleared_pending) {
                (Ok(session_cookie), Ok(cleared_pending)) => {
                    response_headers.append(SET_COOKIE, session_cookie);
                    response_headers.append(SET_COOKIE, cleared_pending);
                }
                _ => {
                    error!("Failed to build session cookies");
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            }
            (response_headers, Redirect::to(&dashboard)).into_response()
        }
        // Expired or consumed: restart the whole flow at primary auth.
        Err(AuthError::SessionExpired) => Redirect::to("/employee/login").into_response(),
        Err(err) => error_response(err.status(), err.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totp_form_field_name_matches_the_submitted_form() -> serde_json::Result<()> {
        let form: TotpForm = serde_json::from_value(serde_json::json!({"code": "123-456"}))?;
        assert_eq!(form.code, "123-456");
        Ok(())
    }
}
