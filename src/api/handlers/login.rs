//! Primary login submission: first checkpoint of the two-factor flow.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use secrecy::SecretString;
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use super::{
    build_cookie, cookie_value, error_response, ErrorBody, PENDING_COOKIE, SESSION_COOKIE,
};
use crate::api::Gateway;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub department: String,
}

/// Submit directory credentials and a department. Success parks a pending
/// record behind a short-lived cookie and sends the client to the
/// second-factor step; nothing is granted yet.
#[utoipa::path(
    post,
    path = "/employee/login",
    request_body(
        content = LoginForm,
        content_type = "application/x-www-form-urlencoded"
    ),
    responses(
        (status = 303, description = "Credentials verified, continue at /employee/totp"),
        (status = 400, description = "Missing fields or unknown department", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 403, description = "Not authorized for the department", body = ErrorBody),
        (status = 503, description = "Directory unavailable", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login(
    gateway: Extension<Arc<Gateway>>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let secure = gateway.config.cookie_secure();

    // Already fully authenticated: skip straight to the dashboard.
    if let Some(token) = cookie_value(&headers, SESSION_COOKIE) {
        if let Some(session) = gateway.store.session(&token).await {
            let dashboard = gateway
                .table
                .department(&session.department)
                .map_or("/", |target| target.dashboard.as_str());
            return Redirect::to(dashboard).into_response();
        }
    }

    // A new login attempt discards any half-finished one.
    if let Some(token) = cookie_value(&headers, PENDING_COOKIE) {
        gateway.store.remove_pending(&token).await;
    }

    let departments = || {
        Some(
            gateway
                .table
                .departments()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
        )
    };

    if form.username.trim().is_empty() || form.password.is_empty() || form.department.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "please fill in all required fields".to_string(),
            departments(),
        );
    }

    let password = SecretString::from(form.password);
    match gateway
        .flow
        .begin(&form.username, &password, &form.department)
        .await
    {
        Ok(pending_token) => {
            let mut response_headers = HeaderMap::new();
            match build_cookie(
                PENDING_COOKIE,
                &pending_token,
                gateway.config.pending_ttl_seconds(),
                secure,
            ) {
                Ok(cookie) => {
                    response_headers.insert(SET_COOKIE, cookie);
                }
                Err(err) => {
                    error!("Failed to build pending cookie: {err}");
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            }
            (response_headers, Redirect::to("/employee/totp")).into_response()
        }
        Err(err) => error_response(err.status(), err.to_string(), departments()),
    }
}
