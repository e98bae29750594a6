//! Enrollment listing: `otpauth://` provisioning URIs for enrolled subjects.
//! QR rendering is presentation and stays with the frontend.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use super::error_response;
use crate::api::Gateway;

#[derive(Debug, Serialize, ToSchema)]
pub struct EnrollmentEntry {
    pub username: String,
    pub otpauth_url: String,
}

#[utoipa::path(
    get,
    path = "/employee/enroll",
    responses(
        (status = 200, description = "Provisioning URIs for all enrolled subjects", body = [EnrollmentEntry]),
        (status = 500, description = "Second-factor subsystem misconfigured")
    ),
    tag = "auth"
)]
pub async fn enroll(gateway: Extension<Arc<Gateway>>) -> Response {
    let Some(secrets) = gateway.secrets.as_ref() else {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "second-factor system not configured".to_string(),
            None,
        );
    };

    let entries = match secrets.entries() {
        Ok(entries) => entries,
        Err(err) => {
            error!("Failed to list TOTP secrets: {err}");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "second-factor system not configured".to_string(),
                None,
            );
        }
    };

    let mut listed = Vec::with_capacity(entries.len());
    for (username, secret) in entries {
        match gateway.verifier.provisioning_uri(&secret, &username) {
            Ok(otpauth_url) => listed.push(EnrollmentEntry {
                username,
                otpauth_url,
            }),
            Err(err) => {
                error!(username = %username, "unusable TOTP secret: {err}");
            }
        }
    }

    Json(listed).into_response()
}
