//! The reverse-proxy path: resolve identity evidence, collapse roles to one
//! backend, forward once, relay the response.

use axum::{
    body::to_bytes,
    extract::{Extension, Request},
    http::HeaderMap,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{bearer_token, cookie_value, error_response, extract_client_ip, SESSION_COOKIE};
use crate::api::Gateway;
use crate::observe::{AuthEvent, AuthObserver};
use crate::routing::evidence::{self, HEADER_EMAIL, HEADER_USER};
use crate::routing::{authorize_and_select_target, ForwardIdentity, RouteError, Subject};

/// Forwarded bodies are buffered; dashboards exchange forms and JSON, not
/// uploads.
const MAX_FORWARD_BODY_BYTES: usize = 10 * 1024 * 1024;

async fn resolve_subject(gateway: &Gateway, headers: &HeaderMap) -> Result<Subject, RouteError> {
    // Trusted headers only count when the deployment says the network
    // guarantees their origin.
    if gateway.trust_proxy_headers
        && (headers.contains_key(HEADER_USER) || headers.contains_key(HEADER_EMAIL))
    {
        return evidence::subject_from_headers(headers);
    }

    if let Some(verifier) = gateway.tokens.as_ref() {
        if let Some(token) = bearer_token(headers) {
            let claims = verifier
                .decode(&token)
                .map_err(|err| RouteError::InvalidAuthEvidence(err.to_string()))?;
            return evidence::subject_from_claims(&claims);
        }
    }

    if let Some(token) = cookie_value(headers, SESSION_COOKIE) {
        if let Some(session) = gateway.store.session(&token).await {
            return Ok(evidence::subject_from_session(&session, &gateway.table));
        }
    }

    Err(RouteError::InvalidAuthEvidence(
        "no identity evidence presented".to_string(),
    ))
}

fn route_error_response(err: &RouteError) -> Response {
    error_response(err.status(), err.to_string(), None)
}

pub async fn forward(gateway: Extension<Arc<Gateway>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let headers = parts.headers;

    let subject = match resolve_subject(&gateway, &headers).await {
        Ok(subject) => subject,
        Err(err) => {
            warn!(reason = err.kind(), "proxy request rejected: {err:?}");
            gateway
                .counters
                .record(&AuthEvent::RequestRejected { reason: err.kind() });
            return route_error_response(&err);
        }
    };

    let authorized = match authorize_and_select_target(&gateway.table, &subject) {
        Ok(authorized) => authorized,
        Err(err) => {
            warn!(
                username = %subject.username,
                reason = err.kind(),
                "routing denied"
            );
            gateway
                .counters
                .record(&AuthEvent::RequestRejected { reason: err.kind() });
            return route_error_response(&err);
        }
    };

    let body = match to_bytes(body, MAX_FORWARD_BODY_BYTES).await {
        Ok(body) => body,
        Err(err) => {
            let err = RouteError::ProxyInternalError(err.to_string());
            gateway
                .counters
                .record(&AuthEvent::RequestRejected { reason: err.kind() });
            return route_error_response(&err);
        }
    };

    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("http")
        .to_string();
    let identity = ForwardIdentity {
        email: subject.email.clone(),
        username: subject.username.clone(),
        roles: authorized.roles.join(","),
        primary_role: authorized.primary_role.clone(),
        client_ip: extract_client_ip(&headers),
        proto,
    };

    let path_and_query = parts
        .uri
        .path_and_query()
        .map_or("/", |pq| pq.as_str());

    debug!(
        username = %subject.username,
        role = %authorized.primary_role,
        target = %authorized.target.backend,
        "forwarding"
    );

    match gateway
        .forwarder
        .forward(
            &authorized.target.backend,
            path_and_query,
            parts.method,
            &headers,
            body,
            &identity,
        )
        .await
    {
        Ok(response) => {
            gateway.counters.record(&AuthEvent::RequestForwarded {
                username: &subject.username,
                role: &authorized.primary_role,
            });
            response
        }
        Err(err) => {
            gateway.counters.record(&AuthEvent::BackendFailed {
                target: &authorized.target.backend,
                reason: err.kind(),
            });
            route_error_response(&err)
        }
    }
}
