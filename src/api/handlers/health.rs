use crate::GIT_COMMIT_HASH;
use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    status: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Gateway is healthy", body = Health)
    ),
    tag = "health"
)]
pub async fn health() -> impl IntoResponse {
    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "ok".to_string(),
    };

    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);

            let mut headers = HeaderMap::new();
            headers.insert("X-App", x_app_header_value);
            headers
        })
        .map_err(|err| {
            error!("Failed to parse X-App header: {}", err);
        });

    let headers = headers.unwrap_or_else(|()| HeaderMap::new());

    (StatusCode::OK, headers, Json(health))
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Probe {
    service: String,
    status: String,
}

/// Probe path kept for compatibility with the original router deployment.
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Gateway is live", body = Probe)
    ),
    tag = "health"
)]
pub async fn healthz() -> impl IntoResponse {
    Json(Probe {
        service: env!("CARGO_PKG_NAME").to_string(),
        status: "ok".to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/ready",
    responses(
        (status = 200, description = "Gateway is ready to serve", body = Probe)
    ),
    tag = "health"
)]
pub async fn ready() -> impl IntoResponse {
    Json(Probe {
        service: env!("CARGO_PKG_NAME").to_string(),
        status: "ready".to_string(),
    })
}
