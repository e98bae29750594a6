//! OpenAPI document for the gateway's own endpoints (the proxied wildcard
//! surface belongs to the backends and is not documented here).

use axum::response::{IntoResponse, Json};
use utoipa::OpenApi;

use crate::api::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "varco",
        description = "Employee portal gateway: two-factor directory authentication and role-based dashboard routing"
    ),
    paths(
        handlers::health::health,
        handlers::health::healthz,
        handlers::health::ready,
        handlers::metrics::metrics,
        handlers::login::login,
        handlers::second_factor::totp_form,
        handlers::second_factor::totp_verify,
        handlers::session::session,
        handlers::session::logout,
        handlers::enroll::enroll,
    ),
    tags(
        (name = "auth", description = "Two-factor login flow"),
        (name = "health", description = "Liveness and readiness"),
        (name = "observability", description = "Audit counters")
    )
)]
pub struct ApiDoc;

pub async fn serve() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_the_login_flow() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| p.as_str() == "/employee/login"));
        assert!(paths.iter().any(|p| p.as_str() == "/employee/totp"));
        assert!(paths.iter().any(|p| p.as_str() == "/health"));
    }
}
