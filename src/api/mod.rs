//! Router wiring and server lifecycle.

use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{any, get, post},
    Extension, Router,
};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    propagate_header::PropagateHeaderLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, warn, Span};
use ulid::Ulid;

use crate::auth::{AuthFlow, SecretStore, SessionStore, TotpVerifier};
use crate::config::GatewayConfig;
use crate::directory::Directory;
use crate::observe::CounterObserver;
use crate::routing::{ForwardClient, RoutingTable, TokenVerifier};

pub mod handlers;
mod openapi;

pub use openapi::ApiDoc;

/// Everything a request handler needs, assembled once at startup and shared
/// behind an `Arc`.
pub struct Gateway {
    pub(crate) flow: AuthFlow,
    pub(crate) store: Arc<SessionStore>,
    pub(crate) table: Arc<RoutingTable>,
    pub(crate) counters: Arc<CounterObserver>,
    pub(crate) forwarder: ForwardClient,
    pub(crate) tokens: Option<TokenVerifier>,
    pub(crate) trust_proxy_headers: bool,
    pub(crate) config: GatewayConfig,
    pub(crate) secrets: Option<Arc<dyn SecretStore>>,
    pub(crate) verifier: TotpVerifier,
}

impl Gateway {
    /// Wire the flow, stores, observer, and forwarding client together.
    ///
    /// # Errors
    /// Returns an error if the upstream HTTP client cannot be built.
    pub fn new(
        directory: Arc<dyn Directory>,
        secrets: Option<Arc<dyn SecretStore>>,
        table: RoutingTable,
        tokens: Option<TokenVerifier>,
        trust_proxy_headers: bool,
        config: GatewayConfig,
    ) -> Result<Self> {
        if tokens.as_ref().is_some_and(TokenVerifier::is_insecure) {
            warn!("identity tokens are DECODED WITHOUT VERIFICATION; development only");
        }
        if trust_proxy_headers {
            info!(
                "trusting X-Auth-Request-* headers; ensure an upstream proxy strips them from clients"
            );
        }

        let store = Arc::new(SessionStore::new(
            Duration::from_secs(config.pending_ttl_seconds()),
            Duration::from_secs(config.session_ttl_seconds()),
        ));
        let counters = Arc::new(CounterObserver::new());
        let table = Arc::new(table);
        let verifier = TotpVerifier::new(config.totp_issuer().to_string());
        let forwarder = ForwardClient::new(Duration::from_secs(config.forward_timeout_seconds()))?;

        let flow = AuthFlow::new(
            directory,
            secrets.clone(),
            verifier.clone(),
            table.clone(),
            store.clone(),
            counters.clone(),
            config.clone(),
        );

        Ok(Self {
            flow,
            store,
            table,
            counters,
            forwarder,
            tokens,
            trust_proxy_headers,
            config,
            secrets,
            verifier,
        })
    }
}

/// Build the full route set. Fixed paths win over the proxy wildcard.
#[must_use]
pub fn router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/healthz", get(handlers::health::healthz))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(handlers::metrics::metrics))
        .route("/api-docs/openapi.json", get(openapi::serve))
        .route("/employee/login", post(handlers::login::login))
        .route(
            "/employee/totp",
            get(handlers::second_factor::totp_form).post(handlers::second_factor::totp_verify),
        )
        .route("/employee/session", get(handlers::session::session))
        .route("/employee/enroll", get(handlers::enroll::enroll))
        .route("/logout", get(handlers::session::logout))
        .route("/", any(handlers::forward::forward))
        .route("/*path", any(handlers::forward::forward))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &Request<Body>| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateHeaderLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(gateway)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, gateway: Gateway) -> Result<()> {
    let app = router(Arc::new(gateway));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
