//! Single-attempt request forwarding to a dashboard backend.
//!
//! One inbound request, one upstream attempt; retry policy belongs to the
//! caller or operator, never here. Redirects are relayed, not followed, so
//! the client's browser resolves them against the original host.

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderValue, Method};
use axum::response::Response;
use std::time::Duration;

use crate::routing::error::RouteError;
use crate::routing::evidence::{HEADER_EMAIL, HEADER_GROUPS, HEADER_USER};

pub const HEADER_PRIMARY_ROLE: &str = "x-primary-role";

/// Never sent upstream: framing and connection headers reqwest manages
/// itself, plus the identity headers only this gateway may set.
const SKIPPED_REQUEST_HEADERS: [&str; 10] = [
    "host",
    "connection",
    "content-length",
    "transfer-encoding",
    "accept-encoding",
    "upgrade",
    HEADER_EMAIL,
    HEADER_USER,
    HEADER_GROUPS,
    HEADER_PRIMARY_ROLE,
];

/// Stripped from the relayed response to avoid double-framing.
const SKIPPED_RESPONSE_HEADERS: [&str; 4] = [
    "content-encoding",
    "content-length",
    "transfer-encoding",
    "connection",
];

/// Identity context attached to every forwarded request so backends can
/// display user context without re-deriving authorization.
#[derive(Clone, Debug)]
pub struct ForwardIdentity {
    pub email: String,
    pub username: String,
    /// Normalized role set, comma-joined.
    pub roles: String,
    pub primary_role: String,
    pub client_ip: Option<String>,
    pub proto: String,
}

pub struct ForwardClient {
    client: reqwest::Client,
}

impl ForwardClient {
    /// Build the upstream client: bounded timeout, no auto-redirects.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Forward one request to `target` at the same path and query.
    ///
    /// # Errors
    ///
    /// `BackendUnavailable` on connection failure, `BackendTimeout` past the
    /// deadline, `ProxyInternalError` for anything else. Exactly one attempt.
    pub async fn forward(
        &self,
        target: &str,
        path_and_query: &str,
        method: Method,
        headers: &HeaderMap,
        body: Bytes,
        identity: &ForwardIdentity,
    ) -> Result<Response, RouteError> {
        let url = format!("{}{path_and_query}", target.trim_end_matches('/'));

        let mut upstream_headers = HeaderMap::new();
        for (name, value) in headers {
            if SKIPPED_REQUEST_HEADERS
                .iter()
                .any(|skip| name.as_str().eq_ignore_ascii_case(skip))
            {
                continue;
            }
            upstream_headers.append(name.clone(), value.clone());
        }
        attach_identity(&mut upstream_headers, identity)?;

        let upstream = self
            .client
            .request(method, &url)
            .headers(upstream_headers)
            .body(body)
            .send()
            .await
            .map_err(|err| classify(&err))?;

        let status = upstream.status();
        let mut relayed = HeaderMap::new();
        for (name, value) in upstream.headers() {
            if SKIPPED_RESPONSE_HEADERS
                .iter()
                .any(|skip| name.as_str().eq_ignore_ascii_case(skip))
            {
                continue;
            }
            relayed.append(name.clone(), value.clone());
        }

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = relayed;
        Ok(response)
    }
}

fn attach_identity(
    headers: &mut HeaderMap,
    identity: &ForwardIdentity,
) -> Result<(), RouteError> {
    let mut set = |name: &'static str, value: &str| -> Result<(), RouteError> {
        let value = HeaderValue::from_str(value)
            .map_err(|_| RouteError::ProxyInternalError(format!("unencodable header {name}")))?;
        headers.insert(name, value);
        Ok(())
    };
    set(HEADER_EMAIL, &identity.email)?;
    set(HEADER_USER, &identity.username)?;
    set(HEADER_GROUPS, &identity.roles)?;
    set(HEADER_PRIMARY_ROLE, &identity.primary_role)?;
    set("x-forwarded-proto", &identity.proto)?;
    if let Some(ip) = identity.client_ip.as_deref() {
        set("x-forwarded-for", ip)?;
    }
    Ok(())
}

fn classify(err: &reqwest::Error) -> RouteError {
    if err.is_timeout() {
        RouteError::BackendTimeout(err.to_string())
    } else if err.is_connect() {
        RouteError::BackendUnavailable(err.to_string())
    } else {
        RouteError::ProxyInternalError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderName;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Router;
    use tokio::net::TcpListener;

    fn identity() -> ForwardIdentity {
        ForwardIdentity {
            email: "x@y.com".to_string(),
            username: "x".to_string(),
            roles: "sales".to_string(),
            primary_role: "sales".to_string(),
            client_ip: Some("10.1.2.3".to_string()),
            proto: "http".to_string(),
        }
    }

    async fn echo(headers: HeaderMap) -> impl IntoResponse {
        let role = headers
            .get(HEADER_PRIMARY_ROLE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none")
            .to_string();
        let injected = headers
            .get(HEADER_GROUPS)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none")
            .to_string();
        let mut response_headers = HeaderMap::new();
        response_headers.insert(
            HeaderName::from_static("x-echo-role"),
            HeaderValue::from_str(&role).expect("role header"),
        );
        response_headers.insert(
            HeaderName::from_static("x-echo-groups"),
            HeaderValue::from_str(&injected).expect("groups header"),
        );
        response_headers.insert(
            HeaderName::from_static("content-encoding"),
            HeaderValue::from_static("identity"),
        );
        (response_headers, "dashboard body")
    }

    async fn spawn_backend() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let app = Router::new()
            .route("/", get(echo))
            .route("/hr/dashboard", get(echo));
        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service())
                .await
                .expect("serve");
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn forwards_with_identity_headers_and_strips_framing() -> anyhow::Result<()> {
        let target = spawn_backend().await;
        let client = ForwardClient::new(Duration::from_secs(5))?;

        // A client-supplied identity header must never reach the backend.
        let mut inbound = HeaderMap::new();
        inbound.insert(HEADER_GROUPS, HeaderValue::from_static("admin"));

        let response = client
            .forward(
                &target,
                "/hr/dashboard",
                Method::GET,
                &inbound,
                Bytes::new(),
                &identity(),
            )
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("x-echo-role")
                .and_then(|v| v.to_str().ok()),
            Some("sales")
        );
        // The gateway's value won, not the client's "admin".
        assert_eq!(
            response
                .headers()
                .get("x-echo-groups")
                .and_then(|v| v.to_str().ok()),
            Some("sales")
        );
        assert!(response.headers().get("content-encoding").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn connection_refused_maps_to_backend_unavailable() -> anyhow::Result<()> {
        // Bind then drop to find a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let client = ForwardClient::new(Duration::from_secs(2))?;
        let result = client
            .forward(
                &format!("http://{addr}"),
                "/",
                Method::GET,
                &HeaderMap::new(),
                Bytes::new(),
                &identity(),
            )
            .await;
        assert!(matches!(result, Err(RouteError::BackendUnavailable(_))));
        Ok(())
    }
}
