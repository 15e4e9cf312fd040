//! Bruteguard HTTP - JSON transport adapter for the brute-force guard.
//!
//! Provides:
//! - `POST /auth` verdicts for authentication attempts
//! - bucket reset and allow/deny list management (admin, optionally token-guarded)
//! - health, Prometheus metrics and the OpenAPI document
//! - request-ID and trace middleware

pub mod error;
pub mod middleware;
pub mod routes;
pub mod types;
pub mod validate;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use bruteguard_service::ServiceState;

use error::ErrorBody;

// ---------------------------------------------------------------------------
// OpenAPI
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bruteguard API",
        description = "Brute-force protection for authentication services.\n\nEach attempt is rate limited per login, per password and per source address using sliding windows. Allow-listed subnets always pass; deny-listed subnets never do.",
        license(name = "Apache-2.0"),
    ),
    paths(
        routes::auth::auth,
        routes::auth::reset,
        routes::lists::add_allow,
        routes::lists::remove_allow,
        routes::lists::list_allow,
        routes::lists::add_deny,
        routes::lists::remove_deny,
        routes::lists::list_deny,
        routes::system::health,
    ),
    components(
        schemas(
            types::AuthRequest, types::OkResponse, types::ResetRequest,
            types::SubnetRequest, types::SubnetListResponse, types::HealthResponse,
            ErrorBody,
        )
    ),
    modifiers(&BearerScheme),
    tags(
        (name = "Access", description = "Authentication attempt verdicts"),
        (name = "Admin", description = "Bucket resets"),
        (name = "Lists", description = "Allow-list and deny-list management"),
        (name = "System", description = "System and health endpoints"),
    )
)]
struct ApiDoc;

struct BearerScheme;

impl Modify for BearerScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// The OpenAPI document as served at `/api/openapi.json`.
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Builds the HTTP API router.
///
/// Admin routes (`/reset`, `/whitelist`, `/blacklist`) sit behind the
/// bearer-token check; `/auth`, `/health` and `/metrics` never do.
pub fn router(state: ServiceState) -> Router {
    let admin = Router::new()
        .route("/reset", post(routes::auth::reset))
        .route(
            "/whitelist",
            get(routes::lists::list_allow)
                .post(routes::lists::add_allow)
                .delete(routes::lists::remove_allow),
        )
        .route(
            "/blacklist",
            get(routes::lists::list_deny)
                .post(routes::lists::add_deny)
                .delete(routes::lists::remove_deny),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::admin_auth_middleware,
        ));

    let public = Router::new()
        .route("/auth", post(routes::auth::auth))
        .route("/health", get(routes::system::health))
        .route("/metrics", get(routes::system::metrics_endpoint))
        .route(
            "/api/openapi.json",
            get(|| async { axum::Json(openapi()) }),
        );

    public
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(
            middleware::request_id::request_id_middleware,
        ))
        .with_state(state)
}

/// Serve the HTTP router on the given listener with graceful shutdown.
pub async fn serve(
    listener: tokio::net::TcpListener,
    app: Router,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use bruteguard_service::limiter::LimitConfig;
    use bruteguard_service::{ServiceConfig, ServiceState};

    use super::router;

    fn state(admin_token: Option<&str>) -> ServiceState {
        let config = ServiceConfig {
            login: LimitConfig::new(2, std::time::Duration::from_secs(60)),
            admin_token: admin_token.map(String::from),
            ..ServiceConfig::default()
        };
        ServiceState::new_in_memory(&config)
    }

    async fn send(
        app: &axum::Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn post_auth(app: &axum::Router, login: &str, ip: &str) -> (StatusCode, Value) {
        let body = json!({"login": login, "password": "hunter2", "ip": ip});
        send(app, "POST", "/auth", Some(body), None).await
    }

    #[tokio::test]
    async fn auth_is_limited_per_login() {
        let app = router(state(None));

        for _ in 0..2 {
            let (status, body) = post_auth(&app, "alice", "10.0.0.1").await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["ok"], true);
        }
        let (_, body) = post_auth(&app, "alice", "10.0.0.2").await;
        assert_eq!(body["ok"], false);

        let (_, body) = post_auth(&app, "bob", "10.0.0.1").await;
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn auth_rejects_bad_input() {
        let app = router(state(None));

        let (status, body) = post_auth(&app, "alice", "300.1.1.1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");

        let (status, _) = post_auth(&app, "alice", "0.0.0.0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_auth(&app, "", "10.0.0.1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn deny_list_blocks_and_allow_list_overrides() {
        let app = router(state(None));
        let subnet = json!({"ip": "192.168.1.0", "mask": "255.255.255.0"});

        let (status, _) = send(&app, "POST", "/blacklist", Some(subnet.clone()), None).await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, body) = post_auth(&app, "carol", "192.168.1.9").await;
        assert_eq!(body["ok"], false);

        let (status, _) = send(&app, "POST", "/whitelist", Some(subnet), None).await;
        assert_eq!(status, StatusCode::CREATED);
        for _ in 0..5 {
            let (_, body) = post_auth(&app, "carol", "192.168.1.9").await;
            assert_eq!(body["ok"], true);
        }
    }

    #[tokio::test]
    async fn mapped_address_hits_ipv4_deny_list() {
        let app = router(state(None));
        let subnet = json!({"ip": "10.0.0.0/8"});

        let (status, _) = send(&app, "POST", "/blacklist", Some(subnet), None).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = post_auth(&app, "gina", "::ffff:10.1.2.3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], false);
    }

    #[tokio::test]
    async fn list_conflicts_and_missing_entries() {
        let app = router(state(None));
        let subnet = json!({"ip": "10.20.0.0/16"});

        let (status, _) = send(&app, "POST", "/whitelist", Some(subnet.clone()), None).await;
        assert_eq!(status, StatusCode::CREATED);
        let same = json!({"ip": "10.20.3.4", "mask": "16"});
        let (status, body) = send(&app, "POST", "/whitelist", Some(same), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "already_exists");

        let (status, body) = send(&app, "GET", "/whitelist", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subnets"], json!(["10.20.0.0/16"]));

        let (status, _) = send(&app, "DELETE", "/whitelist", Some(subnet.clone()), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&app, "DELETE", "/whitelist", Some(subnet), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn reset_restores_login_bucket() {
        let app = router(state(None));
        for _ in 0..3 {
            post_auth(&app, "dave", "10.1.1.1").await;
        }
        let (_, body) = post_auth(&app, "dave", "10.1.1.1").await;
        assert_eq!(body["ok"], false);

        let reset = json!({"login": "dave", "ip": "10.1.1.1"});
        let (status, body) = send(&app, "POST", "/reset", Some(reset), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);

        let (_, body) = post_auth(&app, "dave", "10.1.1.1").await;
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn admin_routes_require_token_when_configured() {
        let app = router(state(Some("s3cret")));

        let (status, body) = send(&app, "GET", "/blacklist", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");

        let (status, _) = send(&app, "GET", "/blacklist", None, Some("wrong")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, "GET", "/blacklist", None, Some("s3cret")).await;
        assert_eq!(status, StatusCode::OK);

        // Verdicts and health stay open.
        let (status, _) = post_auth(&app, "erin", "10.2.2.2").await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["admin_auth"], true);
    }

    #[tokio::test]
    async fn request_id_is_echoed() {
        let app = router(state(None));
        let req = Request::builder()
            .uri("/health")
            .header("x-request-id", "abc-123")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.headers()["x-request-id"], "abc-123");
    }

    #[tokio::test]
    async fn metrics_count_verdicts() {
        let app = router(state(None));
        post_auth(&app, "frank", "10.3.3.3").await;

        let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("bruteguard_verdicts_total{decision=\"passed\",allowed=\"true\"} 1"));
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let app = router(state(None));
        let (status, body) = send(&app, "GET", "/api/openapi.json", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/auth"].is_object());
        assert!(body["paths"]["/whitelist"]["delete"].is_object());
    }
}
