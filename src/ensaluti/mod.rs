use crate::{
    auth::{
        audit::{AuditLog, TracingAuditLog},
        hasher::PasswordHasher,
        rate_limit::{FixedWindowLimiter, RateLimitAction, RateLimitDecision, RateLimiter},
        session::Sessions,
        store::SqliteRecordStore,
        verifier::CredentialVerifier,
    },
    cli::globals::GlobalArgs,
    ensaluti::handlers::{extract_client_ip, health::__path_health, CookiePolicy},
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{MatchedPath, Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;

pub(crate) mod handlers;

#[derive(OpenApi)]
#[openapi(
    paths(health),
    tags(
        (name = "ensaluti", description = "Login and session service API")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, dsn: String, globals: &GlobalArgs) -> Result<()> {
    let store = SqliteRecordStore::connect(&dsn)
        .await
        .context("Failed to open credential store")?;

    let sessions = Arc::new(Sessions::new(globals.session_lifetime));
    let limiter: Arc<dyn RateLimiter> = Arc::new(FixedWindowLimiter::new(
        globals.rate_limit_per_minute,
        globals.login_rate_limit_per_minute,
    ));
    let audit: Arc<dyn AuditLog> = Arc::new(TracingAuditLog);
    let verifier = Arc::new(CredentialVerifier::new(store, PasswordHasher::new(), audit));
    let policy = CookiePolicy {
        secure: globals.secure_cookies,
    };

    let app = router(verifier, sessions, limiter, policy);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Assemble the application router. Everything except `/health` sits behind
/// the request-id, trace and rate-limit layers.
pub fn router(
    verifier: Arc<CredentialVerifier<SqliteRecordStore>>,
    sessions: Arc<Sessions>,
    limiter: Arc<dyn RateLimiter>,
    policy: CookiePolicy,
) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/login", get(handlers::login_form).post(handlers::login))
        .route("/logout", get(handlers::logout))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(middleware::from_fn_with_state(limiter.clone(), throttle))
                .layer(Extension(verifier))
                .layer(Extension(sessions))
                .layer(Extension(limiter))
                .layer(Extension(policy)),
        )
        .route("/health", get(handlers::health).options(handlers::health))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;

    info!("Gracefully shutdown");
}

/// Global fixed-window throttle across all routed paths; the login handler
/// additionally enforces its own stricter budget.
async fn throttle(
    State(limiter): State<Arc<dyn RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = extract_client_ip(request.headers());

    if limiter.check(client.as_deref(), RateLimitAction::General) == RateLimitDecision::Limited {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }

    next.run(request).await
}

fn make_span(request: &axum::http::Request<Body>) -> Span {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::rate_limit::NoopRateLimiter;
    use crate::ensaluti::handlers::login::LOGIN_ERROR_MESSAGE;
    use axum::http::{header, Request as HttpRequest};
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    struct TestApp {
        app: Router,
        _dir: tempfile::TempDir,
    }

    async fn test_app(limiter: Arc<dyn RateLimiter>) -> Result<TestApp> {
        let dir = tempfile::tempdir().context("failed to create temp dir")?;
        let dsn = format!("sqlite://{}/ensaluti.db", dir.path().display());

        let store = SqliteRecordStore::connect(&dsn).await?;
        let hasher = PasswordHasher::new();
        store
            .upsert_credential("alice", &hasher.hash("correct-horse")?)
            .await?;

        let sessions = Arc::new(Sessions::new(Duration::from_secs(30 * 60)));
        let audit: Arc<dyn AuditLog> = Arc::new(TracingAuditLog);
        let verifier = Arc::new(CredentialVerifier::new(store, hasher, audit));

        let app = router(verifier, sessions, limiter, CookiePolicy { secure: false });
        Ok(TestApp { app, _dir: dir })
    }

    fn login_request(body: &str) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method("POST")
            .uri("/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .expect("request should build")
    }

    async fn body_text(response: Response) -> String {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should collect")
            .to_bytes();
        String::from_utf8(bytes.to_vec()).expect("body should be utf-8")
    }

    #[tokio::test]
    async fn login_success_redirects_and_sets_cookie() -> Result<()> {
        let test = test_app(Arc::new(NoopRateLimiter)).await?;

        let response = test
            .app
            .oneshot(login_request("username=alice&password=correct-horse"))
            .await?;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()),
            Some("/")
        );
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .context("missing session cookie")?;
        assert!(cookie.starts_with("ensaluti_session="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age="));

        Ok(())
    }

    #[tokio::test]
    async fn login_failure_re_renders_the_form_with_generic_error() -> Result<()> {
        let test = test_app(Arc::new(NoopRateLimiter)).await?;

        for body in [
            "username=alice&password=wrong",
            "username=bob&password=whatever",
            "username=&password=x",
        ] {
            let response = test.app.clone().oneshot(login_request(body)).await?;

            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().get(header::SET_COOKIE).is_none());
            let text = body_text(response).await;
            assert!(text.contains(LOGIN_ERROR_MESSAGE));
            assert!(!text.contains("wrong"));
        }

        Ok(())
    }

    #[tokio::test]
    async fn index_reflects_the_session_cookie() -> Result<()> {
        let test = test_app(Arc::new(NoopRateLimiter)).await?;

        let login = test
            .app
            .clone()
            .oneshot(login_request("username=alice&password=correct-horse"))
            .await?;
        let cookie = login
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .context("missing session cookie")?
            .to_string();

        let signed_in = test
            .app
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .uri("/")
                    .header(header::COOKIE, cookie.as_str())
                    .body(Body::empty())?,
            )
            .await?;
        assert!(body_text(signed_in).await.contains("Signed in as"));

        let anonymous = test
            .app
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty())?)
            .await?;
        assert!(body_text(anonymous).await.contains("Not signed in"));

        Ok(())
    }

    #[tokio::test]
    async fn logout_clears_the_session() -> Result<()> {
        let test = test_app(Arc::new(NoopRateLimiter)).await?;

        let login = test
            .app
            .clone()
            .oneshot(login_request("username=alice&password=correct-horse"))
            .await?;
        let cookie = login
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .context("missing session cookie")?
            .to_string();

        let logout = test
            .app
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .uri("/logout")
                    .header(header::COOKIE, cookie.as_str())
                    .body(Body::empty())?,
            )
            .await?;
        assert_eq!(logout.status(), StatusCode::SEE_OTHER);
        let removal = logout
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .context("missing cookie removal")?;
        assert!(removal.contains("Max-Age=0"));

        let after = test
            .app
            .oneshot(
                HttpRequest::builder()
                    .uri("/")
                    .header(header::COOKIE, cookie.as_str())
                    .body(Body::empty())?,
            )
            .await?;
        assert!(body_text(after).await.contains("Not signed in"));

        Ok(())
    }

    #[tokio::test]
    async fn login_budget_returns_too_many_requests() -> Result<()> {
        let test = test_app(Arc::new(FixedWindowLimiter::new(100, 0))).await?;

        let response = test
            .app
            .oneshot(login_request("username=alice&password=correct-horse"))
            .await?;

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        Ok(())
    }

    #[tokio::test]
    async fn global_budget_covers_all_routes_except_health() -> Result<()> {
        let test = test_app(Arc::new(FixedWindowLimiter::new(0, 0))).await?;

        let index = test
            .app
            .clone()
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty())?)
            .await?;
        assert_eq!(index.status(), StatusCode::TOO_MANY_REQUESTS);

        let health = test
            .app
            .oneshot(HttpRequest::builder().uri("/health").body(Body::empty())?)
            .await?;
        assert_eq!(health.status(), StatusCode::OK);

        Ok(())
    }

    #[tokio::test]
    async fn health_reports_name_and_version() -> Result<()> {
        let test = test_app(Arc::new(NoopRateLimiter)).await?;

        let response = test
            .app
            .oneshot(HttpRequest::builder().uri("/health").body(Body::empty())?)
            .await?;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-app"));
        let text = body_text(response).await;
        assert!(text.contains(env!("CARGO_PKG_NAME")));
        assert!(text.contains(env!("CARGO_PKG_VERSION")));

        Ok(())
    }

    #[test]
    fn openapi_includes_health() {
        let doc = openapi();
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
