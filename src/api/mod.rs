use anyhow::{Context, Result, anyhow};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Method, Request, header::CONTENT_TYPE},
    middleware,
    routing::{get, post},
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;
use url::Url;

pub mod email;
pub mod handlers;
mod openapi;
pub mod state;
pub mod users;

pub use openapi::openapi;

use crate::{
    session::{SessionConfig, SessionCookieAuth, require_session},
    sweeper::ExpirySweeper,
    token::{PgTokenStore, TokenService},
};
use handlers::{health, login, session};
use state::{AuthConfig, AuthState};
use users::{PgUsers, User};

/// All routes with request-id propagation and request tracing.
///
/// `GET /v1/auth/session` sits behind `require_session`; everything else is public.
pub fn router(auth_state: Arc<AuthState>) -> Router {
    let protected = Router::new()
        .route("/v1/auth/session", get(session::session))
        .route_layer(middleware::from_fn_with_state(
            auth_state.session().clone(),
            require_session::<User>,
        ));

    Router::new()
        .route("/health", get(health::health))
        .route("/v1/auth/login-link", post(login::login_link))
        .route("/v1/auth/redeem", post(login::redeem))
        .route("/v1/auth/logout", post(session::logout))
        .merge(protected)
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
                .layer(Extension(auth_state)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: String,
    auth_config: AuthConfig,
    session_config: SessionConfig,
    sweep_interval: Duration,
) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let users = Arc::new(PgUsers::new(pool.clone()));
    let tokens: Arc<TokenService<User>> = Arc::new(TokenService::new(
        Arc::new(PgTokenStore::new(pool)),
        users.clone(),
    ));
    let session = Arc::new(SessionCookieAuth::new(tokens.clone(), session_config));
    let auth_state = Arc::new(AuthState::new(
        auth_config,
        session,
        users,
        Arc::new(email::LogLoginMailer),
    ));

    // Expired records never validate; the sweep only keeps the table small.
    let sweeper = ExpirySweeper::new(tokens)
        .with_interval(sweep_interval)
        .spawn();

    let frontend_origin = frontend_origin(auth_state.config().frontend_base_url())?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    let app = router(auth_state).layer(cors);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    sweeper.abort();

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

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}
