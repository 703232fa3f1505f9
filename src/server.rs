use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue},
    middleware,
    routing::{get, patch, post},
    Router,
};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::info;

use crate::config;
use crate::database::{MovieRepository, UserRepository};
use crate::handlers::{self, elevated, protected, public};
use crate::middleware::{admin_only, protect, rate_limit, RateLimiter};
use crate::services::{AuditLog, Mailer};

/// Shared per-process state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub movies: Arc<MovieRepository>,
    pub users: Arc<UserRepository>,
    pub mailer: Arc<dyn Mailer>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(pool: PgPool, mailer: Arc<dyn Mailer>) -> Self {
        let cfg = config::config();
        let audit = Arc::new(AuditLog::from_config(&cfg.audit));

        Self {
            movies: Arc::new(MovieRepository::new(pool.clone(), audit, cfg.audit.movie_created_by.clone())),
            users: Arc::new(UserRepository::new(pool.clone(), cfg.security.bcrypt_cost)),
            mailer,
            rate_limiter: RateLimiter::from_config(&cfg.api),
            pool,
        }
    }
}

pub fn app(state: AppState) -> Router {
    let cfg = config::config();

    let router = Router::new()
        .route("/health", get(handlers::health))
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .merge(elevated_routes(state.clone()))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(cfg.api.max_request_size_bytes))
        .layer(middleware::from_fn_with_state(state.rate_limiter.clone(), rate_limit))
        .layer(TraceLayer::new_for_http());

    let router = if cfg.security.enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    with_security_headers(router).with_state(state)
}

const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("content-security-policy", "default-src 'none'; frame-ancestors 'none'"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("origin-agent-cluster", "?1"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=15552000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-xss-protection", "0"),
];

/// Hardening headers on every response, unless a handler already set one
fn with_security_headers(router: Router<AppState>) -> Router<AppState> {
    SECURITY_HEADERS.iter().fold(router, |router, &(name, value)| {
        router.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ))
    })
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/auth/signup", post(public::signup_post))
        .route("/api/v1/auth/login", post(public::login_post))
        .route("/api/v1/auth/forgotPassword", post(public::forgot_password_post))
        .route("/api/v1/auth/resetPassword/:token", patch(public::reset_password_patch))
        .route("/api/v1/movies/highest-rated", get(public::highest_rated_get))
        .route("/api/v1/movies/movie-stats", get(public::movie_stats_get))
        .route("/api/v1/movies/movies-by-genre/:genre", get(public::movies_by_genre_get))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/movies", get(protected::movies_get))
        .route("/api/v1/movies/:id", get(protected::movie_get))
        .route("/api/v1/user/updateMyPassword", patch(protected::update_my_password_patch))
        .route("/api/v1/user/updateMe", patch(protected::update_me_patch))
        .route("/api/v1/user/deleteMe", axum::routing::delete(protected::delete_me_delete))
        .route_layer(middleware::from_fn_with_state(state, protect))
}

fn elevated_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/movies", post(elevated::movie_post))
        .route("/api/v1/movies/:id", patch(elevated::movie_patch).delete(elevated::movie_delete))
        .route("/api/v1/user", get(elevated::users_get))
        // Last layer added runs first: protect, then the role check
        .route_layer(middleware::from_fn(admin_only))
        .route_layer(middleware::from_fn_with_state(state, protect))
}

/// Bind and serve until ctrl-c
pub async fn run(state: AppState, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Movie catalog API listening on http://{}", addr);

    axum::serve(listener, app(state).into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
