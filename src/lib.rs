// src/lib.rs
use anyhow::Result;
use app_state::AppState;
use axum::{
    extract::State,
    middleware::{self, Next},
    routing::{delete, get, post},
    Router,
};
use redis::Client;
use std::env;
use std::time::Instant;

// Public exports (visible outside this module)
pub mod domain;

// Internal-only exports (sibling access within this module)
mod app_state;
mod challenge;
mod config;
mod handlers;
mod infrastructure;
mod password;
mod session;

pub use config::*;

// Publicly expose the infrastructure creation functions
pub use infrastructure::{
    create_noop_metrics, // ---
    create_postgres_repository,
    create_prom_metrics,
    create_smtp_mailer,
    create_stub_mailer,
    create_webauthn,
};

/// Build the HTTP router with metrics implementation determined by environment variables.
pub fn create_router() -> Result<Router> {
    // ---
    // Load all configuration from environment
    let config = AppConfig::from_env()?;

    // Determine metrics implementation from environment
    let metrics_type = env::var("CLUBPASS_METRICS_TYPE").unwrap_or_else(|_| "noop".to_string());
    let metrics = if metrics_type == "prom" {
        create_prom_metrics()?
    } else {
        create_noop_metrics()?
    };

    tracing_subscriber::fmt::try_init().ok(); // Ignores if already initialized

    // Create infrastructure dependencies
    let redis_client = Client::open(config.redis.url.clone())?;
    let repository = create_postgres_repository()?;
    let webauthn = std::sync::Arc::new(create_webauthn(&config.webauthn)?);
    let mailer = create_smtp_mailer(&config.smtp)?;

    // Build application state with all dependencies
    let app_state = AppState::new(
        redis_client,
        metrics,
        repository,
        webauthn,
        mailer,
        config.auth,
    );

    let router = Router::new()
        .route("/", get(handlers::root_handler))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .nest(
            "/passkey",
            Router::new()
                .route("/register/start", post(handlers::register_start))
                .route("/register/finish", post(handlers::register_finish))
                .route("/auth/start", post(handlers::auth_start))
                .route("/auth/finish", post(handlers::auth_finish))
                .route("/credentials", get(handlers::list_credentials))
                .route("/credentials/{id}", delete(handlers::delete_credential)),
        )
        .nest(
            "/password",
            Router::new()
                .route("/register", post(handlers::password_register))
                .route("/login", post(handlers::password_login))
                .route("/attach", post(handlers::password_attach))
                .route("/reset/request", post(handlers::reset_request))
                .route("/reset/confirm", post(handlers::reset_confirm)),
        )
        .nest(
            "/session",
            Router::new()
                .route("/start", post(handlers::session_start))
                .route("/me", get(handlers::session_me))
                .route("/logout", post(handlers::session_logout)),
        )
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            track_http_metrics,
        ))
        .with_state(app_state);

    Ok(router)
}

/// Records duration, path, method, and status for every request.
async fn track_http_metrics(
    State(state): State<AppState>,
    req: axum::extract::Request,
    next: Next,
) -> axum::response::Response {
    // ---
    let start = Instant::now();
    let path = req.uri().path().to_string();
    let method = req.method().to_string();

    let response = next.run(req).await;

    state
        .metrics()
        .record_http_request(start, &path, &method, response.status().as_u16());

    response
}
