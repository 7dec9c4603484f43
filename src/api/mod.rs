use crate::{
    api::handlers::{
        auth::{AuthConfig, AuthState, RandomPasswordGenerator},
        health, root,
    },
    api::notify::{LogNotifier, PasswordNotifier, WebhookNotifier},
    store::{CredentialStore, MemoryStore, PgStore, TokenIssuer},
};
use anyhow::{Context, Result, anyhow};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{
        HeaderName, HeaderValue, Method, Request,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, options},
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
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;
pub mod notify;
// OpenAPI router wiring and route registration live in openapi.rs.
mod openapi;

pub use openapi::openapi;

/// Assemble the application router with shared state attached.
///
/// The outer middleware (request ids, tracing, CORS) is layered on in
/// [`new`]; tests drive this router directly.
#[must_use]
pub fn router(state: Arc<AuthState>) -> Router {
    let (router, api_doc) = openapi::api_router().split_for_parts();
    router
        .route("/", get(root::root))
        .route("/health", options(health::health))
        .merge(SwaggerUi::new("/docs").url("/openapi.json", api_doc))
        .layer(Extension(state))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: String,
    config: AuthConfig,
    notify_url: Option<String>,
) -> Result<()> {
    let (store, tokens) = connect_store(&dsn).await?;

    // The log notifier is the local-dev default; a configured delivery URL
    // switches password notifications to the webhook sender.
    let notifier: Arc<dyn PasswordNotifier> = match notify_url {
        Some(url) => Arc::new(WebhookNotifier::new(url)?),
        None => Arc::new(LogNotifier),
    };
    let passwords = Arc::new(RandomPasswordGenerator::new(config.reset_password_length()));

    let frontend_origin = frontend_origin(config.frontend_base_url())?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    let state = Arc::new(AuthState::new(config, store, tokens, passwords, notifier));

    let app = router(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(cors),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Pick the storage backend from the DSN scheme: `memory://` keeps
/// everything in-process (local dev), anything else is PostgreSQL.
async fn connect_store(dsn: &str) -> Result<(Arc<dyn CredentialStore>, Arc<dyn TokenIssuer>)> {
    if dsn.starts_with("memory://") {
        info!("Using in-memory credential store");
        let store = Arc::new(MemoryStore::new());
        let credentials: Arc<dyn CredentialStore> = store.clone();
        let tokens: Arc<dyn TokenIssuer> = store;
        return Ok((credentials, tokens));
    }

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn)
        .await
        .context("Failed to connect to database")?;

    let store = Arc::new(PgStore::new(pool));
    let credentials: Arc<dyn CredentialStore> = store.clone();
    let tokens: Arc<dyn TokenIssuer> = store;
    Ok((credentials, tokens))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Gracefully shutdown");
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
