use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use luregate_core::behavior::ActivityTracker;

mod config;
mod deception;
mod error;
mod forward;
mod middleware;
mod oracle;
mod pipeline;
mod routes;
mod state;
mod store;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Luregate",
        version = "0.1.0",
        description = "Deception gateway: scores inbound traffic, forwards the clean, and answers attackers with cached fabrications."
    ),
    paths(
        routes::health::health_check,
        routes::report::recent_decisions,
    ),
    components(schemas(
        HealthResponse,
        routes::report::DecisionRecord,
        routes::report::ReportResponse,
    ))
)]
struct ApiDoc;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "luregate_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = Arc::new(config::GatewayConfig::from_env().expect("invalid configuration"));

    // Database connection
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    sqlx::migrate!("../migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let http = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .build()
        .expect("Failed to build HTTP client");

    let ollama = oracle::OllamaClient::new(
        http.clone(),
        config.oracle_url.clone(),
        config.oracle_model.clone(),
        config.advisory_timeout,
        config.generation_timeout,
    );

    let engine = pipeline::PipelineEngine::new(
        store::PgStore::new(pool.clone()),
        ollama.clone(),
        ollama,
        ActivityTracker::new(config.behavior_window_secs),
        config.trusted_prefixes.clone(),
    );

    let app_state = state::AppState {
        db: pool,
        config: config.clone(),
        pipeline: Arc::new(engine),
        http,
    };

    // The ops surface is routed explicitly; everything else falls through to
    // the proxy handler, which decides between deception and forwarding.
    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::report::router().layer(middleware::rate_limit::report_layer()))
        .fallback(routes::proxy::handle)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Luregate listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
