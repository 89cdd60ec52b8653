//! services/api/src/bin/navigator.rs

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use navigator_lib::{
    adapters::{SemanticScholarAdapter, SupabaseAuth, SupabaseStore},
    config::{Config, ConfigError},
    error::ApiError,
    web::{self, rest::ApiDoc, state::SessionRegistry, AppState},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// How often sessions past their idle timeout or max age are dropped.
const SESSION_SWEEP_PERIOD: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize Service Adapters ---
    // One HTTP client (and connection pool) shared by every adapter.
    let http = reqwest::Client::builder()
        .user_agent(concat!("research-navigator/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let store = Arc::new(SupabaseStore::new(
        http.clone(),
        &config.supabase_url,
        config.supabase_anon_key.clone(),
    ));
    let identity = Arc::new(SupabaseAuth::new(
        http.clone(),
        &config.supabase_url,
        config.supabase_anon_key.clone(),
    ));
    let papers = Arc::new(SemanticScholarAdapter::new(
        http,
        config.search_api_url.clone(),
        config.search_result_limit,
    ));
    info!("Using paper search API at {}", config.search_api_url);

    // --- 3. Build the Shared AppState ---
    let sessions = SessionRegistry::new();
    let _sweeper = sessions.spawn_sweeper(SESSION_SWEEP_PERIOD);
    let app_state = Arc::new(AppState {
        store,
        identity,
        papers,
        config: config.clone(),
        sessions,
    });

    let cors_origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string())
    })?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 4. Create the Web Router ---
    let app = web::router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors);

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
