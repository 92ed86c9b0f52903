mod config;
mod errors;
mod export;
mod llm_client;
mod models;
mod projects;
mod prompts;
mod report;
mod routes;
mod state;
mod storage;
mod uploads;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::ProjectStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Event Report API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize project store
    let store = ProjectStore::open(&config.data_dir)
        .await
        .with_context(|| format!("Failed to open data dir {}", config.data_dir.display()))?;

    // Initialize LLM client
    let llm = LlmClient::new(&config)?;
    info!("LLM client initialized (model: {})", llm.model());
    if config.llm_api_key.is_none() {
        warn!("No LLM API key configured; generation requests will fail");
    }

    let state = AppState {
        store,
        llm: Arc::new(llm),
        config: config.clone(),
    };

    let app = with_static_files(build_router(state), &config)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origins));

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Exact origins from config; `*` allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {o:?}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any)
}

/// Serves a built frontend with `index.html` as the fallback for client routes.
fn with_static_files(router: Router, config: &Config) -> Router {
    match &config.static_dir {
        Some(dir) => {
            info!("Serving static files from {}", dir.display());
            let spa = ServeDir::new(dir).not_found_service(ServeFile::new(dir.join("index.html")));
            router.fallback_service(spa)
        }
        None => router,
    }
}
