//! Threatscape Intelligence Server
//!
//! Proactive threat intelligence pipeline: organizational DNA ingestion,
//! PIR generation, multi-source threat collection, risk correlation, and
//! attack-path threat modeling.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    THREATSCAPE SERVER                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌────────────┐  ┌──────────────────────────┐ │
//! │  │  API      │  │  Pipeline  │  │  Collection Agents       │ │
//! │  │  Gateway  │  │  Stages    │  │  (NVD / GHSA / OTX)      │ │
//! │  │  (Axum)   │  │  (LLM)     │  │                          │ │
//! │  └─────┬─────┘  └─────┬──────┘  └────────────┬─────────────┘ │
//! │        └──────────────┼─────────────────────┘                │
//! │                       ▼                                      │
//! │               ┌───────────────┐                              │
//! │               │  Graph Store  │                              │
//! │               └───────────────┘                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod collect;
mod config;
mod correlate;
mod dna;
mod error;
mod graph;
mod handlers;
mod keywords;
mod llm;
mod models;
mod pipeline;
mod pir;
mod threat_model;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use graph::{GraphStore, MemoryGraph};
use llm::{LanguageModel, OpenAiModel};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "threatscape=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    tracing::info!("Threatscape server starting...");
    if config.openai_api_key.is_empty() {
        tracing::warn!("OPENAI_API_KEY is not set; LLM-backed stages will fail");
    }

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .expect("Failed to build HTTP client");

    let mut model = OpenAiModel::new(
        http.clone(),
        config.openai_api_key.clone(),
        config.openai_model.clone(),
    );
    if let Some(base_url) = &config.openai_base_url {
        model = model.with_base_url(base_url.clone());
    }

    // Build application state
    let state = AppState {
        config: config.clone(),
        http,
        llm: Arc::new(model),
        graph: Arc::new(MemoryGraph::new()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listen address");
    axum::serve(listener, app).await.expect("Server error");
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub http: reqwest::Client,
    pub llm: Arc<dyn LanguageModel>,
    pub graph: Arc<dyn GraphStore>,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/api/v1/dna/documents", post(handlers::dna::ingest))
        .route("/api/v1/pirs", get(handlers::pirs::generate))
        .route("/api/v1/threats/collect", post(handlers::threats::collect))
        .route("/api/v1/threats/correlate", post(handlers::threats::correlate))
        .route("/api/v1/pipeline/run", post(handlers::pipeline::run))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
