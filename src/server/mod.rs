// src/server/mod.rs
// OpenAI-compatible HTTP surface over the relay pipeline

pub mod error;
pub mod handlers;
pub mod types;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::RelayConfig;
use crate::pipeline::RelayPipeline;

pub use error::{ApiError, ApiResult};
pub use types::{ChatCompletionRequest, ModelList, RELAY_MODEL_ID};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RelayPipeline>,
    pub config: Arc<RelayConfig>,
}

impl AppState {
    pub fn new(pipeline: RelayPipeline, config: RelayConfig) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            config: Arc::new(config),
        }
    }
}

/// Create the router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allow_origins);

    Router::new()
        .route("/", get(handlers::root))
        .route("/v1/models", get(handlers::list_models))
        .route("/v1/chat/completions", post(handlers::chat_completions))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() || origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Bind and serve until `shutdown` resolves
pub async fn run(
    config: RelayConfig,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let pipeline = RelayPipeline::from_config(&config)?;
    let bind_address = config.bind_address();
    let auth = config.requires_api_key();

    let app = create_router(AppState::new(pipeline, config));
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    info!(address = %bind_address, "Relay listening on http://{}", bind_address);
    info!("Caller auth: {}", if auth { "enabled (ALLOW_API_KEY)" } else { "disabled" });

    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

    info!("Server shut down");
    Ok(())
}
