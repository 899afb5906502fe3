pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod validation;

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tts_core::{Language, ModelKey, TtsManager, Voice};

use crate::{config::ServerConfig, metrics::AppMetrics};

#[derive(Clone)]
pub struct AppState {
    pub tts: Arc<TtsManager>,
    pub metrics: AppMetrics,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(tts: Arc<TtsManager>, config: ServerConfig) -> Self {
        Self {
            tts,
            metrics: AppMetrics::new(),
            config,
        }
    }
}

#[derive(Serialize)]
pub struct VoiceInfo {
    pub key: String,
    pub language: Language,
    pub voice: Voice,
    pub loaded: bool,
}

pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn list_voices(State(state): State<AppState>) -> Json<Vec<VoiceInfo>> {
    let voices = ModelKey::all()
        .map(|key| VoiceInfo {
            key: key.to_string(),
            language: key.language,
            voice: key.voice,
            loaded: state.tts.cache().is_loaded(key),
        })
        .collect();
    Json(voices)
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Json<metrics::MetricsResponse> {
    Json(state.metrics.snapshot(state.tts.cache().stats()))
}

// Request ID middleware for tracing
async fn add_request_id(mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let value = HeaderValue::from_str(&request_id).ok();
    if let Some(v) = value.clone() {
        request.headers_mut().insert("x-request-id", v);
    }
    let mut response = next.run(request).await;
    if let Some(v) = value {
        response.headers_mut().insert("x-request-id", v);
    }
    response
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let open = || {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers(Any)
    };
    let Some(allowed_origins) = config.cors_allowed_origins.as_ref() else {
        return open();
    };

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();
    if origins.is_empty() {
        warn!("CORS_ALLOWED_ORIGINS has no valid origins, falling back to open CORS");
        return open();
    }
    info!("CORS configured for {} origin(s)", origins.len());
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
}

/// Full application router; `/tts/...` is served by the fallback.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .route("/voices", get(list_voices))
        .route("/metrics", get(metrics_endpoint))
        .fallback(pipeline::tts_handler)
        .layer(axum::middleware::from_fn(add_request_id))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
