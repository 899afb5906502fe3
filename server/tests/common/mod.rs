//! Common utilities for integration tests

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use ndarray::{ArrayD, IxDyn};
use tower::ServiceExt;
use tts_core::{
    EngineError, EngineInputs, InferenceOptions, ModelKey, ModelLoader, SynthesisEngine, TtsManager,
};
use tts_server::{build_router, config::ServerConfig, AppState};

/// Samples produced per input id
pub const SAMPLES_PER_ID: usize = 100;

/// Engine that returns a quiet sine, one chunk per input id
pub struct FakeEngine {
    pub key: ModelKey,
    pub last_inputs: Mutex<Option<EngineInputs>>,
}

impl SynthesisEngine for FakeEngine {
    fn infer(&self, inputs: &EngineInputs, options: &InferenceOptions) -> Result<ArrayD<f32>, EngineError> {
        *self.last_inputs.lock().unwrap() = Some(inputs.clone());
        let n = (inputs.x.ncols() as f32 * SAMPLES_PER_ID as f32 * options.length_scale) as usize;
        Ok(ArrayD::from_shape_fn(IxDyn(&[1, 1, n]), |idx| {
            (idx[2] as f32 * 0.05).sin() * 0.25
        }))
    }
}

/// Loader counting how often each model is loaded
#[derive(Default)]
pub struct FakeLoader {
    pub loads: AtomicUsize,
    pub delay: Option<Duration>,
    pub engines: Mutex<Vec<Arc<FakeEngine>>>,
}

impl FakeLoader {
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn engine_for(&self, key: ModelKey) -> Option<Arc<FakeEngine>> {
        self.engines
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.key == key)
            .cloned()
    }
}

impl ModelLoader for FakeLoader {
    fn load(&self, key: ModelKey) -> Result<Arc<dyn SynthesisEngine>, EngineError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let engine = Arc::new(FakeEngine {
            key,
            last_inputs: Mutex::new(None),
        });
        self.engines.lock().unwrap().push(engine.clone());
        Ok(engine)
    }
}

/// Loader whose models are never available
pub struct MissingLoader;

impl ModelLoader for MissingLoader {
    fn load(&self, key: ModelKey) -> Result<Arc<dyn SynthesisEngine>, EngineError> {
        Err(EngineError::MissingAsset(format!("data/{key}.onnx").into()))
    }
}

/// Create a test app instance over the given loader
pub fn create_test_app_with(loader: Arc<dyn ModelLoader>) -> Router {
    let tts = Arc::new(TtsManager::new(loader));
    build_router(AppState::new(tts, ServerConfig::default()))
}

pub fn create_test_app() -> (Router, Arc<FakeLoader>) {
    let loader = Arc::new(FakeLoader::default());
    (create_test_app_with(loader.clone()), loader)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .header("origin", "https://example.org")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, _, body) = get(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}
