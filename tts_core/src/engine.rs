//! Synthesis engine contract and the ONNX Runtime implementation of it.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use ndarray::{arr1, Array2, ArrayD};
use ort::execution_providers::CPUExecutionProvider;
use ort::inputs;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;
use serde::Deserialize;
use tracing::{info, warn};

use crate::language::ModelKey;

/// Output sample rate every model is trained at
pub const SAMPLE_RATE: u32 = 44_100;

/// Shared descriptor every model directory carries
pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("ONNX runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("Invalid model config: {0}")]
    Config(String),
    #[error("Model asset not found: {0}")]
    MissingAsset(PathBuf),
    #[error("Unexpected engine output: {0}")]
    Output(String),
}

impl EngineError {
    /// Short variant name, surfaced in unexpected-error responses
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Ort(_) => "OrtError",
            EngineError::Io(_) => "IoError",
            EngineError::Shape(_) => "ShapeError",
            EngineError::Config(_) => "ConfigError",
            EngineError::MissingAsset(_) => "MissingAsset",
            EngineError::Output(_) => "OutputError",
        }
    }
}

/// Knobs passed to the engine on every call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceOptions {
    /// Share of the stochastic duration predictor
    pub sdp_ratio: f32,
    pub noise_scale: f32,
    pub noise_scale_w: f32,
    /// Duration multiplier; above 1 is slower speech
    pub length_scale: f32,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            sdp_ratio: 0.5,
            noise_scale: 0.6,
            noise_scale_w: 0.9,
            length_scale: 1.0,
        }
    }
}

impl InferenceOptions {
    /// Defaults with a speaking-rate multiplier applied
    pub fn with_speed(speed: f32) -> Self {
        Self {
            length_scale: 1.0 / speed,
            ..Self::default()
        }
    }
}

/// Batched model inputs. Id tensors are `[1, n]`.
#[derive(Debug, Clone)]
pub struct EngineInputs {
    pub x: Array2<i64>,
    pub x_lengths: ndarray::Array1<i64>,
    pub sid: ndarray::Array1<i64>,
    pub tone: Array2<i64>,
    pub language: Array2<i64>,
}

/// A loaded acoustic model + vocoder.
///
/// Implementations must be safe to call from several request threads; an
/// engine that cannot run concurrently serializes calls internally.
pub trait SynthesisEngine: Send + Sync {
    /// Returns the raw `[batch, channel, samples]` audio tensor
    fn infer(&self, inputs: &EngineInputs, options: &InferenceOptions) -> Result<ArrayD<f32>, EngineError>;
}

/// Loads the engine for one (language, voice) pair
pub trait ModelLoader: Send + Sync {
    fn load(&self, key: ModelKey) -> Result<Arc<dyn SynthesisEngine>, EngineError>;
}

#[derive(Debug, Deserialize)]
struct ModelConfig {
    data: DataConfig,
}

#[derive(Debug, Deserialize)]
struct DataConfig {
    sampling_rate: u32,
}

fn read_model_config(path: &Path) -> Result<ModelConfig, EngineError> {
    let text = fs::read_to_string(path)?;
    let config: ModelConfig =
        serde_json::from_str(&text).map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
    if config.data.sampling_rate != SAMPLE_RATE {
        return Err(EngineError::Config(format!(
            "expected data.sampling_rate {SAMPLE_RATE}, found {}",
            config.data.sampling_rate
        )));
    }
    Ok(config)
}

/// Lock `mutex`, taking it back if a previous holder panicked.
///
/// Neither the session nor a cache slot is left half-written by a panic:
/// ort keeps no Rust-side state across `run`, and a slot is only assigned
/// after its load returns.
pub(crate) fn lock_recovering<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        warn!("Recovering lock poisoned by a panicked holder");
        mutex.clear_poison();
        poisoned.into_inner()
    })
}

/// ONNX export of a tone-aware VITS model.
///
/// `Session::run` needs exclusive access, so calls on one engine are
/// serialized by the mutex; distinct engines run in parallel.
pub struct OnnxEngine {
    session: Mutex<Session>,
}

impl OnnxEngine {
    pub fn load(onnx_path: &Path, num_threads: Option<usize>) -> Result<Self, EngineError> {
        let providers = vec![CPUExecutionProvider::default().build()];
        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_execution_providers(providers)?;
        if let Some(threads) = num_threads {
            builder = builder.with_intra_threads(threads)?;
        }
        let session = builder.commit_from_file(onnx_path)?;
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl SynthesisEngine for OnnxEngine {
    fn infer(&self, inputs: &EngineInputs, options: &InferenceOptions) -> Result<ArrayD<f32>, EngineError> {
        let noise_scale = arr1(&[options.noise_scale]);
        let length_scale = arr1(&[options.length_scale]);
        let noise_scale_w = arr1(&[options.noise_scale_w]);
        let sdp_ratio = arr1(&[options.sdp_ratio]);

        let mut session = lock_recovering(&self.session);
        let outputs = session.run(inputs![
            "x" => TensorRef::from_array_view(inputs.x.view())?,
            "x_lengths" => TensorRef::from_array_view(inputs.x_lengths.view())?,
            "sid" => TensorRef::from_array_view(inputs.sid.view())?,
            "tone" => TensorRef::from_array_view(inputs.tone.view())?,
            "language" => TensorRef::from_array_view(inputs.language.view())?,
            "noise_scale" => TensorRef::from_array_view(noise_scale.view())?,
            "length_scale" => TensorRef::from_array_view(length_scale.view())?,
            "noise_scale_w" => TensorRef::from_array_view(noise_scale_w.view())?,
            "sdp_ratio" => TensorRef::from_array_view(sdp_ratio.view())?,
        ])?;

        let (_, audio) = outputs
            .iter()
            .next()
            .ok_or_else(|| EngineError::Output("model produced no outputs".to_string()))?;
        let audio = audio.try_extract_array::<f32>()?.to_owned();
        Ok(audio)
    }
}

/// Loads `{model_dir}/{language}_{voice}.onnx`, validated against the shared
/// `{model_dir}/config.json`.
#[derive(Debug, Clone)]
pub struct OnnxModelLoader {
    model_dir: PathBuf,
    num_threads: Option<usize>,
}

impl OnnxModelLoader {
    pub fn new(model_dir: impl Into<PathBuf>, num_threads: Option<usize>) -> Self {
        Self {
            model_dir: model_dir.into(),
            num_threads,
        }
    }

    pub fn weights_path(&self, key: ModelKey) -> PathBuf {
        self.model_dir.join(format!("{key}.onnx"))
    }

    pub fn config_path(&self) -> PathBuf {
        self.model_dir.join(CONFIG_FILE)
    }
}

impl ModelLoader for OnnxModelLoader {
    fn load(&self, key: ModelKey) -> Result<Arc<dyn SynthesisEngine>, EngineError> {
        let config_path = self.config_path();
        if !config_path.exists() {
            return Err(EngineError::MissingAsset(config_path));
        }
        read_model_config(&config_path)?;

        let weights = self.weights_path(key);
        if !weights.exists() {
            return Err(EngineError::MissingAsset(weights));
        }
        info!("Loading {} model from {}", key, weights.display());
        let engine = OnnxEngine::load(&weights, self.num_threads)?;
        Ok(Arc::new(engine))
    }
}
