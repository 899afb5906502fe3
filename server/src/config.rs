// Configuration for the server, read from the environment

use std::path::PathBuf;

use tracing::warn;
use tts_core::ModelKey;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    /// Directory holding `{language}_{voice}.onnx` and the shared `config.json`
    pub model_dir: PathBuf,
    /// Models loaded before the server starts accepting requests
    pub preload_models: Vec<ModelKey>,
    pub intra_threads: Option<usize>,
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8085,
            model_dir: PathBuf::from("data"),
            preload_models: Vec::new(),
            intra_threads: None,
            cors_allowed_origins: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port);

        let model_dir = std::env::var("MODEL_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.model_dir);

        let preload_models = std::env::var("PRELOAD_MODELS")
            .ok()
            .map(|keys| parse_model_keys(&keys))
            .unwrap_or_default();

        let intra_threads = std::env::var("INTRA_THREADS")
            .ok()
            .and_then(|v| v.parse().ok());

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            });

        Self {
            port,
            model_dir,
            preload_models,
            intra_threads,
            cors_allowed_origins,
        }
    }
}

/// Parse a comma list such as `waitau_male,hakka_female`; `all` selects every model.
fn parse_model_keys(list: &str) -> Vec<ModelKey> {
    let mut keys = Vec::new();
    for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if item.eq_ignore_ascii_case("all") {
            return ModelKey::all().collect();
        }
        match item.to_lowercase().parse::<ModelKey>() {
            Ok(key) if !keys.contains(&key) => keys.push(key),
            Ok(_) => {}
            Err(e) => warn!("Ignoring PRELOAD_MODELS entry: {e}"),
        }
    }
    keys
}
