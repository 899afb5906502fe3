//! `/tts/{language}/{text}` request pipeline.
//!
//! The path is taken raw so that undecodable bytes and unknown routes can be
//! reported in the service's own JSON error format.

use std::time::Instant;

use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use percent_encoding::percent_decode_str;
use tracing::info;
use tts_core::{encode_wav, Language, SynthesisRequest, WAV_MIME};

use crate::{error::ApiError, validation::parse_query, AppState};

const CACHE_CONTROL: &str = "max-age=604800, public";

/// Decode a raw request path and query into a synthesis request.
pub fn parse_request(path: &str, query: Option<&str>) -> Result<SynthesisRequest, ApiError> {
    let bytes: Vec<u8> = percent_decode_str(path).collect();
    let path = String::from_utf8(bytes).map_err(|e| {
        let bytes = e.as_bytes();
        let start = e.utf8_error().valid_up_to();
        let end = e
            .utf8_error()
            .error_len()
            .map_or(bytes.len(), |len| start + len);
        // One char per byte, so every byte value survives into the message.
        ApiError::UriDecode(bytes[start..end].iter().map(|&b| b as char).collect())
    })?;

    let path = path.to_lowercase();
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let [function, language, text] = segments.as_slice() else {
        return Err(ApiError::NotFound);
    };
    if *function != "tts" {
        return Err(ApiError::NotFound);
    }
    let language: Language = language.parse().map_err(|_| ApiError::NotFound)?;

    let params = parse_query(query)?;
    Ok(SynthesisRequest {
        language,
        voice: params.voice()?,
        text: text.replace('+', " "),
        speed: params.speed()?,
    })
}

/// Fallback handler: everything that is not an auxiliary route goes here.
pub async fn tts_handler(State(state): State<AppState>, uri: Uri) -> Response {
    let started = Instant::now();
    let result = run(&state, &uri).await;
    state
        .metrics
        .tts
        .record_request(started.elapsed().as_millis() as u64);

    match result {
        Ok(audio) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, WAV_MIME), (header::CACHE_CONTROL, CACHE_CONTROL)],
            audio,
        )
            .into_response(),
        Err(e) => {
            state.metrics.tts.record_error();
            e.into_response()
        }
    }
}

async fn run(state: &AppState, uri: &Uri) -> Result<Vec<u8>, ApiError> {
    let req = parse_request(uri.path(), uri.query())?;
    info!(
        "TTS request: {} voice={} speed={} syllables={}",
        req.language,
        req.voice,
        req.speed,
        req.text.split_whitespace().count()
    );

    // Model loading and inference are blocking.
    let tts = state.tts.clone();
    let started = Instant::now();
    let waveform = tokio::task::spawn_blocking(move || tts.synthesize(&req))
        .await
        .map_err(|e| ApiError::unexpected("JoinError", e))??;
    state
        .metrics
        .synthesis
        .record_synthesis(started.elapsed().as_millis() as u64, waveform.samples.len());

    encode_wav(&waveform.samples, waveform.sample_rate).map_err(|e| ApiError::unexpected("EncodeError", e))
}
