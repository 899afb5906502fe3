use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tts_core::{SymbolError, SynthesisError, ToneError};

/// API Error types. The `Display` of each variant is the short kind sent as
/// `error` in the JSON body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Offending bytes of a path that is not valid UTF-8
    #[error("Error while decoding URI: invalid characters")]
    UriDecode(String),

    #[error("Page not found")]
    NotFound,

    #[error("Invalid query")]
    InvalidQuery(String),

    #[error("Invalid {option}")]
    InvalidOption { option: &'static str, message: String },

    #[error("Invalid syllable")]
    InvalidSyllable(#[from] ToneError),

    #[error("Unrecognized symbol")]
    UnrecognizedSymbol(#[from] SymbolError),

    #[error("Unexpected error")]
    Unexpected { kind: String, message: String },
}

impl ApiError {
    pub fn unexpected(kind: impl Into<String>, message: impl ToString) -> Self {
        ApiError::Unexpected {
            kind: kind.into(),
            message: message.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Detail sent as `message`; none for a missing route
    pub fn message(&self) -> Option<String> {
        match self {
            ApiError::UriDecode(bytes) => Some(bytes.clone()),
            ApiError::NotFound => None,
            ApiError::InvalidQuery(msg) => Some(msg.clone()),
            ApiError::InvalidOption { message, .. } => Some(message.clone()),
            ApiError::InvalidSyllable(e) => Some(e.to_string()),
            ApiError::UnrecognizedSymbol(e) => Some(format!("'{}'", e.symbol)),
            ApiError::Unexpected { kind, message } => Some(format!("{kind}: {message}")),
        }
    }
}

impl From<SynthesisError> for ApiError {
    fn from(err: SynthesisError) -> Self {
        match err {
            SynthesisError::Tone(e) => ApiError::InvalidSyllable(e),
            SynthesisError::Symbol(e) => ApiError::UnrecognizedSymbol(e),
            SynthesisError::Engine(e) => ApiError::unexpected(e.kind(), e),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Unexpected { .. } => tracing::error!("{}: {:?}", self, self.message()),
            ApiError::UnrecognizedSymbol(e) => {
                tracing::warn!("Unrecognized {} symbol '{}'", e.language, e.symbol)
            }
            _ => tracing::debug!("Rejected request: {} ({:?})", self, self.message()),
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            message: self.message(),
        });

        (status, body).into_response()
    }
}
