use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use tts_core::{Voice, SPEED_RANGE};

use crate::error::ApiError;

/// Parsed `?key=value&...` fields, every value kept per key
#[derive(Debug, Default)]
pub struct QueryParams(HashMap<String, Vec<String>>);

/// Strictly parse a query string. Each `&`-separated field must be
/// `key=value` with a non-empty key; `+` is a space. Blank values are
/// dropped, so `voice=` means "use the default".
pub fn parse_query(query: Option<&str>) -> Result<QueryParams, ApiError> {
    let mut params: HashMap<String, Vec<String>> = HashMap::new();
    let query = match query {
        Some(q) if !q.is_empty() => q,
        _ => return Ok(QueryParams(params)),
    };

    for field in query.split('&') {
        let (key, value) = field
            .split_once('=')
            .ok_or_else(|| ApiError::InvalidQuery(format!("bad query field: '{field}'")))?;
        let key = decode_component(key)?;
        if key.is_empty() {
            return Err(ApiError::InvalidQuery(format!("bad query field: '{field}'")));
        }
        let value = decode_component(value)?;
        if value.is_empty() {
            continue;
        }
        params.entry(key.to_lowercase()).or_default().push(value);
    }
    Ok(QueryParams(params))
}

fn decode_component(raw: &str) -> Result<String, ApiError> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| ApiError::InvalidQuery(format!("'{raw}' is not valid UTF-8: {e}")))
}

impl QueryParams {
    /// The single value of `option`, if given
    fn single(&self, option: &'static str) -> Result<Option<&str>, ApiError> {
        match self.0.get(option).map(Vec::as_slice) {
            None | Some([]) => Ok(None),
            Some([value]) => Ok(Some(value.as_str())),
            Some(values) => Err(ApiError::InvalidOption {
                option,
                message: format!("Only one {option} may be given, received {}", values.len()),
            }),
        }
    }

    /// `voice`, defaulting to male
    pub fn voice(&self) -> Result<Voice, ApiError> {
        let Some(raw) = self.single("voice")? else {
            return Ok(Voice::default());
        };
        raw.trim().to_lowercase().parse().map_err(|_| ApiError::InvalidOption {
            option: "voice",
            message: format!("Voice must be one of 'male' or 'female', received '{raw}'"),
        })
    }

    /// `speed`, defaulting to 1.0
    pub fn speed(&self) -> Result<f32, ApiError> {
        let Some(raw) = self.single("speed")? else {
            return Ok(1.0);
        };
        match raw.trim().parse::<f32>() {
            Ok(speed) if SPEED_RANGE.contains(&speed) => Ok(speed),
            _ => Err(ApiError::InvalidOption {
                option: "speed",
                message: format!(
                    "Speed must be a number between {} and {}, received '{raw}'",
                    SPEED_RANGE.start(),
                    SPEED_RANGE.end()
                ),
            }),
        }
    }
}
