//! Text-to-speech core for Waitau and Hakka.
//!
//! Romanized syllables with tone digits are encoded into phone, tone and
//! language-id sequences, interspersed with blanks, and run through a cached
//! per-(language, voice) synthesis engine.

pub mod cache;
pub mod engine;
pub mod invoker;
pub mod language;
pub mod phonology;
pub mod sequence;
pub mod symbols;
mod wav;

use std::{sync::Arc, time::Instant};

use tracing::debug;

pub use cache::{CacheStats, ModelCache};
pub use engine::{
    EngineError, EngineInputs, InferenceOptions, ModelLoader, OnnxModelLoader, SynthesisEngine, SAMPLE_RATE,
};
pub use invoker::Waveform;
pub use language::{Language, ModelKey, Voice};
pub use phonology::{PhonemeSequence, ToneError};
pub use sequence::{IdSequences, SymbolError};
pub use symbols::SymbolTable;
pub use wav::{encode_wav, WAV_MIME};

/// Accepted range of the speaking-rate multiplier
pub const SPEED_RANGE: std::ops::RangeInclusive<f32> = 0.5..=2.0;

/// One parsed synthesis request
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub language: Language,
    pub voice: Voice,
    /// Whitespace-separated syllables
    pub text: String,
    pub speed: f32,
}

impl SynthesisRequest {
    pub fn new(language: Language, text: impl Into<String>) -> Self {
        Self {
            language,
            voice: Voice::default(),
            text: text.into(),
            speed: 1.0,
        }
    }

    pub fn key(&self) -> ModelKey {
        ModelKey::new(self.language, self.voice)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error(transparent)]
    Tone(#[from] ToneError),
    #[error(transparent)]
    Symbol(#[from] SymbolError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Encoder, sequence builder and model cache behind one call
pub struct TtsManager {
    cache: Arc<ModelCache>,
}

impl TtsManager {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            cache: Arc::new(ModelCache::new(loader)),
        }
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    /// Encode `req.text` into interspersed id sequences
    pub fn prepare(&self, req: &SynthesisRequest) -> Result<(PhonemeSequence, IdSequences), SynthesisError> {
        let phonemes = phonology::encode(req.language, &req.text)?;
        let ids = sequence::build(req.language, &phonemes, SymbolTable::builtin(req.language))?;
        Ok((phonemes, ids))
    }

    /// Blocking: may load a model and always runs inference.
    pub fn synthesize(&self, req: &SynthesisRequest) -> Result<Waveform, SynthesisError> {
        let (phonemes, ids) = self.prepare(req)?;
        debug!(
            "{}: {} syllable units -> {} ids",
            req.key(),
            phonemes.word_counts.len(),
            ids.len()
        );
        drop(phonemes);

        let engine = self.cache.get_or_load(req.key())?;
        let started = Instant::now();
        let waveform = invoker::synthesize(engine.as_ref(), &ids, &InferenceOptions::with_speed(req.speed))?;
        debug!(
            "{}: synthesized {} ms of audio in {} ms",
            req.key(),
            waveform.duration_ms(),
            started.elapsed().as_millis()
        );
        Ok(waveform)
    }
}
