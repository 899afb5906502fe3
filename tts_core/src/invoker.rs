use ndarray::{s, Array1, Array2};

use crate::{
    engine::{EngineError, EngineInputs, InferenceOptions, SynthesisEngine, SAMPLE_RATE},
    sequence::IdSequences,
};

/// Mono audio at [`SAMPLE_RATE`]
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn duration_ms(&self) -> u64 {
        (self.samples.len() as f64 / self.sample_rate as f64 * 1000.0) as u64
    }
}

/// Speaker id passed to every engine; each model holds one voice.
pub const SPEAKER_ID: i64 = 0;

/// Run one utterance through `engine` and keep channel 0 of batch element 0.
pub fn synthesize(
    engine: &dyn SynthesisEngine,
    ids: &IdSequences,
    options: &InferenceOptions,
) -> Result<Waveform, EngineError> {
    let n = ids.len();
    let inputs = EngineInputs {
        x: Array2::from_shape_vec((1, n), ids.phone_ids.clone())?,
        x_lengths: Array1::from_elem(1, n as i64),
        sid: Array1::from_elem(1, SPEAKER_ID),
        tone: Array2::from_shape_vec((1, n), ids.tone_ids.clone())?,
        language: Array2::from_shape_vec((1, n), ids.lang_ids.clone())?,
    };

    let output = engine.infer(&inputs, options)?;
    drop(inputs);

    if output.ndim() != 3 {
        return Err(EngineError::Output(format!(
            "expected [batch, channel, samples], got shape {:?}",
            output.shape()
        )));
    }
    if output.shape()[0] == 0 || output.shape()[1] == 0 {
        return Err(EngineError::Output(format!("empty output of shape {:?}", output.shape())));
    }
    let samples: Vec<f32> = output.slice(s![0, 0, ..]).iter().copied().collect();
    drop(output);

    Ok(Waveform {
        samples,
        sample_rate: SAMPLE_RATE,
    })
}
