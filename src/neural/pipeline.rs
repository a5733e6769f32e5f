//! ONNX inference stages: phoneme ids -> mel -> waveform
//!
//! An acoustic model (per voice) turns id sequences into mel spectrograms
//! under two scalar controls: noise scale (prosodic variability) and
//! length scale (speaking rate, < 1.0 is faster). A vocoder (per quality
//! level) turns mels into waveforms. Both are loaded lazily on first use
//! and cached for the process lifetime; loading is the expensive one-time
//! cost.

use std::path::Path;
use std::sync::{Mutex, OnceLock};

use ndarray::{Array1, Array2, ArrayD, IxDyn};
use ort::inputs;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use serde::Deserialize;
use tracing::debug;

use crate::core::error::{AudioOperation, Result, TtsError};
use crate::neural::audio::{db_to_amp, denormalize, dynamic_range_compression, float_to_int16};
use crate::neural::denoiser::Denoiser;
use crate::neural::phonemes::PhonemeEncoder;

/// Mel frame count fed to the vocoder when sampling its bias spectrum
const BIAS_MEL_FRAMES: usize = 88;

fn inference_error(e: impl std::fmt::Display) -> TtsError {
    TtsError::Audio {
        operation: AudioOperation::Inference,
        message: e.to_string(),
    }
}

fn load_session(model_path: &Path) -> Result<Session> {
    debug!("loading ONNX model from {}", model_path.display());

    let build = || -> ort::Result<Session> {
        Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level1)?
            .with_intra_threads(2)?
            .commit_from_file(model_path)
    };
    build().map_err(|e| TtsError::config(format!("cannot load ONNX model: {e}"), Some(model_path.to_path_buf())))
}

/// Per-voice acoustic model: ids -> mel spectrogram
pub struct AcousticModel {
    session: Mutex<Session>,
    pub encoder: PhonemeEncoder,
    /// espeak voice used to phonemize text for this model
    pub text_language: String,
}

impl AcousticModel {
    /// Load `generator.onnx` and the phoneme tables from a voice directory
    pub fn load(model_dir: &Path, text_language: &str) -> Result<Self> {
        let encoder = PhonemeEncoder::from_model_dir(model_dir)?;
        let session = load_session(&model_dir.join("generator.onnx"))?;

        Ok(Self {
            session: Mutex::new(session),
            encoder,
            text_language: text_language.to_string(),
        })
    }

    /// Run inference over an id sequence
    pub fn infer(&self, ids: &[i64], noise_scale: f32, length_scale: f32) -> Result<ArrayD<f32>> {
        let input = Array2::from_shape_vec((1, ids.len()), ids.to_vec())
            .map_err(inference_error)?;
        let input_lengths = Array1::from_vec(vec![ids.len() as i64]);
        let scales = Array1::from_vec(vec![noise_scale, length_scale]);

        let mut session = self.session.lock().map_err(|_| TtsError::Internal {
            message: "acoustic model lock poisoned".to_string(),
        })?;

        let outputs = session
            .run(inputs![
                "input" => Tensor::from_array(input).map_err(inference_error)?,
                "input_lengths" => Tensor::from_array(input_lengths).map_err(inference_error)?,
                "scales" => Tensor::from_array(scales).map_err(inference_error)?
            ])
            .map_err(inference_error)?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(inference_error)?;

        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec()).map_err(inference_error)
    }
}

/// Audio parameters of a vocoder, from its `config.json`
#[derive(Debug, Clone, Deserialize)]
pub struct VocoderAudioConfig {
    pub num_mels: usize,
    pub sampling_rate: u32,
    pub channels: u16,
    pub sample_bytes: u16,
}

#[derive(Debug, Deserialize)]
struct VocoderConfigFile {
    audio: VocoderAudioConfig,
}

/// Per-quality vocoder: mel spectrogram -> waveform
pub struct Vocoder {
    session: Mutex<Session>,
    pub audio: VocoderAudioConfig,
    denoiser: OnceLock<Denoiser>,
}

impl Vocoder {
    /// Load `generator.onnx` and `config.json` from a vocoder directory
    pub fn load(model_dir: &Path) -> Result<Self> {
        let config_path = model_dir.join("config.json");
        let config_text = std::fs::read_to_string(&config_path).map_err(|e| {
            TtsError::config(format!("cannot read vocoder config: {e}"), Some(config_path.clone()))
        })?;
        let config: VocoderConfigFile = serde_json::from_str(&config_text).map_err(|e| {
            TtsError::config(format!("bad vocoder config: {e}"), Some(config_path))
        })?;

        let session = load_session(&model_dir.join("generator.onnx"))?;

        Ok(Self {
            session: Mutex::new(session),
            audio: config.audio,
            denoiser: OnceLock::new(),
        })
    }

    fn infer(&self, mel: ArrayD<f32>) -> Result<Vec<f32>> {
        let mut session = self.session.lock().map_err(|_| TtsError::Internal {
            message: "vocoder lock poisoned".to_string(),
        })?;

        let outputs = session
            .run(inputs!["mel" => Tensor::from_array(mel).map_err(inference_error)?])
            .map_err(inference_error)?;

        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(inference_error)?;

        Ok(data.to_vec())
    }

    /// Bias spectrum, computed once per vocoder on first use
    fn denoiser(&self) -> Result<&Denoiser> {
        if let Some(denoiser) = self.denoiser.get() {
            return Ok(denoiser);
        }

        debug!("initializing denoiser bias spectrum");
        let zeros = ArrayD::zeros(IxDyn(&[1, self.audio.num_mels, BIAS_MEL_FRAMES]));
        let bias_audio = self.infer(zeros)?;

        // A concurrent first use may have won the race; either result is
        // identical, so the duplicate inference is only wasted work.
        let _ = self.denoiser.set(Denoiser::new(&bias_audio));
        Ok(self.denoiser.get().expect("denoiser just initialized"))
    }

    /// Full back half of the pipeline: normalized mel -> int16 PCM
    ///
    /// The mel transforms must mirror the training-time forward transform
    /// exactly: denormalize, dB to amplitude, dynamic range compression.
    pub fn synthesize(&self, mel: ArrayD<f32>, denoiser_strength: f32) -> Result<Vec<i16>> {
        let mel = dynamic_range_compression(db_to_amp(denormalize(mel)));
        let waveform = self.infer(mel)?;

        let waveform = if denoiser_strength > 0.0 {
            self.denoiser()?.apply(&waveform, denoiser_strength)
        } else {
            waveform
        };

        Ok(float_to_int16(&waveform))
    }
}
